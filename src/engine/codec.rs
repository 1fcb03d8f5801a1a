//! Identity codec: ordered key parts ⇄ one printable string.
//!
//! Parts are joined with `/`. Inside a part `_` becomes `__` and `/` becomes `_/`, so a
//! separator is exactly a `/` whose previous character is not `_`. A part ending in `_` or `/`
//! gets one extra `/` before escaping; it always surfaces as a trailing `_/` and decode strips it.
//! Without it, `a_` followed by a separator would read as an escaped slash.

use crate::error::{Error, Result};

const SEP: char = '/';
const ESC: char = '_';
const TAIL: &str = "_/";

/// Escape one rendered value. Values without `/` or `_` are returned as-is.
pub fn escape_part(value: &str) -> String {
    if !value.contains([SEP, ESC]) {
        return value.to_string();
    }
    let needs_tail = value.ends_with([SEP, ESC]);
    let mut out = String::with_capacity(value.len() * 2 + TAIL.len());
    for c in value.chars().chain(needs_tail.then_some(SEP)) {
        match c {
            ESC => out.push_str("__"),
            SEP => out.push_str(TAIL),
            c => out.push(c),
        }
    }
    out
}

/// Reverse [`escape_part`] for one part of a split identity.
pub fn unescape_part(part: &str) -> String {
    let body = part.strip_suffix(TAIL).unwrap_or(part);
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ESC
            && let Some(&next) = chars.peek()
            && (next == ESC || next == SEP)
        {
            out.push(next);
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}

/// Split on every `/` not immediately preceded by `_`. Empty parts (leading, trailing,
/// consecutive) are kept, so `""` yields one empty part.
pub fn split_identity(id: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;
    for (i, c) in id.char_indices() {
        if c == SEP && prev != Some(ESC) {
            parts.push(&id[start..i]);
            start = i + SEP.len_utf8();
        }
        prev = Some(c);
    }
    parts.push(&id[start..]);
    parts
}

/// Escape and join already rendered values.
pub fn encode_parts<S: AsRef<str>>(values: &[S]) -> String {
    values
        .iter()
        .map(|v| escape_part(v.as_ref()))
        .collect::<Vec<_>>()
        .join("/")
}

/// Split and unescape an identity, requiring exactly `expected` parts.
pub fn decode_parts(id: &str, expected: usize) -> Result<Vec<String>> {
    let parts = split_identity(id);
    if parts.len() != expected {
        return Err(Error::decode(
            id,
            format!("expected {expected} key parts, found {}", parts.len()),
        ));
    }
    Ok(parts.into_iter().map(unescape_part).collect())
}
