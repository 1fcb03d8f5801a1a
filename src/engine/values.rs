//! Typed key values: conversion from SQLite cells, rendering for identities,
//! parsing back from decoded parts, and positional parameter binding.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use rusqlite::types::Value;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::ColumnType;

const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M:%S";

/// Naive timestamp layouts accepted from text cells, tried in order.
const TIMESTAMP_FMTS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyValue {
    Int(i32),
    Long(i64),
    BigDecimal(Decimal),
    String(String),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Time(NaiveTime),
}

impl KeyValue {
    /// Text form used inside identities. Timestamps render as epoch milliseconds.
    pub fn render(&self) -> String {
        match self {
            KeyValue::Int(v) => v.to_string(),
            KeyValue::Long(v) => v.to_string(),
            KeyValue::BigDecimal(v) => v.to_string(),
            KeyValue::String(v) => v.clone(),
            KeyValue::Timestamp(v) => v.timestamp_millis().to_string(),
            KeyValue::Date(v) => v.format(DATE_FMT).to_string(),
            KeyValue::Time(v) => v.format(TIME_FMT).to_string(),
        }
    }

    /// Parse a decoded identity part back into a typed value.
    pub fn parse(ty: ColumnType, s: &str) -> Result<KeyValue, String> {
        let bad = |e: &dyn std::fmt::Display| format!("'{s}' is not a valid {ty}: {e}");
        let value = match ty {
            ColumnType::Int => KeyValue::Int(s.parse().map_err(|e| bad(&e))?),
            ColumnType::Long => KeyValue::Long(s.parse().map_err(|e| bad(&e))?),
            ColumnType::BigDecimal => {
                KeyValue::BigDecimal(Decimal::from_str(s).map_err(|e| bad(&e))?)
            }
            ColumnType::String => KeyValue::String(s.to_string()),
            ColumnType::Timestamp => {
                let millis: i64 = s.parse().map_err(|e| bad(&e))?;
                KeyValue::Timestamp(
                    DateTime::from_timestamp_millis(millis)
                        .ok_or_else(|| bad(&"out of range"))?,
                )
            }
            ColumnType::Date => {
                KeyValue::Date(NaiveDate::parse_from_str(s, DATE_FMT).map_err(|e| bad(&e))?)
            }
            ColumnType::Time => {
                KeyValue::Time(NaiveTime::parse_from_str(s, TIME_FMT).map_err(|e| bad(&e))?)
            }
        };
        Ok(value)
    }

    /// Convert a result cell. `Ok(None)` for SQL NULL; `Err` when the cell cannot be read as `ty`.
    /// Naive date/time text is interpreted in `zone`. An INTEGER cell in a timestamp column is
    /// epoch milliseconds; columns holding unix seconds must be scaled in the query
    /// (`col * 1000`) or stored as text.
    pub fn from_sql(
        ty: ColumnType,
        cell: &Value,
        zone: FixedOffset,
    ) -> Result<Option<KeyValue>, String> {
        if matches!(cell, Value::Null) {
            return Ok(None);
        }
        let mismatch = || format!("cannot read {} as {ty}", cell_kind(cell));
        let value = match (ty, cell) {
            (ColumnType::String, _) => KeyValue::String(cell_to_string(cell).unwrap_or_default()),
            (ColumnType::Int, Value::Integer(i)) => {
                KeyValue::Int(i32::try_from(*i).map_err(|e| e.to_string())?)
            }
            (ColumnType::Int, Value::Text(s)) => {
                KeyValue::Int(s.trim().parse().map_err(|_| mismatch())?)
            }
            (ColumnType::Long, Value::Integer(i)) => KeyValue::Long(*i),
            (ColumnType::Long, Value::Text(s)) => {
                KeyValue::Long(s.trim().parse().map_err(|_| mismatch())?)
            }
            (ColumnType::BigDecimal, Value::Integer(i)) => KeyValue::BigDecimal(Decimal::from(*i)),
            (ColumnType::BigDecimal, Value::Real(f)) => {
                KeyValue::BigDecimal(Decimal::try_from(*f).map_err(|e| e.to_string())?)
            }
            (ColumnType::BigDecimal, Value::Text(s)) => {
                KeyValue::BigDecimal(Decimal::from_str(s.trim()).map_err(|e| e.to_string())?)
            }
            (ColumnType::Timestamp, Value::Integer(millis)) => KeyValue::Timestamp(
                DateTime::from_timestamp_millis(*millis).ok_or_else(mismatch)?,
            ),
            (ColumnType::Timestamp, Value::Text(s)) => {
                KeyValue::Timestamp(parse_timestamp_text(s, zone).ok_or_else(mismatch)?)
            }
            (ColumnType::Date, Value::Text(s)) => {
                let s = s.trim();
                let date = NaiveDate::parse_from_str(s, DATE_FMT)
                    .ok()
                    .or_else(|| parse_timestamp_text(s, zone).map(|t| t.with_timezone(&zone).date_naive()))
                    .ok_or_else(mismatch)?;
                KeyValue::Date(date)
            }
            (ColumnType::Time, Value::Text(s)) => {
                let s = s.trim();
                let time = NaiveTime::parse_from_str(s, TIME_FMT)
                    .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S%.f"))
                    .map_err(|_| mismatch())?;
                KeyValue::Time(time)
            }
            _ => return Err(mismatch()),
        };
        Ok(Some(value))
    }

    /// Positional parameter for a query. Timestamps are bound as text in `zone`.
    pub fn to_sql_value(&self, zone: FixedOffset) -> Value {
        match self {
            KeyValue::Int(v) => Value::Integer(i64::from(*v)),
            KeyValue::Long(v) => Value::Integer(*v),
            KeyValue::BigDecimal(v) => Value::Text(v.to_string()),
            KeyValue::String(v) => Value::Text(v.clone()),
            KeyValue::Timestamp(v) => Value::Text(format_timestamp(*v, zone)),
            KeyValue::Date(v) => Value::Text(v.format(DATE_FMT).to_string()),
            KeyValue::Time(v) => Value::Text(v.format(TIME_FMT).to_string()),
        }
    }
}

/// `YYYY-MM-DD HH:MM:SS[.mmm]` in `zone`; fraction only when the millisecond part is non-zero.
pub fn format_timestamp(ts: DateTime<Utc>, zone: FixedOffset) -> String {
    let local = ts.with_timezone(&zone);
    if ts.timestamp_subsec_millis() == 0 {
        local.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        local.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
    }
}

/// RFC 3339 text keeps its own offset; naive layouts are read in `zone`.
pub fn parse_timestamp_text(s: &str, zone: FixedOffset) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    TIMESTAMP_FMTS.iter().find_map(|fmt| {
        let naive = NaiveDateTime::parse_from_str(s, fmt).ok()?;
        zone.from_local_datetime(&naive)
            .single()
            .map(|t| t.with_timezone(&Utc))
    })
}

/// Parse a `+HH:MM` / `-HHMM` / `Z` / `UTC` offset. Blank means UTC.
pub fn parse_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("utc") || s == "Z" {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Cell as text the way a driver's string getter would read it. `None` for NULL.
pub fn cell_to_string(cell: &Value) -> Option<String> {
    match cell {
        Value::Null => None,
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(f.to_string()),
        Value::Text(s) => Some(s.clone()),
        Value::Blob(b) => Some(String::from_utf8_lossy(b).into_owned()),
    }
}

fn cell_kind(cell: &Value) -> &'static str {
    match cell {
        Value::Null => "NULL",
        Value::Integer(_) => "INTEGER",
        Value::Real(_) => "REAL",
        Value::Text(_) => "TEXT",
        Value::Blob(_) => "BLOB",
    }
}
