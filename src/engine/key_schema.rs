//! Key schema: ordered typed key columns, parameter projections, and the
//! row → identity / identity → parameters conversions built on the codec.

use chrono::FixedOffset;
use log::debug;
use rusqlite::types::Value;
use std::collections::HashSet;
use url::Url;

use crate::engine::codec::{decode_parts, encode_parts};
use crate::engine::db_ops::{ColumnSet, Row};
use crate::engine::values::KeyValue;
use crate::error::{Error, Result};
use crate::{ColumnType, DocId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyColumn {
    pub name: String,
    pub ty: ColumnType,
}

/// Which query a decoded identity is bound into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Projection {
    Content,
    Acl,
    Metadata,
}

/// Config keys the projections are read from; used in error messages.
pub struct ProjectionSources<'a> {
    pub content: (&'a str, &'a str),
    pub acl: (&'a str, &'a str),
    pub metadata: (&'a str, &'a str),
}

/// Parsed declarations whose types may still be unresolved.
#[derive(Clone, Debug)]
pub struct KeySchemaBuilder {
    columns: Vec<(String, Option<ColumnType>)>,
    content: Vec<usize>,
    acl: Vec<usize>,
    metadata: Vec<usize>,
    doc_id_is_url: bool,
}

impl KeySchemaBuilder {
    /// Parse `name[:type], ...`. Names are trimmed and unique ignoring case; types are optional.
    pub fn parse(decls: &str, doc_id_is_url: bool) -> Result<Self> {
        if decls.trim().is_empty() {
            return Err(Error::config("key columns: value cannot be empty"));
        }
        let mut columns = Vec::new();
        let mut seen = HashSet::new();
        for decl in decls.split(',') {
            let (name, ty) = match decl.split_once(':') {
                Some((name, ty)) => (name.trim(), Some(ty.trim())),
                None => (decl.trim(), None),
            };
            if name.is_empty() {
                return Err(Error::config(format!("empty key name in '{decls}'")));
            }
            if !seen.insert(name.to_lowercase()) {
                return Err(Error::config(format!("key name '{name}' was repeated")));
            }
            let ty = match ty {
                Some(t) => Some(t.parse::<ColumnType>().map_err(|_| {
                    Error::config(format!("Invalid key type '{t}' for '{name}'"))
                })?),
                None => None,
            };
            columns.push((name.to_string(), ty));
        }
        let all: Vec<usize> = (0..columns.len()).collect();
        Ok(Self {
            content: all.clone(),
            acl: all.clone(),
            metadata: all,
            columns,
            doc_id_is_url,
        })
    }

    /// Set the three parameter projections from `(config key, value)` pairs. Blank keeps the full key.
    pub fn with_projections(mut self, sources: ProjectionSources<'_>) -> Result<Self> {
        self.content = self.projection(sources.content)?;
        self.acl = self.projection(sources.acl)?;
        self.metadata = self.projection(sources.metadata)?;
        Ok(self)
    }

    fn projection(&self, (config_key, list): (&str, &str)) -> Result<Vec<usize>> {
        if list.trim().is_empty() {
            return Ok((0..self.columns.len()).collect());
        }
        list.split(',')
            .map(str::trim)
            .map(|name| {
                self.columns
                    .iter()
                    .position(|(n, _)| n.eq_ignore_ascii_case(name))
                    .ok_or_else(|| {
                        Error::config(format!("Unknown column '{name}' from {config_key}"))
                    })
            })
            .collect()
    }

    /// Names of key columns that still have no type.
    pub fn unresolved(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|(_, ty)| ty.is_none())
            .map(|(n, _)| n.as_str())
            .collect()
    }

    /// Fill unresolved key column types from a result's declared types. Only the first
    /// result that mentions a column decides it; later results never override.
    pub fn add_column_types(&mut self, columns: &ColumnSet) -> Result<()> {
        for (name, ty) in self.columns.iter_mut().filter(|(_, ty)| ty.is_none()) {
            let Some(i) = columns.position(name) else {
                continue;
            };
            let Some(decl) = columns.decl_type(i) else {
                continue;
            };
            match ColumnType::from_sql_type(decl) {
                Some(t) => {
                    debug!("key column '{name}' resolved to {t} from SQL type {decl}");
                    *ty = Some(t);
                }
                None => {
                    return Err(Error::config(format!(
                        "Invalid SQL type '{decl}' for key column '{name}'"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn build(self) -> Result<KeySchema> {
        let unresolved = self.unresolved();
        if !unresolved.is_empty() {
            return Err(Error::config(format!(
                "Unknown column type for the following columns: [{}]",
                unresolved.join(", ")
            )));
        }
        let columns: Vec<KeyColumn> = self
            .columns
            .into_iter()
            .filter_map(|(name, ty)| ty.map(|ty| KeyColumn { name, ty }))
            .collect();
        if self.doc_id_is_url && (columns.len() != 1 || columns[0].ty != ColumnType::String) {
            return Err(Error::config(
                "document ids as URLs require exactly one string key column",
            ));
        }
        Ok(KeySchema {
            columns,
            content: self.content,
            acl: self.acl,
            metadata: self.metadata,
            doc_id_is_url: self.doc_id_is_url,
        })
    }
}

/// Fully resolved key schema. Immutable after startup.
#[derive(Clone, Debug)]
pub struct KeySchema {
    columns: Vec<KeyColumn>,
    content: Vec<usize>,
    acl: Vec<usize>,
    metadata: Vec<usize>,
    doc_id_is_url: bool,
}

impl KeySchema {
    pub fn columns(&self) -> &[KeyColumn] {
        &self.columns
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn doc_id_is_url(&self) -> bool {
        self.doc_id_is_url
    }

    /// Build the identity of a row. `Err` carries the reason the row cannot be listed.
    pub fn make_identity(&self, row: &Row, zone: FixedOffset) -> std::result::Result<DocId, String> {
        if self.doc_id_is_url {
            let name = &self.columns[0].name;
            let url = row
                .string(name)
                .ok_or_else(|| format!("key column '{name}' is NULL"))?;
            validate_url(&url)?;
            return Ok(DocId::new(url));
        }
        let mut rendered = Vec::with_capacity(self.columns.len());
        for col in &self.columns {
            let cell = row
                .get(&col.name)
                .ok_or_else(|| format!("key column '{}' missing from result", col.name))?;
            let value = KeyValue::from_sql(col.ty, cell, zone)
                .map_err(|e| format!("key column '{}': {e}", col.name))?
                .ok_or_else(|| format!("key column '{}' is NULL", col.name))?;
            rendered.push(value.render());
        }
        Ok(DocId::new(encode_parts(&rendered)))
    }

    /// Decode an identity into typed key values, in schema order.
    pub fn decode(&self, id: &DocId) -> Result<Vec<KeyValue>> {
        if self.doc_id_is_url {
            return Ok(vec![KeyValue::String(id.as_str().to_string())]);
        }
        let parts = decode_parts(id.as_str(), self.columns.len())?;
        self.columns
            .iter()
            .zip(parts)
            .map(|(col, part)| {
                KeyValue::parse(col.ty, &part).map_err(|reason| Error::decode(id.as_str(), reason))
            })
            .collect()
    }

    /// Positional parameters for one query, following its projection. Names may repeat.
    pub fn bind(&self, values: &[KeyValue], projection: Projection, zone: FixedOffset) -> Vec<Value> {
        let indices = match projection {
            Projection::Content => &self.content,
            Projection::Acl => &self.acl,
            Projection::Metadata => &self.metadata,
        };
        indices
            .iter()
            .filter_map(|&i| values.get(i))
            .map(|v| v.to_sql_value(zone))
            .collect()
    }
}

/// Absolute URL with a host.
pub fn validate_url(s: &str) -> std::result::Result<Url, String> {
    let url = Url::parse(s).map_err(|e| format!("invalid URL '{s}': {e}"))?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(format!("URL '{s}' has no host"));
    }
    Ok(url)
}
