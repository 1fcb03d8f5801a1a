//! Result column → metadata key mapping.

use crate::engine::db_ops::Row;
use crate::engine::values::cell_to_string;
use crate::error::{Error, Result};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataColumns {
    /// `(column, key)` in declaration order.
    pairs: Vec<(String, String)>,
    include_all: bool,
}

impl MetadataColumns {
    /// Parse `col:key, col2, col3:` style mappings. Blank entries are skipped, a missing or
    /// empty key maps the column to its own name, and the key may itself contain `:`.
    pub fn parse(mapping: &str) -> Result<Self> {
        let mut pairs = Vec::new();
        for entry in mapping.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (column, key) = match entry.split_once(':') {
                Some((c, k)) => (c.trim(), k.trim()),
                None => (entry, ""),
            };
            if column.is_empty() {
                return Err(Error::config(format!(
                    "metadata column entry '{entry}' has no column name"
                )));
            }
            let key = if key.is_empty() { column } else { key };
            pairs.push((column.to_string(), key.to_string()));
        }
        Ok(Self {
            pairs,
            include_all: false,
        })
    }

    /// With no explicit mapping, emit every result column under its own name.
    pub fn include_all_when_empty(mut self, include_all: bool) -> Self {
        self.include_all = include_all && self.pairs.is_empty();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty() && !self.include_all
    }

    pub fn includes_all(&self) -> bool {
        self.include_all
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(c, _)| c.as_str())
    }

    /// Metadata pairs for one row. NULL cells and columns missing from the result are left out.
    pub fn extract(&self, row: &Row) -> Vec<(String, String)> {
        if self.include_all {
            return row
                .iter()
                .filter_map(|(name, cell)| cell_to_string(cell).map(|v| (name.to_string(), v)))
                .collect();
        }
        self.pairs
            .iter()
            .filter_map(|(column, key)| row.string(column).map(|v| (key.clone(), v)))
            .collect()
    }
}
