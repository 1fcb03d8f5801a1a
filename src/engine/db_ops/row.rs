//! Owned result rows with case-insensitive column lookup.

use rusqlite::Statement;
use rusqlite::types::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::values::cell_to_string;

/// Column names and declared types of one result, shared by all its rows.
#[derive(Clone, Debug, Default)]
pub struct ColumnSet {
    names: Vec<String>,
    decl_types: Vec<Option<String>>,
    /// Lower-cased name → first position.
    index: HashMap<String, usize>,
}

impl ColumnSet {
    pub fn new(names: Vec<String>, decl_types: Vec<Option<String>>) -> Self {
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            index.entry(name.to_lowercase()).or_insert(i);
        }
        Self {
            names,
            decl_types,
            index,
        }
    }

    /// Names and declared types from a prepared statement. Expression columns have no declared type.
    pub fn from_statement(stmt: &Statement<'_>) -> Self {
        let (names, decl_types) = stmt
            .columns()
            .into_iter()
            .map(|c| (c.name().to_string(), c.decl_type().map(str::to_string)))
            .unzip();
        Self::new(names, decl_types)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(&name.to_lowercase()).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn decl_type(&self, i: usize) -> Option<&str> {
        self.decl_types.get(i).and_then(|t| t.as_deref())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct Row {
    columns: Arc<ColumnSet>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<ColumnSet>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns.position(name).and_then(|i| self.values.get(i))
    }

    /// Column as text; `None` when the column is missing or NULL.
    pub fn string(&self, name: &str) -> Option<String> {
        self.get(name).and_then(cell_to_string)
    }

    /// `(name, value)` pairs in result order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}
