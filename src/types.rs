//! Public types for the rowfeed API and pipeline.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Type of a key column. Drives rendering, parsing and parameter binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ColumnType {
    Int,
    Long,
    BigDecimal,
    String,
    Timestamp,
    Date,
    Time,
}

impl ColumnType {
    /// Map a declared SQL column type to a key type. `None` when the type is not in the table.
    ///
    /// Size suffixes are ignored (`VARCHAR(40)` → `VARCHAR`), matching is case-insensitive.
    pub fn from_sql_type(decl: &str) -> Option<ColumnType> {
        let base = decl.split('(').next().unwrap_or(decl).trim().to_ascii_uppercase();
        let ty = match base.as_str() {
            "BIT" | "BOOLEAN" | "BOOL" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INTEGER"
            | "INT" => ColumnType::Int,
            "BIGINT" => ColumnType::Long,
            "NUMERIC" | "DECIMAL" => ColumnType::BigDecimal,
            "CHAR" | "VARCHAR" | "LONGVARCHAR" | "NCHAR" | "NVARCHAR" | "LONGNVARCHAR"
            | "DATALINK" | "TEXT" | "CHARACTER" | "VARYING CHARACTER" | "NATIVE CHARACTER"
            | "NVARCHAR2" | "VARCHAR2" => ColumnType::String,
            "DATE" => ColumnType::Date,
            "TIME" => ColumnType::Time,
            "TIMESTAMP" | "DATETIME" => ColumnType::Timestamp,
            _ => return None,
        };
        Some(ty)
    }
}

impl FromStr for ColumnType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" => Ok(ColumnType::Int),
            "long" => Ok(ColumnType::Long),
            "bigdecimal" => Ok(ColumnType::BigDecimal),
            "string" => Ok(ColumnType::String),
            "timestamp" => Ok(ColumnType::Timestamp),
            "date" => Ok(ColumnType::Date),
            "time" => Ok(ColumnType::Time),
            other => Err(Error::config(format!("unknown key type '{other}'"))),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnType::Int => "int",
            ColumnType::Long => "long",
            ColumnType::BigDecimal => "bigdecimal",
            ColumnType::String => "string",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
        };
        f.write_str(s)
    }
}

/// Identifier of one document. Either an encoded key tuple or, in URL mode, the URL itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    pub fn new(id: impl Into<String>) -> Self {
        DocId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One outgoing record. Immutable once built; see [`DocRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DocRecord {
    doc_id: DocId,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    delete_from_index: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    crawl_immediately: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    metadata: Vec<(String, String)>,
}

impl DocRecord {
    pub fn builder(doc_id: DocId) -> DocRecordBuilder {
        DocRecordBuilder {
            record: DocRecord {
                doc_id,
                delete_from_index: false,
                crawl_immediately: false,
                metadata: Vec::new(),
            },
        }
    }

    pub fn doc_id(&self) -> &DocId {
        &self.doc_id
    }

    pub fn delete_from_index(&self) -> bool {
        self.delete_from_index
    }

    pub fn crawl_immediately(&self) -> bool {
        self.crawl_immediately
    }

    pub fn metadata(&self) -> &[(String, String)] {
        &self.metadata
    }
}

pub struct DocRecordBuilder {
    record: DocRecord,
}

impl DocRecordBuilder {
    pub fn delete_from_index(mut self, yes: bool) -> Self {
        self.record.delete_from_index = yes;
        self
    }

    pub fn crawl_immediately(mut self, yes: bool) -> Self {
        self.record.crawl_immediately = yes;
        self
    }

    pub fn metadata(mut self, metadata: Vec<(String, String)>) -> Self {
        self.record.metadata = metadata;
        self
    }

    pub fn build(self) -> DocRecord {
        self.record
    }
}

/// Counters reported by a full or incremental pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Rows read from the source.
    pub rows: usize,
    /// Records handed to the dispatcher.
    pub records: usize,
    /// Rows dropped because the identity could not be built (null key, bad URL, bad value).
    pub skipped: usize,
    /// Batches delivered to the sink.
    pub batches: usize,
    /// Pass stopped early on the cancel flag.
    pub cancelled: bool,
}
