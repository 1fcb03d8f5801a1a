//! Content renderers: turn the content query's first row into a document body.

use memmap2::Mmap;
use rusqlite::types::Value;
use std::fs::File;
use std::path::Path;

use crate::engine::db_ops::Row;
use crate::engine::values::cell_to_string;
use crate::error::{Error, Result};
use crate::utils::config::ContentConsts;

/// Options shared by the single-column renderers.
#[derive(Clone, Debug, Default)]
pub struct ColumnOptions {
    pub column: Option<String>,
    pub content_type_override: Option<String>,
    pub content_type_col: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentType {
    /// Text columns are served as UTF-8 text, everything else as octet-stream.
    Inferred,
    Fixed(String),
    /// Read per row from a result column; falls back to inferred when NULL.
    FromColumn(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentRenderer {
    /// Whole row as two CSV lines: column names, then values.
    RowToText,
    /// Body is the value of one BLOB or TEXT column.
    Column {
        column: String,
        content_type: ContentType,
    },
    /// Body is the file whose path is held in one column.
    FilePath {
        column: String,
        content_type: ContentType,
    },
}

/// Document body. Large files are served from a read-only mapping.
#[derive(Debug)]
pub enum Body {
    Bytes(Vec<u8>),
    Mapped(Mmap),
}

impl Body {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Body::Bytes(b) => b.as_slice(),
            Body::Mapped(m) => &m[..],
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
pub struct Rendered {
    pub content_type: String,
    pub body: Body,
}

impl ContentRenderer {
    /// Registered renderer names, in the form used by the `mode.name` setting.
    pub const NAMES: [&'static str; 4] = ["rowToText", "blobColumn", "contentColumn", "filepathColumn"];

    /// Look up a renderer by configured name. `Ok(None)` when the name is not a renderer.
    pub fn from_name(name: &str, opts: &ColumnOptions) -> Result<Option<Self>> {
        let renderer = match name {
            "rowToText" => ContentRenderer::RowToText,
            "blobColumn" | "contentColumn" => ContentRenderer::Column {
                column: required_column(name, opts)?,
                content_type: content_type(name, opts)?,
            },
            "filepathColumn" => ContentRenderer::FilePath {
                column: required_column(name, opts)?,
                content_type: content_type(name, opts)?,
            },
            _ => return Ok(None),
        };
        Ok(Some(renderer))
    }

    /// Result columns the content query must return for this renderer.
    pub fn required_columns(&self) -> Vec<&str> {
        let (column, content_type) = match self {
            ContentRenderer::RowToText => return Vec::new(),
            ContentRenderer::Column {
                column,
                content_type,
            }
            | ContentRenderer::FilePath {
                column,
                content_type,
            } => (column, content_type),
        };
        let mut cols = vec![column.as_str()];
        if let ContentType::FromColumn(c) = content_type {
            cols.push(c.as_str());
        }
        cols
    }

    pub fn render(&self, row: &Row) -> Result<Rendered> {
        match self {
            ContentRenderer::RowToText => Ok(Rendered {
                content_type: ContentConsts::TEXT_CONTENT_TYPE.to_string(),
                body: Body::Bytes(row_to_text(row).into_bytes()),
            }),
            ContentRenderer::Column {
                column,
                content_type,
            } => {
                let (body, is_text) = match row.get(column) {
                    Some(Value::Blob(b)) => (b.clone(), false),
                    Some(Value::Null) | None => (Vec::new(), false),
                    Some(cell) => (cell_to_string(cell).unwrap_or_default().into_bytes(), true),
                };
                Ok(Rendered {
                    content_type: resolve_content_type(content_type, row, is_text),
                    body: Body::Bytes(body),
                })
            }
            ContentRenderer::FilePath {
                column,
                content_type,
            } => {
                let path = row.string(column).ok_or_else(|| {
                    Error::io(
                        format!("content path column '{column}'"),
                        std::io::Error::new(std::io::ErrorKind::NotFound, "path is NULL"),
                    )
                })?;
                Ok(Rendered {
                    content_type: resolve_content_type(content_type, row, false),
                    body: read_file(Path::new(&path))?,
                })
            }
        }
    }
}

fn required_column(mode: &str, opts: &ColumnOptions) -> Result<String> {
    match opts.column.as_deref().map(str::trim) {
        Some(c) if !c.is_empty() => Ok(c.to_string()),
        _ => Err(Error::config(format!("mode '{mode}' requires mode.column_name"))),
    }
}

fn content_type(mode: &str, opts: &ColumnOptions) -> Result<ContentType> {
    let fixed = opts.content_type_override.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let col = opts.content_type_col.as_deref().map(str::trim).filter(|s| !s.is_empty());
    match (fixed, col) {
        (Some(_), Some(_)) => Err(Error::config(format!(
            "mode '{mode}': content_type_override and content_type_col cannot both be set"
        ))),
        (Some(t), None) => Ok(ContentType::Fixed(t.to_string())),
        (None, Some(c)) => Ok(ContentType::FromColumn(c.to_string())),
        (None, None) => Ok(ContentType::Inferred),
    }
}

fn resolve_content_type(content_type: &ContentType, row: &Row, is_text: bool) -> String {
    let inferred = || {
        if is_text {
            ContentConsts::TEXT_CONTENT_TYPE.to_string()
        } else {
            ContentConsts::BINARY_CONTENT_TYPE.to_string()
        }
    };
    match content_type {
        ContentType::Inferred => inferred(),
        ContentType::Fixed(t) => t.clone(),
        ContentType::FromColumn(c) => row.string(c).unwrap_or_else(inferred),
    }
}

/// Read a content file; files above the threshold are mapped instead of copied.
fn read_file(path: &Path) -> Result<Body> {
    let context = || format!("read content file {}", path.display());
    let file = File::open(path).map_err(|e| Error::io(context(), e))?;
    let size = file.metadata().map_err(|e| Error::io(context(), e))?.len();
    if size > ContentConsts::MMAP_THRESHOLD {
        // SAFETY: read-only mapping; the file is not written through this process.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::io(context(), e))?;
        return Ok(Body::Mapped(mmap));
    }
    std::fs::read(path)
        .map(Body::Bytes)
        .map_err(|e| Error::io(context(), e))
}

/// Two CSV lines: column names, then values. NULL renders as an empty field.
pub fn row_to_text(row: &Row) -> String {
    let header: Vec<String> = row.columns().names().iter().map(|n| csv_field(n)).collect();
    let values: Vec<String> = row
        .values()
        .iter()
        .map(|v| csv_field(&cell_to_string(v).unwrap_or_default()))
        .collect();
    format!("{}\n{}\n", header.join(","), values.join(","))
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
