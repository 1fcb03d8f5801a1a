//! Pipeline variants and the per-row record factory shared by full and incremental passes.

use chrono::FixedOffset;

use crate::engine::content::{ColumnOptions, ContentRenderer};
use crate::engine::db_ops::Row;
use crate::engine::key_schema::KeySchema;
use crate::engine::metadata_columns::MetadataColumns;
use crate::error::{Error, Result};
use crate::utils::config::FeedConsts;
use crate::{DocId, DocRecord};

/// How documents are listed and served.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineMode {
    /// Identities only. Nothing is served on retrieval.
    ListerOnly,
    /// Identities are URLs; listed records carry metadata columns. Nothing is served on retrieval.
    UrlAndMetadataLister,
    /// Encoded identities; content is rendered on retrieval.
    FullContent(ContentRenderer),
}

impl PipelineMode {
    pub const LISTER: &'static str = "lister";
    pub const URL_AND_METADATA_LISTER: &'static str = "urlAndMetadataLister";

    /// Resolve the `mode.name` setting against the closed set of modes. Content modes need
    /// encoded identities; URL identities only list.
    pub fn from_name(name: &str, opts: &ColumnOptions, doc_id_is_url: bool) -> Result<Self> {
        let name = name.trim();
        match name {
            Self::LISTER => Ok(PipelineMode::ListerOnly),
            Self::URL_AND_METADATA_LISTER => {
                if !doc_id_is_url {
                    return Err(Error::config(format!(
                        "mode '{name}' requires key.doc_id_is_url = true"
                    )));
                }
                Ok(PipelineMode::UrlAndMetadataLister)
            }
            _ => match ContentRenderer::from_name(name, opts)? {
                Some(_) if doc_id_is_url => Err(Error::config(format!(
                    "mode '{name}' serves content by decoded key and cannot be used with key.doc_id_is_url = true"
                ))),
                Some(renderer) => Ok(PipelineMode::FullContent(renderer)),
                None => Err(Error::config(format!(
                    "unknown mode '{name}'; supported modes: {}, {}, {}",
                    Self::LISTER,
                    Self::URL_AND_METADATA_LISTER,
                    ContentRenderer::NAMES.join(", ")
                ))),
            },
        }
    }

    pub fn renderer(&self) -> Option<&ContentRenderer> {
        match self {
            PipelineMode::FullContent(r) => Some(r),
            _ => None,
        }
    }

    /// Listed records carry metadata only in the URL-and-metadata lister.
    pub fn lists_metadata(&self) -> bool {
        matches!(self, PipelineMode::UrlAndMetadataLister)
    }
}

/// Builds a [`DocRecord`] from one listed row.
#[derive(Clone, Copy)]
pub struct RecordFactory<'a> {
    pub schema: &'a KeySchema,
    pub metadata: &'a MetadataColumns,
    pub action_column: Option<&'a str>,
    pub lists_metadata: bool,
    pub zone: FixedOffset,
}

impl RecordFactory<'_> {
    /// `Err` carries the reason the row was skipped.
    pub fn record(&self, row: &Row, crawl_immediately: bool) -> std::result::Result<DocRecord, String> {
        let id: DocId = self.schema.make_identity(row, self.zone)?;
        let builder = DocRecord::builder(id).crawl_immediately(crawl_immediately);
        let delete = self
            .action_column
            .and_then(|c| row.string(c))
            .is_some_and(|a| a.trim().eq_ignore_ascii_case(FeedConsts::DELETE_ACTION));
        if delete {
            return Ok(builder.delete_from_index(true).build());
        }
        let metadata = if self.lists_metadata {
            self.metadata.extract(row)
        } else {
            Vec::new()
        };
        Ok(builder.metadata(metadata).build())
    }
}
