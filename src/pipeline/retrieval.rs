//! Single-document retrieval: decode identity, bind projections, render the content row.

use chrono::FixedOffset;
use log::debug;
use rusqlite::params_from_iter;

use super::context::PipelineMode;
use crate::DocId;
use crate::engine::acl::{AclResolver, DocAcl};
use crate::engine::content::Body;
use crate::engine::db_ops::RowStreamer;
use crate::engine::key_schema::{KeySchema, Projection};
use crate::engine::metadata_columns::MetadataColumns;
use crate::engine::values::KeyValue;
use crate::error::Result;

#[derive(Debug)]
pub struct DocumentResponse {
    pub content_type: String,
    pub body: Body,
    pub metadata: Vec<(String, String)>,
    /// `None` when no ACL query is configured.
    pub acl: Option<DocAcl>,
    /// Links inside database content are never followed.
    pub no_follow: bool,
}

#[derive(Debug)]
pub enum Retrieval {
    NotFound,
    Found(DocumentResponse),
}

/// Everything retrieval reads. Empty SQL strings mean "not configured".
#[derive(Clone, Copy)]
pub struct RetrievalContext<'a> {
    pub streamer: &'a RowStreamer,
    pub schema: &'a KeySchema,
    pub mode: &'a PipelineMode,
    pub metadata: &'a MetadataColumns,
    pub acl: &'a AclResolver,
    pub content_sql: &'a str,
    pub acl_sql: &'a str,
    pub metadata_sql: &'a str,
    pub zone: FixedOffset,
}

impl RetrievalContext<'_> {
    pub fn fetch(&self, id: &DocId) -> Result<Retrieval> {
        let Some(renderer) = self.mode.renderer() else {
            debug!("{id}: listing-only mode serves no content");
            return Ok(Retrieval::NotFound);
        };
        let values = self.schema.decode(id)?;
        let params = self.schema.bind(&values, Projection::Content, self.zone);
        let Some(row) = self
            .streamer
            .first_row(self.content_sql, params_from_iter(params))?
        else {
            debug!("{id}: content query returned no row");
            return Ok(Retrieval::NotFound);
        };

        let metadata = if self.metadata_sql.trim().is_empty() {
            self.metadata.extract(&row)
        } else {
            let params = self.schema.bind(&values, Projection::Metadata, self.zone);
            self.streamer
                .first_row(self.metadata_sql, params_from_iter(params))?
                .map(|r| self.metadata.extract(&r))
                .unwrap_or_default()
        };
        let acl = self.resolve_acl(&values)?;
        let rendered = renderer.render(&row)?;
        Ok(Retrieval::Found(DocumentResponse {
            content_type: rendered.content_type,
            body: rendered.body,
            metadata,
            acl,
            no_follow: true,
        }))
    }

    /// ACL of one document, or `None` when no ACL query is configured.
    pub fn acl(&self, id: &DocId) -> Result<Option<DocAcl>> {
        let values = self.schema.decode(id)?;
        self.resolve_acl(&values)
    }

    fn resolve_acl(&self, values: &[KeyValue]) -> Result<Option<DocAcl>> {
        if self.acl_sql.trim().is_empty() {
            return Ok(None);
        }
        let params = self.schema.bind(values, Projection::Acl, self.zone);
        let rows = self.streamer.collect(self.acl_sql, params_from_iter(params))?;
        Ok(Some(self.acl.resolve(&rows)))
    }
}
