//! Engine: identity codec, typed values, source access, ACL/metadata/content resolution, CLI.

pub mod acl;
pub mod arg_parser;
pub mod cli;
pub mod codec;
pub mod content;
pub mod db_ops;
pub mod key_schema;
pub mod metadata_columns;
pub mod progress;
pub mod values;

// Re-export commonly used items
pub use acl::{Acl, AclColumns, AclResolver, DocAcl, Principal};
pub use arg_parser::{Cli, Commands};
pub use cli::handle_run;
pub use codec::{decode_parts, encode_parts, escape_part, split_identity, unescape_part};
pub use content::{Body, ColumnOptions, ContentRenderer, ContentType};
pub use db_ops::{ColumnSet, Row, RowStreamer, SourceDb, StreamOutcome};
pub use key_schema::{KeyColumn, KeySchema, KeySchemaBuilder, Projection, ProjectionSources};
pub use metadata_columns::MetadataColumns;
pub use values::KeyValue;
