//! rowfeed: feed relational database rows to a document index.
//!
//! Rows become documents whose ids are reversible encodings of their key columns. Listing
//! passes stream rows into bounded batches; incremental passes re-list rows changed since a
//! watermark; retrieval decodes an id back into query parameters to serve content and ACLs.

pub mod adaptor;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use adaptor::DatabaseAdaptor;
pub use error::{Error, Result};
pub use utils::settings::Settings;
