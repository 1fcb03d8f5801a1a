//! Error taxonomy for the sync core. The binary wraps these in `anyhow` with context.

use thiserror::Error;

/// Result alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed cause carried by sink failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    /// Invalid settings, key declarations, SQL/column mismatch. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed identity on the retrieval path. Fails that retrieval only.
    #[error("cannot decode document id '{id}': {reason}")]
    Decode { id: String, reason: String },

    /// Query preparation, execution or cursor failure.
    #[error("source error ({context}): {source}")]
    Source {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    /// The sink refused or failed a batch.
    #[error("delivery failed: {message}")]
    Delivery {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("i/o error ({context}): {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// An incremental pass was started while one is still running.
    #[error("an incremental pass is already running")]
    PassInProgress,
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    pub fn decode(id: &str, reason: impl Into<String>) -> Self {
        Error::Decode {
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    pub fn query(context: impl Into<String>, source: rusqlite::Error) -> Self {
        Error::Source {
            context: context.into(),
            source,
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    pub fn delivery(message: impl Into<String>, source: Option<BoxError>) -> Self {
        Error::Delivery {
            message: message.into(),
            source,
        }
    }

    /// True for errors the caller should report as a bad request rather than a failure.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Error::Decode { .. })
    }
}
