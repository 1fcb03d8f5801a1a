//! Source database access: connections, row streaming, startup inspection.

mod connection;
mod inspect;
mod row;
mod streamer;

pub use connection::SourceDb;
pub use inspect::{query_columns, verify_column_names};
pub use row::{ColumnSet, Row};
pub use streamer::{RowStreamer, StreamOutcome, sql_preview};
