//! Pipeline components: record building, batching, passes, retrieval.

pub mod context;
pub mod dispatcher;
pub mod error_handler;
pub mod lister;
pub mod retrieval;
pub mod sink;
pub mod watermark;

pub use context::{PipelineMode, RecordFactory};
pub use dispatcher::BatchDispatcher;
pub use error_handler::finish_pass;
pub use lister::{PassInput, full_pass};
pub use retrieval::{DocumentResponse, Retrieval, RetrievalContext};
pub use sink::{BatchSink, FeedDirSink, LogSink, MemorySink};
pub use watermark::{IncrementalLister, Watermark};
