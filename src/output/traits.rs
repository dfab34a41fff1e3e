//! Record sink trait and error types
//!
//! This module defines the trait interface the crawler uses to persist
//! parsed recipes, and the errors a sink may report.

use crate::parser::Record;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to create output folder {path}: {source}")]
    CreateDir {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to serialize record {id}: {source}")]
    Serialize {
        id: String,
        source: serde_json::Error,
    },

    #[error("Refusing to write record with unsafe identifier '{0}'")]
    UnsafeIdentifier(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Durable storage for parsed recipes, keyed by identifier
///
/// Sinks are shared by all workers of a level, so implementations must
/// tolerate concurrent calls for distinct identifiers.
pub trait RecordSink: Send + Sync {
    /// Writes one record, replacing any earlier copy with the same identifier
    fn persist(&self, record: &Record) -> OutputResult<()>;
}
