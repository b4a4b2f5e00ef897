use std::io;
use thiserror::Error;

/// Error type for methsil-io operations.
///
/// Row-level data-quality problems never surface here; they are filtered and logged by the
/// loader.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The source is neither cached locally nor fetchable.
    #[error("Source '{id}' is unavailable: {reason}")]
    SourceUnavailable { id: String, reason: String },

    /// The file does not have the declared column layout.
    #[error("Table '{table}' does not match its schema: {detail}")]
    SchemaMismatch { table: String, detail: String },

    #[error("Unknown table identifier: {0}")]
    UnknownTable(String),

    #[error("Column '{column}' of table '{table}' is missing or has the wrong type")]
    MissingColumn { table: String, column: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed delimited record: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type alias for methsil-io operations.
pub type Result<T> = std::result::Result<T, LoadError>;
