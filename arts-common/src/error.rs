//! Common error types for ARTS

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for ARTS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the ARTS tools
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required or declared metadata column is absent or fails its check.
    ///
    /// Raised before any spatial computation runs.
    #[error("Schema error in column '{column}': {constraint}")]
    Schema { column: String, constraint: String },

    /// Detected overlaps lack a human classification
    #[error("Incomplete intersection information for {count} feature(s){}", side_file_note(.side_file))]
    Incomplete {
        count: usize,
        side_file: Option<PathBuf>,
    },

    /// Geometry could not be decoded or is unsupported
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Batch lifecycle transition not permitted
    #[error("Invalid batch state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

fn side_file_note(side_file: &Option<PathBuf>) -> String {
    match side_file {
        Some(path) => format!(" (see {})", path.display()),
        None => String::new(),
    }
}

impl Error {
    /// Shorthand for a schema violation on one column
    pub fn schema(column: impl Into<String>, constraint: impl Into<String>) -> Self {
        Error::Schema {
            column: column.into(),
            constraint: constraint.into(),
        }
    }
}
