//! Error types for the cleaning pipeline and its collaborators.
//!
//! Structural problems (missing input, unusable schema, colliding column
//! names) are fatal and abort a run before anything is written. Row-level
//! anomalies never surface here; they are repaired in place.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("schema error: {message}")]
    Schema { message: String },

    #[error("input file {path} is missing or unreadable: {reason}")]
    MissingInput { path: PathBuf, reason: String },

    #[error("column collision: '{first}' and '{second}' both normalize to '{column}'")]
    ColumnCollision {
        column: String,
        first: String,
        second: String,
    },

    #[error("invalid configuration: {message}")]
    Config { message: String },

    #[error("load aborted at row {row}, column '{column}': {message}")]
    Load {
        row: usize,
        column: String,
        message: String,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn missing_input(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::MissingInput {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
