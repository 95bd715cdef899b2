//! Error types for project persistence and reconciliation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, reconciling, or saving a project.
#[derive(Error, Debug)]
pub enum ProjectError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Two physically distinct files under `images/` share a base filename;
    /// their identity cannot be reconciled safely
    #[error("duplicate image filenames: {}", names.join("; "))]
    DuplicateImageFilenames {
        /// The ambiguous base filenames
        names: Vec<String>,
    },

    /// Required field is missing from a serialized record
    #[error("missing required field: {field}")]
    MissingField {
        /// Name of the missing field
        field: String,
    },

    /// The given path is not a directory
    #[error("not a directory: {path:?}")]
    NotADirectory {
        /// The offending path
        path: PathBuf,
    },
}

impl ProjectError {
    /// Create a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}
