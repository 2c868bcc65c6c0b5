//! Error types for format operations

use thiserror::Error;

/// Errors that can occur during format operations.
///
/// Parsing markup and serializing a typed tree never fail; errors only come
/// from the JSON boundary and from registry lookups.
#[derive(Error, Debug)]
pub enum FormatError {
    /// A tree received from outside violates the document shape
    #[error("Malformed tree: {0}")]
    MalformedTree(String),
    /// The input is not valid JSON
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Format not found in registry
    #[error("Format '{0}' not found")]
    FormatNotFound(String),
    /// Format does not support the requested direction
    #[error("Operation not supported: {0}")]
    NotSupported(String),
}

impl FormatError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        FormatError::MalformedTree(message.into())
    }
}
