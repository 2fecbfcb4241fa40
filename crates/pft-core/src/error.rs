//! Error types for pft-core

use std::path::PathBuf;

use thiserror::Error;

use crate::provider::ProviderError;

/// Result type alias using pft-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pft-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote provider error
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A local record could not be parsed
    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// Project or provider configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Item not found
    #[error("Item not found: {0}")]
    NotFound(String),

    /// Conflict under the manual policy; a human has to pick a side
    #[error("manual resolution required for {0}")]
    ManualResolutionRequired(String),
}

impl Error {
    /// Build a parse error scoped to one file.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}
