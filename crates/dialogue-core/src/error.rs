use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error("Failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Keyword model for '{source_id}' not found at {path}")]
    ModelNotFound { source_id: String, path: PathBuf },

    #[error("Encoding service failed: {0}")]
    EncodingService(String),

    #[error("Vector store request failed: {0}")]
    Store(String),

    #[error("Empty corpus for '{0}', nothing to train")]
    EmptyCorpus(String),

    #[error("Invalid chunk metadata: {0}")]
    InvalidMetadata(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wraps an embedding/sparse-encoding failure, keeping the full cause chain.
    pub fn encoding(err: impl std::fmt::Display) -> Self {
        Self::EncodingService(format!("{err:#}"))
    }

    pub fn store(err: impl std::fmt::Display) -> Self {
        Self::Store(format!("{err:#}"))
    }

    /// Per-file and per-source conditions that must not abort a whole run.
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::ModelNotFound { .. } | Self::EmptyCorpus(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
