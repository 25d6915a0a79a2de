//! Error types for index files

use thiserror::Error;

/// Index errors
#[derive(Error, Debug)]
pub enum IndexError {
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Index file failed validation. Callers recover by rebuilding.
    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    /// Error from gribx-core
    #[error("Core error: {0}")]
    Core(#[from] gribx_core::Error),

    /// Index writer used out of order
    #[error("Invalid writer state: {0}")]
    InvalidState(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Group name not present in the collection
    #[error("Unknown group: {0}")]
    UnknownGroup(String),
}

impl IndexError {
    pub fn corrupt(msg: impl Into<String>) -> Self {
        IndexError::CorruptIndex(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        IndexError::InvalidState(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        IndexError::InvalidConfig(msg.into())
    }

    /// True for errors that a rebuild of the index file fixes.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, IndexError::CorruptIndex(_))
    }
}

/// Result type for index operations
pub type Result<T> = std::result::Result<T, IndexError>;
