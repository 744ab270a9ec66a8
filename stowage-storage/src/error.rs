//! Error types for the storage layer.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur reading or writing save documents.
#[derive(Debug, Error)]
pub enum StorageError {
    /// IO error (file system or compression stream).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A save or mode name that cannot be used as a path component.
    #[error("invalid name for a save path: {0:?}")]
    InvalidName(String),

    /// The file decoded to something other than UTF-8 text.
    #[error("invalid data in {}: {reason}", path.display())]
    InvalidData { path: PathBuf, reason: String },

    /// The host refused to hand over or accept the in-band entry.
    #[error("in-band entry error: {0}")]
    InBand(String),
}
