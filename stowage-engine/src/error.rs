//! Error types for the persistence orchestrator.

use stowage_container::SerialError;
use stowage_storage::StorageError;
use thiserror::Error;

/// Result type for orchestrator operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("container error: {0}")]
    Container(#[from] SerialError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    /// The host has no current save to read or write.
    #[error("no active save session")]
    NoSession,

    /// Saving is suppressed, either explicitly or because no plugin is registered.
    #[error("saving is suppressed")]
    Suppressed,

    /// The backup file could be neither read nor recreated.
    #[error("backup for '{save_name}' unavailable: {reason}")]
    BackupUnavailable { save_name: String, reason: String },
}
