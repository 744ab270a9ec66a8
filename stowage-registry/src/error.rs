//! Error types for the plugin registry.

use thiserror::Error;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The plugin's declaration returned an error or panicked.
    #[error("plugin '{plugin}' failed to declare its types: {reason}")]
    DeclarationFailed { plugin: String, reason: String },

    /// No plugin with that assembly name is registered or queued.
    #[error("plugin not registered: {0}")]
    NotRegistered(String),
}
