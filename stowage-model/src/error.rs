//! Error types for the persistence model.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while reading or writing declared fields.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The payload could not be decoded into the field's type.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The live instance does not expose the requested field.
    #[error("field '{0}' is not exposed by the live instance")]
    MissingField(String),

    /// The live instance refused a value through its capability interface.
    #[error("instance rejected field '{field}': {reason}")]
    Rejected { field: String, reason: String },

    /// The live instance is not of the schema's type.
    #[error("live instance is not a '{0}'")]
    TypeMismatch(String),

    /// The live instance is already borrowed elsewhere.
    #[error("instance of '{0}' is busy")]
    InstanceBusy(String),

    /// A singleton schema was declared without an instance accessor.
    #[error("singleton '{0}' declares no instance accessor")]
    NoInstanceMarker(String),

    /// The field index is outside the schema's field table.
    #[error("no field #{index} on '{type_name}'")]
    NoSuchField { type_name: String, index: usize },
}
