//! Error types for the field serializer and records.

use stowage_model::{FieldType, ModelError};
use thiserror::Error;

/// Result type for serializer operations.
pub type SerialResult<T> = Result<T, SerialError>;

/// Errors that can occur while encoding or applying persisted fields.
#[derive(Debug, Error)]
pub enum SerialError {
    /// JSON encode/decode error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error reported by a declared field or schema.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The value nests deeper than the serializer allows.
    #[error("value nests {depth} levels deep, limit is {limit}")]
    TooDeep { depth: usize, limit: usize },

    /// A float field held NaN or an infinity, which JSON cannot carry.
    #[error("non-finite value for {field_type:?} field")]
    NonFinite { field_type: FieldType },

    /// No coercion strategy produced a value the field accepted.
    #[error("no coercion accepted payload for {field_type:?} field: {reason}")]
    NoCoercion {
        field_type: FieldType,
        reason: String,
    },
}
