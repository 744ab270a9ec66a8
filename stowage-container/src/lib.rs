//! Field serializer, record types and the save container.
//!
//! Payloads are stored per field as JSON text under a [`FieldKey`] salted
//! with the declaring plugin's name. Loading runs each payload through the
//! [`coerce`] cascade so saves survive field retyping between plugin
//! releases.
//!
//! [`FieldKey`]: stowage_types::FieldKey

pub mod coerce;
mod component;
mod container;
mod error;
mod field;
mod host;
mod singleton;

pub use coerce::{resolve, resolve_as, Coercion, CASCADE};
pub use component::{ComponentRecord, LoadPolicy};
pub use container::{SaveContainer, FORMAT_REVISION};
pub use error::{SerialError, SerialResult};
pub use field::{depth, SerialFields, MAX_DEPTH};
pub use host::{holder_at, Attachment, EntityHost};
pub use singleton::SingletonRecord;
