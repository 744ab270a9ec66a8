//! Declarative persistence model for Stowage.
//!
//! Plugins describe what to persist instead of having it discovered by
//! runtime introspection. The four markers of the contract are:
//! - [`FieldDescriptor`]: "persist this field"
//! - [`ComponentSchema`]: "instances of this type are persisted component-by-component"
//! - [`SingletonSchema::instance`]: "this accessor yields the sole live instance"
//! - [`SingletonSchema`]: "this type is a persisted singleton"
//!
//! Schemas are handed to the engine through [`Declarations`] inside
//! [`PluginAssembly::declare`]. Types that cannot be addressed field by field
//! implement [`PersistedFields`] instead.

mod declare;
mod error;
mod field;
mod schema;

pub use declare::{Declarations, PluginAssembly, SchemaSource};
pub use error::{ModelError, ModelResult};
pub use field::{FieldDescriptor, FieldHint, FieldInfo, FieldType, PersistedFields};
pub use schema::{ComponentSchema, DeclaredComponent, DeclaredSingleton, SingletonSchema};
