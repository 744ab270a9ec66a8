//! Core type definitions for Stowage.
//!
//! This crate defines the identifiers shared by every other Stowage crate:
//! - [`EntityId`]: the host simulation's integer identity for an entity
//! - [`Slot`]: the ordinal address of a sub-component within its parent
//! - [`TypeTag`]: the persisted, possibly unresolvable name of a declared type
//! - [`PluginId`] and [`FieldKey`]: stable hashes of plugin and field names

mod ids;
mod keys;

pub use ids::{EntityId, Slot, TypeTag};
pub use keys::{stable_hash, FieldKey, PluginId, UNSET_FIELD_NAME};
