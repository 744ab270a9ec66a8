//! Identifier types used throughout Stowage.
//!
//! Entity identities are owned by the host simulation; Stowage only stores
//! and compares them.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of an addressable unit in the host simulation.
/// Sub-components that the host can address on their own use the same space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(i32);

impl EntityId {
    /// Wraps a host-assigned identity.
    #[must_use]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Returns the raw host identity.
    #[must_use]
    pub const fn get(&self) -> i32 {
        self.0
    }
}

impl From<i32> for EntityId {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// Position of a component within its entity.
///
/// [`Slot::ENTITY`] (`-1`) addresses the entity itself. Any other value is the
/// ordinal of a sub-component in the parent's ordered part list *at the time
/// of the last save*. It is not a stable identity: if the host reorders the
/// parts between save and load, the record binds to whichever part now sits
/// at that position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Slot(i32);

impl Slot {
    /// The entity-level slot.
    pub const ENTITY: Slot = Slot(-1);

    /// Slot of the part at `index` in the parent's ordered list.
    #[must_use]
    pub fn part(index: usize) -> Self {
        Self(i32::try_from(index).unwrap_or(i32::MAX))
    }

    /// Wraps a raw slot value as read from a save. Every negative value
    /// means the entity slot and becomes [`Slot::ENTITY`].
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        if raw < 0 { Self::ENTITY } else { Self(raw) }
    }

    /// Returns the raw slot value.
    #[must_use]
    pub const fn get(&self) -> i32 {
        self.0
    }

    /// Returns true for [`Slot::ENTITY`].
    #[must_use]
    pub const fn is_entity(&self) -> bool {
        self.0 == Self::ENTITY.0
    }

    /// Index into the parent's part list, or `None` for the entity slot.
    #[must_use]
    pub fn part_index(&self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl<'de> Deserialize<'de> for Slot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i32::deserialize(deserializer).map(Self::from_raw)
    }
}

impl Default for Slot {
    fn default() -> Self {
        Self::ENTITY
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_entity() {
            write!(f, "entity")
        } else {
            write!(f, "part#{}", self.0)
        }
    }
}

/// Persisted name of a declared singleton or component type.
///
/// A tag read back from a save may not resolve to any registered schema
/// (the declaring plugin is no longer installed). Such records are kept
/// verbatim but never loaded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeTag(String);

impl TypeTag {
    /// Creates a tag from a declared type name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TypeTag {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for TypeTag {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
