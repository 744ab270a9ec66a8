//! Stable hashed keys.
//!
//! Keys must hash identically across processes and platforms, so they are
//! derived from SHA-256 rather than `std::hash`, whose output is seeded.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Field name substituted when a declaration supplies an empty one.
pub const UNSET_FIELD_NAME: &str = "UNSET_ERROR";

/// Hashes `input` to a `u64` using the first eight bytes of its SHA-256 digest.
pub fn stable_hash(input: &str) -> u64 {
    let digest = Sha256::digest(input.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

/// Identity of a registered plugin: the stable hash of its assembly name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginId(u64);

impl PluginId {
    /// Derives the identity of the plugin named `assembly_name`.
    #[must_use]
    pub fn from_name(assembly_name: &str) -> Self {
        Self(stable_hash(assembly_name))
    }

    /// Returns the raw hash.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Key of one persisted field inside a record.
///
/// Salted with the declaring plugin's assembly name so that two plugins
/// persisting identically named fields on the same type never overwrite each
/// other. Distinct `(assembly, field)` pairs can still collide with
/// probability around 2^-64 per pair; that residual risk is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldKey(u64);

impl FieldKey {
    /// Derives the key of `field_name` declared by `assembly_name`.
    #[must_use]
    pub fn new(assembly_name: &str, field_name: &str) -> Self {
        let field_name = if field_name.is_empty() {
            UNSET_FIELD_NAME
        } else {
            field_name
        };
        Self(stable_hash(&format!("{assembly_name}|{field_name}")))
    }

    /// Wraps a raw key as read from a save.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw key.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
