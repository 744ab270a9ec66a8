//! The copy of the container embedded in the host's own save state.

use crate::error::{StorageError, StorageResult};
use std::collections::BTreeMap;

/// Key of the container's entry in the host's save state.
pub const IN_BAND_TAG: &str = "stowage.SaveContainer";

/// Typed entries inside the host's save-state object.
pub trait InBandStore {
    /// The document stored under `tag`, if the host save carries one.
    fn read_entry(&self, tag: &str) -> StorageResult<Option<String>>;

    /// Stores `document` under `tag`, replacing any previous entry.
    fn write_entry(&mut self, tag: &str, document: String) -> StorageResult<()>;
}

/// In-memory entries, for hosts that hand over their save state as a map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryMap {
    entries: BTreeMap<String, String>,
    read_only: bool,
}

impl EntryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries that refuse writes, as while the host save is being closed.
    pub fn read_only(entries: BTreeMap<String, String>) -> Self {
        Self {
            entries,
            read_only: true,
        }
    }

    pub fn get(&self, tag: &str) -> Option<&str> {
        self.entries.get(tag).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl InBandStore for EntryMap {
    fn read_entry(&self, tag: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.get(tag).cloned())
    }

    fn write_entry(&mut self, tag: &str, document: String) -> StorageResult<()> {
        if self.read_only {
            return Err(StorageError::InBand(format!("entry '{tag}' is read-only")));
        }
        self.entries.insert(tag.to_string(), document);
        Ok(())
    }
}
