//! Storage backends for Stowage save containers.
//!
//! A container is kept in two places: embedded in the host's own save
//! state through [`InBandStore`], and as a backup file managed by
//! [`BackupStore`].

mod atomic;
mod backup;
mod error;
mod in_band;

pub use atomic::atomic_write;
pub use backup::{BackupStore, Encoding, Loaded};
pub use error::{StorageError, StorageResult};
pub use in_band::{EntryMap, InBandStore, IN_BAND_TAG};
