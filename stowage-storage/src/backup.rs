//! External backup files under `<root>/<mode>/<save name><suffix>`.

use crate::atomic::atomic_write;
use crate::error::{StorageError, StorageResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fmt;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// On-disk encoding of a backup document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Plain JSON text.
    Json,
    /// The same JSON text, gzip-compressed.
    Gzip,
}

impl Encoding {
    /// Encoding for the `compress` toggle.
    pub fn for_compression(compress: bool) -> Self {
        if compress {
            Encoding::Gzip
        } else {
            Encoding::Json
        }
    }

    /// File suffix, including the dot.
    pub fn suffix(self) -> &'static str {
        match self {
            Encoding::Json => ".json",
            Encoding::Gzip => ".stow",
        }
    }

    /// The other encoding.
    pub fn other(self) -> Self {
        match self {
            Encoding::Json => Encoding::Gzip,
            Encoding::Gzip => Encoding::Json,
        }
    }

    fn encode(self, document: &str) -> std::io::Result<Vec<u8>> {
        match self {
            Encoding::Json => Ok(document.as_bytes().to_vec()),
            Encoding::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(document.as_bytes())?;
                encoder.finish()
            }
        }
    }

    fn decode(self, path: &Path, bytes: Vec<u8>) -> StorageResult<String> {
        let bytes = match self {
            Encoding::Json => bytes,
            Encoding::Gzip => {
                let mut out = Vec::new();
                GzDecoder::new(bytes.as_slice()).read_to_end(&mut out)?;
                out
            }
        };
        String::from_utf8(bytes).map_err(|e| StorageError::InvalidData {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Encoding::Json => "json",
            Encoding::Gzip => "gzip",
        })
    }
}

/// A document read back from a backup file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded {
    pub document: String,
    pub encoding: Encoding,
    pub path: PathBuf,
}

/// Backup files rooted at one saves directory.
#[derive(Debug, Clone)]
pub struct BackupStore {
    root: PathBuf,
    preferred: Encoding,
}

impl BackupStore {
    pub fn new(root: impl Into<PathBuf>, preferred: Encoding) -> Self {
        Self {
            root: root.into(),
            preferred,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn preferred(&self) -> Encoding {
        self.preferred
    }

    pub fn set_preferred(&mut self, encoding: Encoding) {
        self.preferred = encoding;
    }

    /// Path of the `encoding` file for `save_name` in game mode `mode`.
    pub fn path(&self, mode: &str, save_name: &str, encoding: Encoding) -> StorageResult<PathBuf> {
        check_name(mode)?;
        check_name(save_name)?;
        Ok(self
            .root
            .join(mode)
            .join(format!("{save_name}{}", encoding.suffix())))
    }

    /// Writes `document` in the preferred encoding, replacing any previous
    /// file atomically.
    pub fn write(&self, mode: &str, save_name: &str, document: &str) -> StorageResult<PathBuf> {
        let path = self.path(mode, save_name, self.preferred)?;
        let bytes = self.preferred.encode(document)?;
        atomic_write(&path, &bytes)?;
        info!(path = %path.display(), encoding = %self.preferred, bytes = bytes.len(), "Backup written");
        Ok(path)
    }

    /// Reads the backup for `save_name`, trying the preferred encoding
    /// first. `Ok(None)` when neither file exists.
    ///
    /// A file that exists but cannot be decoded falls through to the other
    /// encoding; if that fails too, the first error is returned.
    pub fn read(&self, mode: &str, save_name: &str) -> StorageResult<Option<Loaded>> {
        let mut first_error = None;
        for encoding in [self.preferred, self.preferred.other()] {
            let path = self.path(mode, save_name, encoding)?;
            if !path.is_file() {
                continue;
            }
            match fs::read(&path)
                .map_err(StorageError::from)
                .and_then(|bytes| encoding.decode(&path, bytes))
            {
                Ok(document) => {
                    debug!(path = %path.display(), %encoding, "Backup read");
                    return Ok(Some(Loaded {
                        document,
                        encoding,
                        path,
                    }));
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Backup unreadable");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }

    /// True when a backup exists in either encoding.
    pub fn exists(&self, mode: &str, save_name: &str) -> bool {
        [Encoding::Json, Encoding::Gzip].into_iter().any(|encoding| {
            self.path(mode, save_name, encoding)
                .is_ok_and(|path| path.is_file())
        })
    }
}

fn check_name(name: &str) -> StorageResult<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0');
    if bad {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}
