//! Engine configuration, read from `stowage.toml`.

use crate::error::EngineResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use stowage_container::LoadPolicy;
use stowage_storage::Encoding;
use tracing::{info, warn};

/// Whether the external backup file is written and read at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupMode {
    #[default]
    Enabled,
    Disabled,
}

/// Configuration parsed from `stowage.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StowageConfig {
    /// Write backups gzip-compressed (`.stow`) instead of indented JSON.
    #[serde(default = "default_true")]
    pub compress: bool,
    #[serde(default)]
    pub backup: BackupMode,
    /// Keep loading the remaining fields of a record after one fails.
    #[serde(default = "default_true")]
    pub continue_on_partial_failure: bool,
    #[serde(default = "default_saves_dir")]
    pub saves_dir: PathBuf,
    /// Log the `stowage` crates at debug instead of info. Applied by
    /// [`init_logging`](Self::init_logging).
    #[serde(default)]
    pub verbose: bool,
}

fn default_true() -> bool {
    true
}

fn default_saves_dir() -> PathBuf {
    PathBuf::from("stowage-saves")
}

impl Default for StowageConfig {
    fn default() -> Self {
        Self {
            compress: true,
            backup: BackupMode::Enabled,
            continue_on_partial_failure: true,
            saves_dir: default_saves_dir(),
            verbose: false,
        }
    }
}

impl StowageConfig {
    /// Installs the fmt subscriber at the level `verbose` selects. Returns
    /// false when the host already installed one.
    pub fn init_logging(&self) -> bool {
        crate::logging::init(self.verbose)
    }

    /// Loads the configuration at `path`.
    ///
    /// A missing, unreadable or malformed file yields the defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("No config file found at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => {
                    info!("Loaded stowage config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!(
                        "Failed to parse config file {:?}: {}. Falling back to defaults.",
                        path, e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read config file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Parses a TOML document. Absent keys take their defaults.
    pub fn parse(contents: &str) -> EngineResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Policy applied when loading records.
    pub fn load_policy(&self) -> LoadPolicy {
        LoadPolicy {
            continue_on_partial_failure: self.continue_on_partial_failure,
        }
    }

    /// Encoding new backup files are written in.
    pub fn encoding(&self) -> Encoding {
        Encoding::for_compression(self.compress)
    }

    pub fn backup_enabled(&self) -> bool {
        self.backup == BackupMode::Enabled
    }
}
