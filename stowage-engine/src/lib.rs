//! Persistence orchestrator for Stowage.
//!
//! Ties the plugin registry, the save container and the two storage paths
//! to the host's game lifecycle. A host typically:
//!
//! 1. reads [`StowageConfig::load_from`] and, unless it runs its own
//!    subscriber, calls [`StowageConfig::init_logging`]
//!    (`logging::init(config.verbose)`),
//! 2. builds an [`Orchestrator`] from that config,
//! 3. lets plugins [`register`](Orchestrator::register),
//! 4. forwards its lifecycle events (`on_mode_switch`, `on_world_setup`,
//!    `tick`, `on_host_saving`, `on_host_saved`, `on_entity_destroyed`).

pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod orchestrator;
pub mod session;

pub use config::{BackupMode, StowageConfig};
pub use error::{EngineError, EngineResult};
pub use host::{ErrorSurface, SaveHost};
pub use orchestrator::{LoadOutcome, Orchestrator};
pub use session::{SaveSession, Session, SessionObserver};
