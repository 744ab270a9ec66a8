//! The persistence orchestrator.
//!
//! Owns the plugin registry and the save container, runs the two-phase
//! save and load passes, and keeps two copies of every save: one embedded
//! in the host's save state and one backup file beside it. The host drives
//! it through the lifecycle handlers at the bottom of this file.

use crate::config::StowageConfig;
use crate::error::{EngineError, EngineResult};
use crate::host::{current_session, ErrorSurface, SaveHost};
use crate::session::{SaveSession, Session};
use std::any::Any;
use std::path::PathBuf;
use stowage_container::{EntityHost, SaveContainer};
use stowage_model::PluginAssembly;
use stowage_registry::{
    isolate, HookPass, HookPhase, PassReport, PluginHooks, PluginRegistry, Registration,
};
use stowage_storage::{BackupStore, InBandStore, IN_BAND_TAG};
use stowage_types::EntityId;
use tracing::{debug, error, info, warn};

const FATAL_TITLE: &str = "Plugin save data unavailable";

/// Where a load found its container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Read from the host's own save state.
    InBand(PassReport),
    /// Read from the backup file at `path`.
    Backup { path: PathBuf, report: PassReport },
    /// Nothing saved yet. A fresh container was installed and, when backups
    /// are enabled, written to `path`.
    Recovered { path: Option<PathBuf> },
    /// The backup could be neither read nor recreated. A fresh container
    /// was installed and the error surfaced to the player.
    Unavailable { reason: String },
}

pub struct Orchestrator {
    config: StowageConfig,
    registry: PluginRegistry,
    container: SaveContainer,
    backup: BackupStore,
    session: Session,
    error_surface: Option<Box<dyn ErrorSurface>>,
    suppressed: bool,
    pending_load: bool,
    fatal_reported: bool,
}

impl Orchestrator {
    pub fn new(config: StowageConfig) -> Self {
        let backup = BackupStore::new(config.saves_dir.clone(), config.encoding());
        Self {
            config,
            registry: PluginRegistry::new(),
            container: SaveContainer::new(),
            backup,
            session: Session::new(),
            error_surface: None,
            suppressed: false,
            pending_load: false,
            fatal_reported: false,
        }
    }

    /// Routes fatal errors to `surface` in addition to the log.
    pub fn with_error_surface(mut self, surface: Box<dyn ErrorSurface>) -> Self {
        self.error_surface = Some(surface);
        self
    }

    // ================================================================
    // Accessors
    // ================================================================

    pub fn config(&self) -> &StowageConfig {
        &self.config
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn container(&self) -> &SaveContainer {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut SaveContainer {
        &mut self.container
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn backup(&self) -> &BackupStore {
        &self.backup
    }

    /// True while a load is waiting for the next [`tick`](Self::tick).
    pub fn load_pending(&self) -> bool {
        self.pending_load
    }

    // ================================================================
    // Plugins
    // ================================================================

    pub fn register(
        &mut self,
        assembly: Box<dyn PluginAssembly>,
        hooks: Option<Box<dyn PluginHooks>>,
    ) -> Registration {
        self.registry.register(assembly, hooks)
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.registry.unregister(name)
    }

    /// Turns saving and loading off, or back on.
    pub fn set_suppressed(&mut self, suppressed: bool) {
        self.suppressed = suppressed;
    }

    /// Saving is suppressed when explicitly turned off or while no plugin
    /// is registered.
    pub fn is_suppressed(&self) -> bool {
        self.suppressed || self.registry.is_empty()
    }

    // ================================================================
    // Passes
    // ================================================================

    /// Save hooks `Before`, singleton records rebuilt, save hooks `After`.
    pub fn run_save_pass(&mut self) -> PassReport {
        let mut report = PassReport::new(HookPass::Save);
        report
            .failures
            .extend(self.registry.run_save_hooks(HookPhase::Before));
        report.record_failures = self.container.save_all(&self.registry);
        report
            .failures
            .extend(self.registry.run_save_hooks(HookPhase::After));
        log_report(&report);
        report
    }

    /// Load hooks `Before`, singleton records applied, load hooks `After`.
    pub fn run_load_pass(&mut self) -> PassReport {
        let mut report = PassReport::new(HookPass::Load);
        report
            .failures
            .extend(self.registry.run_load_hooks(HookPhase::Before));
        report.record_failures = self
            .container
            .load_all(&self.registry, self.config.load_policy());
        report
            .failures
            .extend(self.registry.run_load_hooks(HookPhase::After));
        log_report(&report);
        report
    }

    // ================================================================
    // Components
    // ================================================================

    /// Saves `component` of `holder` into the container.
    pub fn save_component<C: Any>(
        &mut self,
        host: &dyn EntityHost,
        holder: EntityId,
        component: &C,
    ) -> bool {
        self.container
            .save_component(host, &self.registry, holder, component)
    }

    /// Saves the field `name` of `component` only.
    pub fn save_component_field<C: Any>(
        &mut self,
        host: &dyn EntityHost,
        holder: EntityId,
        component: &C,
        name: &str,
    ) -> bool {
        self.container
            .save_component_field(host, &self.registry, holder, component, name)
    }

    /// Applies the saved state of `holder` to `component`.
    pub fn load_component<C: Any>(
        &self,
        host: &dyn EntityHost,
        holder: EntityId,
        component: &mut C,
    ) -> bool {
        self.container.load_component(
            host,
            &self.registry,
            holder,
            component,
            self.config.load_policy(),
        )
    }

    /// Applies the saved value of the field `name` to `component`.
    pub fn load_component_field<C: Any>(
        &self,
        host: &dyn EntityHost,
        holder: EntityId,
        component: &mut C,
        name: &str,
    ) -> bool {
        self.container
            .load_component_field(host, &self.registry, holder, component, name)
    }

    /// Every saved record of `entity`, for the host to carry with it.
    pub fn entity_state(&self, entity: EntityId) -> String {
        self.container.entity_state(entity)
    }

    /// Restores `state` onto `entity`; `None` purges it.
    pub fn restore_entity_state(
        &mut self,
        host: &mut dyn EntityHost,
        entity: EntityId,
        state: Option<&str>,
    ) -> bool {
        let policy = self.config.load_policy();
        self.container
            .restore_entity_state(host, &self.registry, entity, state, policy)
    }

    // ================================================================
    // Storage
    // ================================================================

    /// Runs a save pass and writes the container to both the host's save
    /// state and the backup file.
    ///
    /// Succeeds when at least one copy was written.
    pub fn save(
        &mut self,
        session: &SaveSession,
        in_band: &mut dyn InBandStore,
    ) -> EngineResult<PassReport> {
        if self.is_suppressed() {
            debug!(session = %session, "Saving suppressed");
            return Err(EngineError::Suppressed);
        }
        let report = self.run_save_pass();
        let document = self.document()?;

        let in_band_result = in_band.write_entry(IN_BAND_TAG, document.clone());
        if let Err(e) = &in_band_result {
            warn!(session = %session, error = %e, "Failed to embed container in host save");
        }
        if !self.config.backup_enabled() {
            in_band_result?;
            return Ok(report);
        }
        match self
            .backup
            .write(&session.mode, &session.save_name, &document)
        {
            Ok(_) => Ok(report),
            Err(e) if in_band_result.is_ok() => {
                error!(session = %session, error = %e, "Failed to write backup file");
                Ok(report)
            }
            Err(e) => {
                error!(session = %session, error = %e, "Failed to write either copy of the container");
                Err(e.into())
            }
        }
    }

    /// Runs a save pass and writes the backup file only.
    pub fn flush_backup(&mut self, session: &SaveSession) -> EngineResult<PathBuf> {
        if self.is_suppressed() {
            return Err(EngineError::Suppressed);
        }
        self.run_save_pass();
        let document = self.document()?;
        Ok(self
            .backup
            .write(&session.mode, &session.save_name, &document)?)
    }

    /// Installs the container saved for `session` and runs a load pass.
    ///
    /// The host's save state is tried first, then the backup file. When
    /// neither holds a container a fresh one is installed and written out
    /// as the new backup. A backup that exists but cannot be read is left
    /// on disk untouched.
    pub fn load(
        &mut self,
        session: &SaveSession,
        in_band: &dyn InBandStore,
    ) -> EngineResult<LoadOutcome> {
        if self.is_suppressed() {
            debug!(session = %session, "Loading suppressed");
            return Err(EngineError::Suppressed);
        }

        if let Some(container) = read_in_band(session, in_band) {
            self.container.replace(container);
            info!(session = %session, "Loaded container from host save");
            return Ok(LoadOutcome::InBand(self.run_load_pass()));
        }

        if !self.config.backup_enabled() {
            self.container.reset();
            debug!(session = %session, "No saved container, starting fresh");
            return Ok(LoadOutcome::Recovered { path: None });
        }

        match self.backup.read(&session.mode, &session.save_name) {
            Ok(Some(loaded)) => match SaveContainer::from_json(&loaded.document) {
                Ok(container) => {
                    self.container.replace(container);
                    info!(path = %loaded.path.display(), encoding = %loaded.encoding, "Loaded container from backup");
                    let report = self.run_load_pass();
                    Ok(LoadOutcome::Backup {
                        path: loaded.path,
                        report,
                    })
                }
                Err(e) => Ok(self.unavailable(session, &e.to_string())),
            },
            Ok(None) => Ok(self.recover(session)),
            Err(e) => Ok(self.unavailable(session, &e.to_string())),
        }
    }

    fn recover(&mut self, session: &SaveSession) -> LoadOutcome {
        info!(session = %session, "No saved container, writing a fresh backup");
        self.container.reset();
        self.run_save_pass();
        let written = self
            .document()
            .and_then(|document| {
                Ok(self
                    .backup
                    .write(&session.mode, &session.save_name, &document)?)
            });
        match written {
            Ok(path) => LoadOutcome::Recovered { path: Some(path) },
            Err(e) => self.unavailable(session, &e.to_string()),
        }
    }

    fn unavailable(&mut self, session: &SaveSession, reason: &str) -> LoadOutcome {
        self.container.reset();
        let err = EngineError::BackupUnavailable {
            save_name: session.save_name.clone(),
            reason: reason.to_string(),
        };
        self.report_fatal(&err.to_string());
        LoadOutcome::Unavailable {
            reason: reason.to_string(),
        }
    }

    /// Logs `message` and shows it to the player once per session.
    fn report_fatal(&mut self, message: &str) {
        error!(error = message, "Fatal persistence error");
        if self.fatal_reported {
            return;
        }
        self.fatal_reported = true;
        let Some(surface) = self.error_surface.as_mut() else {
            return;
        };
        let shown = isolate(|| {
            surface.report_fatal(FATAL_TITLE, message);
            Ok(())
        });
        if let Err(e) = shown {
            warn!(error = %e, "Error surface failed");
        }
    }

    fn document(&self) -> EngineResult<String> {
        Ok(self.container.to_json(!self.config.compress)?)
    }

    // ================================================================
    // Host lifecycle
    // ================================================================

    /// The host switched game modes: drop everything from the old session.
    pub fn on_mode_switch(&mut self) {
        self.container.reset();
        self.pending_load = false;
        self.fatal_reported = false;
        self.session.close();
        debug!("Container reset for mode switch");
    }

    /// The host finished setting up a world. The load waits one tick so
    /// the host's entities exist before plugins restore onto them.
    pub fn on_world_setup(&mut self, host: &dyn SaveHost) {
        if host.is_persistent_mode() {
            self.pending_load = true;
            debug!("Load deferred to next tick");
        }
    }

    /// Retries queued registrations and runs a deferred load.
    ///
    /// Returns the load's outcome when one ran.
    pub fn tick(
        &mut self,
        host: &dyn SaveHost,
        in_band: &dyn InBandStore,
    ) -> Option<EngineResult<LoadOutcome>> {
        let admitted = self.registry.tick();
        if admitted > 0 {
            info!(admitted, "Queued plugins registered");
        }
        if !self.pending_load {
            return None;
        }
        self.pending_load = false;
        let Some(session) = current_session(host) else {
            warn!("Deferred load skipped, host has no current save");
            return Some(Err(EngineError::NoSession));
        };
        self.session.open(session.clone());
        Some(self.load(&session, in_band))
    }

    /// The host is about to write its own save.
    pub fn on_host_saving(
        &mut self,
        host: &dyn SaveHost,
        in_band: &mut dyn InBandStore,
    ) -> EngineResult<PassReport> {
        let session = current_session(host).ok_or(EngineError::NoSession)?;
        self.session.open(session.clone());
        self.save(&session, in_band)
    }

    /// The host finished a mode and saved on its own. Only managed slots
    /// get their backup refreshed.
    pub fn on_host_saved(&mut self, host: &dyn SaveHost) -> Option<EngineResult<PathBuf>> {
        if !host.is_persistent_mode() {
            return None;
        }
        let session = current_session(host)?;
        if !host.is_managed_slot(&session.save_name) {
            debug!(session = %session, "Not a managed slot, backup left as is");
            return None;
        }
        Some(self.flush_backup(&session))
    }

    /// The host destroyed `entity`; its records go with it.
    pub fn on_entity_destroyed(&mut self, entity: EntityId) -> bool {
        self.container.purge_entity(entity)
    }
}

fn read_in_band(session: &SaveSession, in_band: &dyn InBandStore) -> Option<SaveContainer> {
    let document = match in_band.read_entry(IN_BAND_TAG) {
        Ok(Some(document)) => document,
        Ok(None) => return None,
        Err(e) => {
            warn!(session = %session, error = %e, "Host save entry unreadable");
            return None;
        }
    };
    match SaveContainer::from_json(&document) {
        Ok(container) => Some(container),
        Err(e) => {
            warn!(session = %session, error = %e, "Container in host save is corrupt, trying backup");
            None
        }
    }
}

fn log_report(report: &PassReport) {
    if report.is_clean() {
        debug!("{report}");
    } else {
        warn!(failing = ?report.failing_plugins(), "{report}");
    }
}
