//! Plugin save/load hooks and their isolation.
//!
//! Every call into plugin code goes through [`isolate`], which turns both
//! returned errors and panics into a message. A pass collects those into a
//! [`PassReport`] instead of aborting.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Which persistence pass a hook runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPass {
    Save,
    Load,
}

impl fmt::Display for HookPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HookPass::Save => "save",
            HookPass::Load => "load",
        })
    }
}

/// Whether a hook runs before or after the container is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    Before,
    After,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HookPhase::Before => "before",
            HookPhase::After => "after",
        })
    }
}

/// Optional callbacks a plugin registers alongside its declarations.
///
/// Both default to doing nothing.
pub trait PluginHooks {
    /// Called around the save pass. `Before` is the place to flush state
    /// into persisted singletons.
    fn on_save(&mut self, phase: HookPhase) -> anyhow::Result<()> {
        let _ = phase;
        Ok(())
    }

    /// Called around the load pass. `After` sees freshly loaded singletons.
    fn on_load(&mut self, phase: HookPhase) -> anyhow::Result<()> {
        let _ = phase;
        Ok(())
    }
}

/// One plugin hook that failed during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookFailure {
    pub plugin: String,
    pub pass: HookPass,
    pub phase: HookPhase,
    pub message: String,
}

impl fmt::Display for HookFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} {}): {}",
            self.plugin, self.pass, self.phase, self.message
        )
    }
}

/// Consolidated outcome of one save or load pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub pass: HookPass,
    pub failures: Vec<HookFailure>,
    /// Singleton records that failed to save or load during the pass.
    pub record_failures: usize,
}

impl PassReport {
    pub fn new(pass: HookPass) -> Self {
        Self {
            pass,
            failures: Vec::new(),
            record_failures: 0,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.record_failures == 0
    }

    /// Names of the plugins with at least one failed hook, first failure first.
    pub fn failing_plugins(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for failure in &self.failures {
            if !names.contains(&failure.plugin.as_str()) {
                names.push(&failure.plugin);
            }
        }
        names
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return write!(f, "{} pass completed cleanly", self.pass);
        }
        write!(f, "{} pass completed with errors", self.pass)?;
        for failure in &self.failures {
            write!(f, "\n  - {failure}")?;
        }
        if self.record_failures > 0 {
            write!(f, "\n  - {} record(s) failed", self.record_failures)?;
        }
        Ok(())
    }
}

/// Runs plugin code, converting an error or a panic into a message.
pub fn isolate<F>(call: F) -> Result<(), String>
where
    F: FnOnce() -> anyhow::Result<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("{e:#}")),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
