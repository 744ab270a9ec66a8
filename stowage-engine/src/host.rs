//! What the orchestrator needs from the host game beyond its entities.

use crate::session::SaveSession;
use std::panic::{self, AssertUnwindSafe};
use tracing::warn;

/// The host's save slot and game mode.
pub trait SaveHost {
    /// Name of the save currently loaded or being written, if any.
    fn current_save_name(&self) -> Option<String>;

    /// Name of the running game mode. Backups are filed under it.
    fn current_mode(&self) -> String;

    /// True for modes whose saves carry plugin state (campaign, co-op).
    fn is_persistent_mode(&self) -> bool;

    /// True for slots the host writes on its own, such as auto-saves.
    fn is_managed_slot(&self, save_name: &str) -> bool;
}

/// User-facing report of an error the player should know about.
pub trait ErrorSurface {
    fn report_fatal(&mut self, title: &str, message: &str);
}

/// The session the host is currently in.
///
/// A panicking host callback is treated as "no session".
pub(crate) fn current_session(host: &dyn SaveHost) -> Option<SaveSession> {
    let resolved = panic::catch_unwind(AssertUnwindSafe(|| {
        host.current_save_name()
            .map(|save_name| SaveSession::new(save_name, host.current_mode()))
    }));
    match resolved {
        Ok(session) => session,
        Err(_) => {
            warn!("Host panicked while reporting the current save");
            None
        }
    }
}
