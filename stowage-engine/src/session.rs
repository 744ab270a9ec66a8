//! The save a game session reads from and writes to.

use std::fmt;
use stowage_registry::isolate;
use tracing::{debug, info, warn};

/// A save slot within a game mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SaveSession {
    pub save_name: String,
    pub mode: String,
}

impl SaveSession {
    pub fn new(save_name: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            save_name: save_name.into(),
            mode: mode.into(),
        }
    }
}

impl fmt::Display for SaveSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.mode, self.save_name)
    }
}

/// Notified when a session opens or closes. Both default to doing nothing.
pub trait SessionObserver {
    fn opened(&mut self, session: &SaveSession) -> anyhow::Result<()> {
        let _ = session;
        Ok(())
    }

    fn closed(&mut self, session: &SaveSession) -> anyhow::Result<()> {
        let _ = session;
        Ok(())
    }
}

struct Subscriber {
    name: String,
    observer: Box<dyn SessionObserver>,
}

/// The open session, if any, and its observers in subscription order.
#[derive(Default)]
pub struct Session {
    current: Option<SaveSession>,
    subscribers: Vec<Subscriber>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&SaveSession> {
        self.current.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// Adds an observer; it is notified after every earlier one.
    pub fn subscribe(&mut self, name: impl Into<String>, observer: Box<dyn SessionObserver>) {
        self.subscribers.push(Subscriber {
            name: name.into(),
            observer,
        });
    }

    /// Removes the observer subscribed as `name`.
    pub fn unsubscribe(&mut self, name: &str) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.name != name);
        self.subscribers.len() != before
    }

    /// Opens `session`, closing a different open one first.
    ///
    /// Returns false when `session` was already open; observers are not
    /// notified again.
    pub fn open(&mut self, session: SaveSession) -> bool {
        if self.current.as_ref() == Some(&session) {
            debug!(session = %session, "Session already open");
            return false;
        }
        self.close();
        info!(session = %session, "Session opened");
        for subscriber in &mut self.subscribers {
            let observer = &mut subscriber.observer;
            if let Err(message) = isolate(|| observer.opened(&session)) {
                warn!(observer = %subscriber.name, error = %message, "Session observer failed on open");
            }
        }
        self.current = Some(session);
        true
    }

    /// Closes the open session and returns it.
    pub fn close(&mut self) -> Option<SaveSession> {
        let session = self.current.take()?;
        for subscriber in &mut self.subscribers {
            let observer = &mut subscriber.observer;
            if let Err(message) = isolate(|| observer.closed(&session)) {
                warn!(observer = %subscriber.name, error = %message, "Session observer failed on close");
            }
        }
        info!(session = %session, "Session closed");
        Some(session)
    }
}
