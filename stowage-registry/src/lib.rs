//! Plugin registry for Stowage.
//!
//! Plugins register once with their declarations and optional hooks. A
//! plugin whose declaration fails is retried on later ticks, and a hook
//! that errors or panics is reported without disturbing the others.

mod error;
mod hooks;
mod registry;

pub use error::{RegistryError, RegistryResult};
pub use hooks::{isolate, HookFailure, HookPass, HookPhase, PassReport, PluginHooks};
pub use registry::{PluginRegistry, Registration};
