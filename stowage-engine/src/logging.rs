//! Subscriber setup for hosts that do not install their own.

use tracing_subscriber::EnvFilter;

/// Targets are matched by prefix, so this covers every `stowage_*` crate.
const TARGET: &str = "stowage";

/// Installs a compact fmt subscriber.
///
/// `RUST_LOG` overrides the filter. Otherwise `verbose` switches the
/// `stowage` crates from info to debug. Returns false when a global subscriber is
/// already set.
pub fn init(verbose: bool) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
        .is_ok()
}

fn default_filter(verbose: bool) -> EnvFilter {
    let level = if verbose { "debug" } else { "info" };
    EnvFilter::new(format!("{TARGET}={level}"))
}
