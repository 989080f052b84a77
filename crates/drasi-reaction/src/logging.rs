//! Process-wide logging initialization

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber for this process.
///
/// Honors `RUST_LOG` when set and defaults to `info` otherwise. Safe to call
/// more than once; only the first call installs a subscriber, so embedders
/// and tests that configure their own logging keep it. `Reaction::start`
/// calls this before serving, so most binaries never need to call it
/// directly.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
}
