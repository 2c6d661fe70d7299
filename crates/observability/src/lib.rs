//! `gomarket-observability` — shared tracing setup.
//!
//! Library crates only emit events; embedders (and integration tests) call
//! [`init`] once to install a subscriber.

use tracing_subscriber::EnvFilter;

/// Initialize process-wide tracing with the default `info` filter.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    init_with_default_filter("info");
}

/// Initialize process-wide tracing, falling back to `default_filter` when
/// `RUST_LOG` is unset.
pub fn init_with_default_filter(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // JSON logs + timestamps, configurable via RUST_LOG.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
