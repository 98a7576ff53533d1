//! Tracing setup for binaries.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by `RUST_LOG`, with `default_level` as
/// the fallback directive. Later calls are no-ops.
pub fn init_tracing(default_level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_level.into()))
        .with_target(false)
        .try_init();
}
