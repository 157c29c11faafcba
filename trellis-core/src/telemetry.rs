//! Log output.
//!
//! The runtime only emits `tracing` events. Hosts that do not install a
//! subscriber of their own can call [`init_tracing`].

use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "TRELLIS_LOG";

/// Install a fmt subscriber filtered by `TRELLIS_LOG` (default `info`).
///
/// Returns `false` if a global subscriber was already set, in which case
/// nothing changes.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .try_init()
        .is_ok()
}
