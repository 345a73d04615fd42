//! Tracing subscriber setup for binaries and tests.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the application. [`init`] installs a human-readable `fmt` subscriber
//! whose level follows the `-v` count, unless `RUST_LOG` is set.

use tracing_subscriber::EnvFilter;

/// Default filter directive for a verbosity level.
///
/// | verbosity | filter                       |
/// |-----------|------------------------------|
/// | 0         | `warn`                       |
/// | 1         | `info`                       |
/// | 2         | `blockpress=debug,info`      |
/// | 3+        | `blockpress=trace,debug`     |
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "blockpress=debug,info",
        _ => "blockpress=trace,debug",
    }
}

/// Install the global subscriber.
///
/// Returns `false` if a subscriber was already installed, which is harmless
/// when several tests race to initialise logging.
pub fn init(verbosity: u8) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .with_thread_names(verbosity >= 3)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
