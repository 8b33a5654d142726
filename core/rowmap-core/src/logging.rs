//! Logging setup for rowmap.
//!
//! The library only emits `tracing` events (mapper construction at `info`,
//! skipped mappings and evolution gaps at `debug`, per-row work at `trace`).
//! Applications that do not install their own subscriber can call one of the
//! helpers below when the `logging` feature is enabled.

#[cfg(feature = "logging")]
use tracing_subscriber::{EnvFilter, fmt};

/// Default filter directive used when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVE: &str = "rowmap_core=info";

/// Initialize logging with the default directive.
///
/// # Environment Variables
/// - `RUST_LOG` - overrides [`DEFAULT_DIRECTIVE`]
#[cfg(feature = "logging")]
pub fn init() {
    init_with_level(DEFAULT_DIRECTIVE)
}

/// Initialize logging with an explicit filter directive
/// (`"debug"`, `"rowmap_core=trace"`, ...).
#[cfg(feature = "logging")]
pub fn init_with_level(directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .try_init();
}

/// Verbose subscriber for tests; repeated calls are harmless.
#[cfg(feature = "logging")]
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("rowmap_core=trace"))
        .with_test_writer()
        .try_init();
}

#[cfg(not(feature = "logging"))]
pub fn init() {}

#[cfg(not(feature = "logging"))]
pub fn init_with_level(_directive: &str) {}

#[cfg(not(feature = "logging"))]
pub fn init_test() {}
