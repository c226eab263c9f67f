//! Logging utilities for sqlmr
//!
//! Map and reduce tasks run on the runner's `sqlmr-worker-N` threads, so the
//! subscriber prints thread names rather than source locations, and the
//! `#[instrument]` spans around each pass log their duration when they close.

#[cfg(feature = "logging")]
use tracing_subscriber::{EnvFilter, fmt, fmt::format::FmtSpan};

/// Directive used when `RUST_LOG` is unset: this crate at `level`, everything
/// else (arrow, rayon) at `warn`.
pub fn default_directive(level: &str) -> String {
    format!("warn,sqlmr_core={level}")
}

/// Initialize logging with default settings
///
/// # Environment Variables
/// - `RUST_LOG` - Log level filter (default: `warn,sqlmr_core=info`)
///
/// # Example
/// ```rust
/// sqlmr_core::logging::init();
/// ```
#[cfg(feature = "logging")]
pub fn init() {
    init_with_level("info")
}

/// Initialize logging with a specific level for this crate
///
/// `RUST_LOG` wins over `level` when it is set.
#[cfg(feature = "logging")]
pub fn init_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

/// Initialize logging for tests (debug level, captured by the test harness)
#[cfg(feature = "logging")]
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new(default_directive("debug")))
        .with_thread_names(true)
        .with_test_writer()
        .try_init();
}

// Stub implementations when logging feature is disabled
#[cfg(not(feature = "logging"))]
pub fn init() {}

#[cfg(not(feature = "logging"))]
pub fn init_with_level(_level: &str) {}

#[cfg(not(feature = "logging"))]
pub fn init_test() {}
