//! Diagnostic logging to stderr
//!
//! Reports go to stdout, so every log line goes to stderr. `RUST_LOG`
//! overrides the level chosen with `--log-level`.

use crate::cli::LogLevel;
use std::io;
use tracing_subscriber::EnvFilter;

pub fn init(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    // A second init (tests, embedding) keeps the existing subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}
