//! Diagnostic logging to stderr
//!
//! Stdout is reserved for command output, so every log line goes to stderr.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Level implied by the `--verbose` / `--debug` flags
pub fn level(verbose: bool, debug: bool) -> LevelFilter {
    if debug {
        LevelFilter::DEBUG
    } else if verbose {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    }
}

/// Installs the global subscriber; `RUST_LOG` overrides the flag-derived level
///
/// Returns quietly if a subscriber is already installed.
pub fn init(verbose: bool, debug: bool) {
    let filter = EnvFilter::builder()
        .with_default_directive(level(verbose, debug).into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(debug)
        .compact()
        .try_init();
}
