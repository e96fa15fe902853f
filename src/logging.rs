// src/logging.rs

//! Global `tracing` subscriber installation.
//!
//! Level resolution: the `--log-level` flag wins, then the `TENSORDAG_LOG`
//! environment variable, then `info`. Parsing of level names lives on
//! [`LogLevel`] itself (`FromStr`), shared between the env var and clap.

use tracing::Level;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;
use crate::errors::Result;

/// Install the global subscriber. Call once at startup; a second call
/// panics inside `tracing-subscriber`.
pub fn init(cli_level: Option<LogLevel>) -> Result<()> {
    let level = cli_level
        .or_else(|| std::env::var("TENSORDAG_LOG").ok().and_then(|s| s.parse().ok()))
        .map(Level::from)
        .unwrap_or(Level::INFO);

    fmt().with_max_level(level).with_target(true).init();
    Ok(())
}
