// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `tensordag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tensordag",
    version,
    about = "Record tensor-assignment DAGs and execute them in cost-balanced waves.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the problem description (TOML).
    ///
    /// Default: `Tensordag.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Tensordag.toml")]
    pub config: String,

    /// Override the number of simulated ranks from `[run]`.
    #[arg(long, value_name = "N")]
    pub ranks: Option<usize>,

    /// Override the cap on concurrent tasks per wave (0 = unbounded).
    #[arg(long, value_name = "N")]
    pub partitions: Option<usize>,

    /// Execute the recorded DAG one operation at a time on the parent world,
    /// with no splitting or migration.
    #[arg(long)]
    pub serial: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TENSORDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the dependency DAG, but execute nothing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI and the `TENSORDAG_LOG` env var.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("invalid log level: {other}")),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(lvl: LogLevel) -> Self {
        match lvl {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
