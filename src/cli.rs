// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `syncwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "syncwatch",
    version,
    about = "Watch files and run scripts when they change; apply workflow descriptors.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the settings file (TOML).
    ///
    /// Relative paths are resolved against the project directory.
    #[arg(long, value_name = "PATH", default_value = "Syncwatch.toml")]
    pub config: PathBuf,

    /// Project directory. Defaults to the current working directory.
    #[arg(long, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    /// Workflow descriptor (TOML) to apply at startup.
    #[arg(long, value_name = "PATH")]
    pub workflow: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SYNCWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load settings, print the resolved watch rules and exit.
    #[arg(long)]
    pub dry_run: bool,

    /// Upper bound on concurrently running scripts (overrides the settings file).
    #[arg(long, value_name = "N")]
    pub max_concurrent_scripts: Option<usize>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
