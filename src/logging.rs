// src/logging.rs

//! Logging setup for `syncwatch` using `tracing` + `tracing-subscriber`.
//!
//! The filter is chosen in this order:
//! 1. `--log-level` CLI flag, applied to every target
//! 2. `SYNCWATCH_LOG`, any `EnvFilter` directive string
//!    (e.g. `info` or `syncwatch=debug,notify=warn`)
//! 3. `info`
//!
//! Logs go to STDERR.

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "SYNCWATCH_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = build_filter(cli_level, std::env::var(LOG_ENV_VAR).ok().as_deref())?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))
}

fn build_filter(cli_level: Option<LogLevel>, env_value: Option<&str>) -> Result<EnvFilter> {
    let directive = match (cli_level, env_value.map(str::trim)) {
        (Some(level), _) => directive_for(level),
        (None, Some(value)) if !value.is_empty() => value,
        _ => DEFAULT_DIRECTIVE,
    };
    EnvFilter::try_new(directive).with_context(|| format!("invalid log filter '{directive}'"))
}

fn directive_for(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
