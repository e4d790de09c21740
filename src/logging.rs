// src/logging.rs

//! Logging setup for `assetpipe` using `tracing` + `tracing-subscriber`.
//!
//! The filter comes from, in order:
//! 1. `--log-level` on the command line, applied to every target,
//! 2. `ASSETPIPE_LOG`, which accepts full filter directives
//!    (`info,assetpipe::watch=debug`),
//! 3. `info`.
//!
//! Logs go to stderr; stdout is left to `--dry-run` plans and tool output.

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "ASSETPIPE_LOG";

/// Install the global subscriber. Call once, from `main`.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(lvl) => level_filter(level_from_log_level(lvl)),
        None => filter_from_env(std::env::var(LOG_ENV).ok().as_deref())?,
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))
}

/// Build a filter from the raw `ASSETPIPE_LOG` value. A bare level name
/// (`warning`, ` DEBUG `) is accepted as well as directive syntax.
pub fn filter_from_env(value: Option<&str>) -> Result<EnvFilter> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(level_filter(Level::INFO));
    };
    if let Some(level) = parse_level_str(raw) {
        return Ok(level_filter(level));
    }
    EnvFilter::try_new(raw).with_context(|| format!("invalid {LOG_ENV} value {raw:?}"))
}

fn level_filter(level: Level) -> EnvFilter {
    EnvFilter::default().add_directive(LevelFilter::from_level(level).into())
}

pub fn level_from_log_level(lvl: LogLevel) -> Level {
    match lvl {
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    }
}

pub fn parse_level_str(s: &str) -> Option<Level> {
    let level = match s.trim().to_ascii_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" | "warning" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => return None,
    };
    Some(level)
}
