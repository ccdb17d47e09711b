// src/logging.rs

//! `tracing` subscriber setup.
//!
//! The filter comes from `--log-level` when given, otherwise from the
//! `ASSETFLOW_LOG` environment variable, which accepts full `EnvFilter`
//! directives (`debug`, `assetflow::pipeline=trace,info`). Without either,
//! the level is `info`.
//!
//! Logs go to stderr so `--dry-run` and `--list` output on stdout stays
//! clean. HTTP plumbing below the reload server is capped at `warn`.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

const ENV_VAR: &str = "ASSETFLOW_LOG";
const QUIET_DEPS: &[&str] = &["hyper=warn", "hyper_util=warn", "tower=warn", "axum=warn"];

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let mut filter = build_filter(cli_level)?;
    for directive in QUIET_DEPS {
        filter = filter.add_directive(directive.parse()?);
    }

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("installing tracing subscriber: {err}"))
}

fn build_filter(cli_level: Option<LogLevel>) -> Result<EnvFilter> {
    if let Some(level) = cli_level {
        return Ok(EnvFilter::new(level_directive(level)));
    }

    match std::env::var(ENV_VAR) {
        Ok(value) if !value.trim().is_empty() => EnvFilter::try_new(value.trim())
            .with_context(|| format!("invalid {ENV_VAR} value `{value}`")),
        _ => Ok(EnvFilter::new("info")),
    }
}

fn level_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
