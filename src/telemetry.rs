//! # Telemetry
//!
//! Installs the global `tracing` subscriber.

use crate::config::LogSettings;
use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_FILTER: &str = "info,sqlx=warn";

/// Builds the filter: `RUST_LOG` if set, else the configured directives,
/// else `info`.
///
/// # Errors
///
/// Returns an error if the configured directives do not parse.
pub fn env_filter(settings: &LogSettings) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directives = settings.filter.as_deref().unwrap_or(DEFAULT_FILTER);
    EnvFilter::try_new(directives).with_context(|| format!("invalid log filter `{directives}`"))
}

/// Installs the subscriber, as JSON lines or plain text on stderr.
///
/// # Errors
///
/// Returns an error if the filter does not parse or a global subscriber is
/// already installed.
pub fn init(settings: &LogSettings) -> Result<()> {
    let filter = env_filter(settings)?;

    let json = settings.json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr)
    });
    let plain = (!settings.json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(plain)
        .try_init()
        .context("Failed to init tracing")?;

    tracing::debug!(json = settings.json, "initialized logger");
    Ok(())
}
