// src/logging.rs
// =============================================================================
// Sets up the tracing subscriber.
//
// Logs always go to stderr. stdout is reserved for the report itself, so
// `site-auditor audit URL --json | jq` keeps working with logging turned on.
//
// RUST_LOG, when set, wins over the configured level.
// =============================================================================

use crate::config::{LogFormat, LoggingSettings};
use anyhow::{Context, Result};
use std::io;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub fn init(settings: &LoggingSettings) -> Result<()> {
    let level: Level = settings
        .level
        .parse()
        .with_context(|| format!("Invalid log level: {}", settings.level))?;

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let layer = match settings.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(io::stderr)
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_filter(filter)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(io::stderr)
            .with_target(false)
            .with_filter(filter)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .context("Failed to initialize logging")
}
