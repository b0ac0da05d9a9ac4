use super::config::{LogFormat, LogLevel};
use crate::domain::ForwarderError;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Chatty dependencies that are capped at `warn` unless `RUST_LOG` says otherwise.
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "h2", "rustls", "rdkafka"];

/// Filter string for `level` with the noisy crates turned down.
pub fn filter_directives(level: LogLevel) -> String {
    let mut parts = Vec::with_capacity(QUIET_TARGETS.len() + 1);
    parts.push(level.as_str().to_string());
    for target in QUIET_TARGETS {
        parts.push(format!("{target}=warn"));
    }
    parts.join(",")
}

fn build_filter(level: LogLevel) -> Result<EnvFilter, ForwarderError> {
    let directives = match std::env::var("RUST_LOG") {
        Ok(custom) if !custom.trim().is_empty() => custom,
        _ => filter_directives(level),
    };

    EnvFilter::try_new(&directives).map_err(|e| {
        ForwarderError::Logging(format!("Failed to create EnvFilter with '{directives}': {e}"))
    })
}

/// Installs the global tracing subscriber. Fails if one is already set.
pub fn init_logging(level: LogLevel, format: LogFormat) -> Result<(), ForwarderError> {
    let filter = build_filter(level)?;

    let result = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true),
            )
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_target(true))
            .try_init(),
    };

    result.map_err(|e| ForwarderError::Logging(e.to_string()))
}
