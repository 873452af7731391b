//! Structured logging setup.
//!
//! `RUST_LOG` takes precedence over the configured level. The output format
//! is `json` (one object per line) or `pretty` (human-readable).

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::config::LoggingConfig;

/// Error type for logging setup.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// The configured level is not a valid filter directive.
    #[error("invalid log filter '{filter}': {message}")]
    InvalidFilter {
        /// Filter that failed to parse.
        filter: String,
        /// Parser message.
        message: String,
    },
    /// A global subscriber is already installed.
    #[error("failed to initialize tracing subscriber: {0}")]
    SubscriberError(String),
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directive = format!("{},tower_http=info,sqlx=warn", config.level);
    EnvFilter::try_new(&directive).map_err(|e| LoggingError::InvalidFilter {
        filter: directive,
        message: e.to_string(),
    })
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error for an invalid level or if a subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = build_filter(config)?;
    let span_events = if config.include_spans {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let result = if config.format.eq_ignore_ascii_case("pretty") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_span_events(span_events)
            .with_target(true)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_span_events(span_events)
            .with_current_span(config.include_spans)
            .try_init()
    };

    result.map_err(|e| LoggingError::SubscriberError(e.to_string()))?;

    tracing::info!(
        level = %config.level,
        format = %config.format,
        "Logging initialized"
    );
    Ok(())
}
