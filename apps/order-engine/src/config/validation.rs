//! Environment validation at startup.

use std::net::SocketAddr;

use super::Config;

/// Errors from environment validation at startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupValidationError {
    /// The requested trading mode cannot run in this build.
    #[error("Unsupported trading mode {mode}: {details}")]
    UnsupportedMode {
        /// The trading mode.
        mode: String,
        /// Why it cannot run.
        details: String,
    },

    /// Invalid environment configuration.
    #[error("Invalid environment configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result of startup environment validation.
#[derive(Debug)]
pub struct StartupValidation {
    /// Whether validation passed.
    pub valid: bool,
    /// Warning messages (non-fatal).
    pub warnings: Vec<String>,
}

impl StartupValidation {
    /// Create a successful validation result.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            valid: true,
            warnings: Vec::new(),
        }
    }

    /// Create a successful validation with warnings.
    #[must_use]
    pub const fn ok_with_warnings(warnings: Vec<String>) -> Self {
        Self {
            valid: true,
            warnings,
        }
    }
}

/// Validate the environment a loaded configuration will run in.
///
/// - LIVE mode is refused: only the paper venue adapter is built in
/// - the metrics exporter must not collide with the HTTP listener
/// - an in-memory store or a read-only session produce warnings
///
/// # Errors
///
/// Returns `StartupValidationError` if the process must not start.
pub fn validate_startup_environment(
    config: &Config,
) -> Result<StartupValidation, StartupValidationError> {
    if config.environment.is_live() {
        return Err(StartupValidationError::UnsupportedMode {
            mode: config.environment.mode.clone(),
            details: "no live venue adapter is available; run with environment.mode=PAPER"
                .to_string(),
        });
    }

    let metrics = &config.observability.metrics;
    if metrics.enabled {
        let addr: SocketAddr = metrics.listen_addr.parse().map_err(|e| {
            StartupValidationError::InvalidConfiguration(format!(
                "observability.metrics.listen_addr '{}': {e}",
                metrics.listen_addr
            ))
        })?;
        if addr.port() == config.server.http_port {
            return Err(StartupValidationError::InvalidConfiguration(
                "metrics listener and http_port must be different".to_string(),
            ));
        }
    }

    let mut warnings = Vec::new();
    if config.persistence.is_in_memory() {
        warnings.push("Order store is in memory; orders are lost on restart".to_string());
    }
    if config.session.readonly {
        warnings.push("Broker session is read-only; execute and cancel will fail".to_string());
    }
    if warnings.is_empty() {
        Ok(StartupValidation::ok())
    } else {
        Ok(StartupValidation::ok_with_warnings(warnings))
    }
}
