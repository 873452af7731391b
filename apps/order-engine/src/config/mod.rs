//! Configuration module for the order engine.
//!
//! Provides configuration loading, validation, and environment variable
//! interpolation for all order engine components.
//!
//! # Usage
//!
//! ```rust,ignore
//! use order_engine::config::{Config, load_config};
//!
//! // Defaults when no file is given or the file does not exist
//! let config = load_config(None)?;
//!
//! // Load from custom path
//! let config = load_config(Some("config/engine.yaml"))?;
//!
//! println!("HTTP port: {}", config.server.http_port);
//! ```

mod environment;
mod execution;
mod observability;
mod persistence;
mod server;
mod session;
mod validation;

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use environment::EnvironmentConfig;
pub use execution::ExecutionConfig;
pub use observability::{LoggingConfig, MetricsSettings, ObservabilityConfig};
pub use persistence::PersistenceConfig;
pub use server::ServerConfig;
pub use session::{PaperVenueConfig, ReconnectConfig, SessionConfig};
pub use validation::{StartupValidation, StartupValidationError, validate_startup_environment};

/// Environment variable naming the config file when no CLI argument is given.
pub const CONFIG_PATH_ENV: &str = "ORDER_ENGINE_CONFIG";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Order store configuration.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Broker session configuration.
    #[serde(default)]
    pub session: SessionConfig,
    /// Order lifecycle configuration.
    #[serde(default)]
    pub execution: ExecutionConfig,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
    /// Environment configuration.
    #[serde(default)]
    pub environment: EnvironmentConfig,
}

// ============================================
// Configuration Loading
// ============================================

/// Resolve the config path from the first CLI argument or the environment.
#[must_use]
pub fn config_path_from_args(mut args: impl Iterator<Item = String>) -> Option<String> {
    args.nth(1)
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
        .filter(|p| !p.trim().is_empty())
}

/// Load configuration from a YAML file with environment variable interpolation.
///
/// With no path, or a path that does not exist, the defaults are used.
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let Some(path) = path else {
        return validated(Config::default());
    };
    if !Path::new(path).exists() {
        return validated(Config::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;
    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = if interpolated.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml_bw::from_str(&interpolated)?
    };
    validated(config)
}

fn validated(config: Config) -> Result<Config, ConfigError> {
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let var_name = &cap[1];
        let default_value = cap.get(2).map(|m| m.as_str());
        match std::env::var(var_name) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        }
    })
    .into_owned()
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.http_port == 0 {
        return Err(invalid("server.http_port must be non-zero"));
    }

    if config.persistence.db_path.trim().is_empty() {
        return Err(invalid("persistence.db_path must not be empty"));
    }
    if config.persistence.max_connections == 0 {
        return Err(invalid("persistence.max_connections must be at least 1"));
    }

    let session = &config.session;
    if session.host.trim().is_empty() {
        return Err(invalid("session.host must not be empty"));
    }
    if session.connect_timeout_ms == 0
        || session.request_timeout_ms == 0
        || session.quote_timeout_ms == 0
    {
        return Err(invalid("session timeouts must be positive"));
    }
    if session.keepalive_interval_secs == 0 {
        return Err(invalid("session.keepalive_interval_secs must be positive"));
    }
    let reconnect = &session.reconnect;
    if reconnect.multiplier < 1.0 {
        return Err(invalid("session.reconnect.multiplier must be at least 1.0"));
    }
    if reconnect.initial_backoff_ms == 0 || reconnect.initial_backoff_ms > reconnect.max_backoff_ms {
        return Err(invalid(
            "session.reconnect.initial_backoff_ms must be positive and not exceed max_backoff_ms",
        ));
    }

    let execution = &config.execution;
    if execution.report_queue_capacity == 0 {
        return Err(invalid("execution.report_queue_capacity must be positive"));
    }
    if execution.cancel_poll_interval_ms == 0
        || execution.cancel_poll_interval_ms > execution.cancel_confirm_timeout_ms
    {
        return Err(invalid(
            "execution.cancel_poll_interval_ms must be positive and not exceed cancel_confirm_timeout_ms",
        ));
    }

    let valid_formats = ["json", "pretty"];
    if !valid_formats.contains(&config.observability.logging.format.as_str()) {
        return Err(invalid(format!(
            "observability.logging.format must be one of: {valid_formats:?}"
        )));
    }

    let valid_modes = ["PAPER", "LIVE"];
    if !valid_modes.contains(&config.environment.mode.as_str()) {
        return Err(invalid(format!(
            "environment.mode must be one of: {valid_modes:?}"
        )));
    }

    Ok(())
}
