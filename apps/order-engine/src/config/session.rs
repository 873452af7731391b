//! Broker session configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::ports::MarketDataMode;

/// Broker session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Venue gateway host.
    #[serde(default = "default_host")]
    pub host: String,
    /// Venue gateway port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Client id presented to the gateway.
    #[serde(default = "default_client_id")]
    pub client_id: i32,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Timeout for contract, order and status requests in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// How long to wait for a live quote in milliseconds.
    #[serde(default = "default_quote_timeout_ms")]
    pub quote_timeout_ms: u64,
    /// Refuse order submission and cancellation.
    #[serde(default)]
    pub readonly: bool,
    /// Allow live quotes in pre-market and after-hours sessions.
    #[serde(default)]
    pub include_extended_hours: bool,
    /// Seconds between keepalive checks.
    #[serde(default = "default_keepalive_interval_secs")]
    pub keepalive_interval_secs: u64,
    /// Market data type requested after connecting.
    #[serde(default)]
    pub market_data_mode: MarketDataMode,
    /// Reconnect backoff.
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    /// Paper venue behaviour.
    #[serde(default)]
    pub paper: PaperVenueConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            client_id: default_client_id(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            quote_timeout_ms: default_quote_timeout_ms(),
            readonly: false,
            include_extended_hours: false,
            keepalive_interval_secs: default_keepalive_interval_secs(),
            market_data_mode: MarketDataMode::default(),
            reconnect: ReconnectConfig::default(),
            paper: PaperVenueConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Live quote timeout.
    #[must_use]
    pub const fn quote_timeout(&self) -> Duration {
        Duration::from_millis(self.quote_timeout_ms)
    }

    /// Keepalive interval.
    #[must_use]
    pub const fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs)
    }
}

/// Exponential backoff for reconnects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// First backoff in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Backoff cap in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Growth factor per attempt.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Attempts per outage before waiting for the next keepalive tick.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            multiplier: default_multiplier(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Paper venue behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperVenueConfig {
    /// Delay before a working order fills, in milliseconds.
    #[serde(default = "default_fill_delay_ms")]
    pub fill_delay_ms: u64,
    /// Whether working orders fill automatically.
    #[serde(default = "default_auto_fill")]
    pub auto_fill: bool,
    /// Quoted prices by ticker.
    #[serde(default)]
    pub prices: BTreeMap<String, Decimal>,
}

impl Default for PaperVenueConfig {
    fn default() -> Self {
        Self {
            fill_delay_ms: default_fill_delay_ms(),
            auto_fill: default_auto_fill(),
            prices: BTreeMap::new(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    7497
}

const fn default_client_id() -> i32 {
    1
}

const fn default_connect_timeout_ms() -> u64 {
    5_000
}

const fn default_request_timeout_ms() -> u64 {
    10_000
}

const fn default_quote_timeout_ms() -> u64 {
    3_000
}

const fn default_keepalive_interval_secs() -> u64 {
    30
}

const fn default_initial_backoff_ms() -> u64 {
    500
}

const fn default_max_backoff_ms() -> u64 {
    60_000
}

const fn default_multiplier() -> f64 {
    2.0
}

const fn default_max_attempts() -> u32 {
    10
}

const fn default_fill_delay_ms() -> u64 {
    250
}

const fn default_auto_fill() -> bool {
    true
}
