//! Order type (market or limit).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::order_execution::errors::OrderError;

/// Order type sent to the venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Execute at the best available price; takes no price.
    Market,
    /// Execute at the limit price or better; requires a positive price.
    Limit,
}

impl OrderType {
    /// Venue short code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Market => "MKT",
            Self::Limit => "LMT",
        }
    }

    /// Returns true if this order type requires a limit price.
    #[must_use]
    pub const fn requires_price(&self) -> bool {
        matches!(self, Self::Limit)
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for OrderType {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MKT" | "MARKET" => Ok(Self::Market),
            "LMT" | "LIMIT" => Ok(Self::Limit),
            other => Err(OrderError::invalid_specification(format!(
                "unsupported order type '{other}'"
            ))),
        }
    }
}
