//! Instrument descriptor for an order.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::order_execution::errors::OrderError;

/// Option right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionRight {
    /// Put option.
    Put,
    /// Call option.
    Call,
}

impl OptionRight {
    /// Storage and wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Put => "PUT",
            Self::Call => "CALL",
        }
    }

    /// Single-letter venue code.
    #[must_use]
    pub const fn code(&self) -> char {
        match self {
            Self::Put => 'P',
            Self::Call => 'C',
        }
    }
}

impl fmt::Display for OptionRight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The right must be exactly `PUT` or `CALL`.
impl FromStr for OptionRight {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PUT" => Ok(Self::Put),
            "CALL" => Ok(Self::Call),
            other => Err(OrderError::invalid_specification(format!(
                "option right must be PUT or CALL, got '{other}'"
            ))),
        }
    }
}

/// Instrument kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstrumentKind {
    /// Common stock or ETF.
    Equity,
    /// Listed equity option.
    Option,
}

impl InstrumentKind {
    /// Storage and wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Equity => "EQUITY",
            Self::Option => "OPTION",
        }
    }
}

impl FromStr for InstrumentKind {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EQUITY" | "STK" => Ok(Self::Equity),
            "OPTION" | "OPT" => Ok(Self::Option),
            other => Err(OrderError::invalid_specification(format!(
                "unsupported instrument kind '{other}'"
            ))),
        }
    }
}

/// What an order trades.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instrument {
    /// The underlying itself.
    Equity,
    /// A single option contract series.
    Option {
        /// Put or call.
        right: OptionRight,
        /// Strike price (positive).
        strike: Decimal,
        /// Expiration date.
        expiration: NaiveDate,
    },
}

impl Instrument {
    /// Build an option descriptor, rejecting non-positive strikes.
    pub fn option(
        right: OptionRight,
        strike: Decimal,
        expiration: NaiveDate,
    ) -> Result<Self, OrderError> {
        if strike <= Decimal::ZERO {
            return Err(OrderError::validation("strike", "strike must be positive"));
        }
        Ok(Self::Option {
            right,
            strike,
            expiration,
        })
    }

    /// Instrument kind.
    #[must_use]
    pub const fn kind(&self) -> InstrumentKind {
        match self {
            Self::Equity => InstrumentKind::Equity,
            Self::Option { .. } => InstrumentKind::Option,
        }
    }

    /// Option right, if an option.
    #[must_use]
    pub const fn option_right(&self) -> Option<OptionRight> {
        match self {
            Self::Equity => None,
            Self::Option { right, .. } => Some(*right),
        }
    }

    /// Strike, if an option.
    #[must_use]
    pub const fn strike(&self) -> Option<Decimal> {
        match self {
            Self::Equity => None,
            Self::Option { strike, .. } => Some(*strike),
        }
    }

    /// Expiration, if an option.
    #[must_use]
    pub const fn expiration(&self) -> Option<NaiveDate> {
        match self {
            Self::Equity => None,
            Self::Option { expiration, .. } => Some(*expiration),
        }
    }
}
