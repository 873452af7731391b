//! Market data and calendar DTOs

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::OptionRight;
use crate::domain::recommendation::Recommendation;

/// Prices keyed by ticker; `null` where unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPriceResponseDto {
    /// Always "success".
    pub status: String,
    /// Ticker to price.
    pub data: BTreeMap<String, Option<Decimal>>,
}

impl StockPriceResponseDto {
    /// Wrap fetched prices.
    #[must_use]
    pub fn success(data: BTreeMap<String, Option<Decimal>>) -> Self {
        Self {
            status: "success".to_string(),
            data,
        }
    }
}

/// Upcoming expirations as `YYYYMMDD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirationsResponseDto {
    /// Next weekly Fridays.
    pub weekly: Vec<String>,
    /// Next standard monthly expiration.
    pub monthly: String,
}

/// Strike ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrikesResponseDto {
    /// Sorted strikes.
    pub strikes: Vec<Decimal>,
}

/// Out-of-the-money candidates for one underlying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtmCandidatesDto {
    /// Underlying price the scan was taken at.
    pub stock_price: Decimal,
    /// PUT or CALL.
    pub option_type: OptionRight,
    /// Requested distance from the price, in percent.
    pub otm_percentage: Decimal,
    /// Price `otm_percentage` away from `stock_price`.
    pub target_strike: Decimal,
    /// Nearest weekly expiration (`YYYYMMDD`).
    pub expiration: String,
    /// Next standard monthly expiration (`YYYYMMDD`).
    pub monthly_expiration: String,
    /// Listed strikes around the target, all out of the money.
    pub strikes: Vec<Decimal>,
}

/// OTM scan keyed by ticker; `null` where no price was available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtmOptionsResponseDto {
    /// Always "success".
    pub status: String,
    /// Ticker to candidates.
    pub data: BTreeMap<String, Option<OtmCandidatesDto>>,
}

/// Stored recommendations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationsResponseDto {
    /// Newest first.
    pub recommendations: Vec<Recommendation>,
}
