//! Recommendation Bounded Context
//!
//! Advisory option candidates persisted alongside orders. Recommendations
//! have their own id sequence and never affect order ids.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::market_calendar::expiration::yyyymmdd;
use crate::domain::order_execution::{OptionRight, OrderError, StoreError};
use crate::domain::shared::RecommendationId;

/// A candidate to be stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecommendation {
    /// Underlying ticker.
    pub ticker: String,
    /// PUT or CALL.
    pub option_type: OptionRight,
    /// Strike price.
    pub strike: Decimal,
    /// Expiration date.
    #[serde(with = "yyyymmdd")]
    pub expiration: NaiveDate,
    /// Premium per share.
    pub premium: Decimal,
    /// Option delta.
    #[serde(default)]
    pub delta: Option<f64>,
    /// Annualized return of selling the option.
    #[serde(default)]
    pub annualized_return: Option<f64>,
    /// Ranking score.
    #[serde(default)]
    pub score: Option<f64>,
}

impl NewRecommendation {
    /// Normalize the ticker and check numeric fields.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty ticker, non-positive strike,
    /// or negative premium.
    pub fn validated(mut self) -> Result<Self, OrderError> {
        self.ticker = self.ticker.trim().to_ascii_uppercase();
        if self.ticker.is_empty() {
            return Err(OrderError::missing("ticker"));
        }
        if self.strike <= Decimal::ZERO {
            return Err(OrderError::validation("strike", "strike must be positive"));
        }
        if self.premium < Decimal::ZERO {
            return Err(OrderError::validation(
                "premium",
                "premium must not be negative",
            ));
        }
        Ok(self)
    }
}

/// A stored recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Row id.
    pub id: RecommendationId,
    /// Candidate fields.
    #[serde(flatten)]
    pub candidate: NewRecommendation,
    /// Insert time.
    pub created_at: DateTime<Utc>,
}

/// Persistence for recommendations.
#[async_trait]
pub trait RecommendationRepository: Send + Sync {
    /// Store a candidate and return its id.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    async fn save_recommendation(
        &self,
        candidate: &NewRecommendation,
    ) -> Result<RecommendationId, StoreError>;

    /// Most recent recommendations first, optionally for one ticker.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn recent_recommendations(
        &self,
        ticker: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Recommendation>, StoreError>;
}
