//! Market snapshot captured when an order is created.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Quote and Greeks at order creation. Audit only; never used to
/// re-derive the order intent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Best bid.
    pub bid: Option<Decimal>,
    /// Best ask.
    pub ask: Option<Decimal>,
    /// Last trade.
    pub last: Option<Decimal>,
    /// Implied volatility (fraction, 0.25 = 25%).
    pub implied_volatility: Option<f64>,
    /// Delta.
    pub delta: Option<f64>,
    /// Gamma.
    pub gamma: Option<f64>,
    /// Theta.
    pub theta: Option<f64>,
    /// Vega.
    pub vega: Option<f64>,
    /// Open interest.
    pub open_interest: Option<i64>,
    /// Session volume.
    pub volume: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_snapshot_is_empty() {
        let snapshot = MarketSnapshot::default();
        assert!(snapshot.bid.is_none());
        assert!(snapshot.delta.is_none());
        assert!(snapshot.volume.is_none());
    }

    #[test]
    fn snapshot_deserializes_partial_quotes() {
        let snapshot: MarketSnapshot =
            serde_json::from_str(r#"{"bid": "2.45", "delta": -0.25}"#).unwrap();
        assert_eq!(snapshot.bid, Some(Decimal::new(245, 2)));
        assert_eq!(snapshot.delta, Some(-0.25));
        assert!(snapshot.ask.is_none());
    }
}
