//! Scan OTM Options Use Case
//!
//! Lists out-of-the-money strikes a fixed percentage away from each
//! underlying's current price, for the nearest weekly expiration.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::application::dto::OtmCandidatesDto;
use crate::application::ports::BrokerSession;
use crate::domain::market_calendar::{
    Clock, closest_friday, format_expiration, next_monthly_expiration, otm_strikes, otm_target,
    to_eastern,
};
use crate::domain::order_execution::OptionRight;

/// Parameters of one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtmScan {
    /// Normalized tickers.
    pub tickers: Vec<String>,
    /// Side to scan.
    pub right: OptionRight,
    /// Distance from the price, in percent.
    pub otm_percent: Decimal,
    /// Strikes per ticker.
    pub count: usize,
}

/// Use case for the out-of-the-money scan.
pub struct ScanOtmOptionsUseCase<S>
where
    S: BrokerSession,
{
    session: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> ScanOtmOptionsUseCase<S>
where
    S: BrokerSession,
{
    /// Create a new `ScanOtmOptionsUseCase`.
    pub fn new(session: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { session, clock }
    }

    /// Candidates per ticker; `None` for tickers without a price.
    pub async fn scan(&self, scan: &OtmScan) -> BTreeMap<String, Option<OtmCandidatesDto>> {
        let today = to_eastern(self.clock.now()).date();
        let expiration = format_expiration(closest_friday(today));
        let monthly_expiration = format_expiration(next_monthly_expiration(today));

        let mut data = BTreeMap::new();
        for ticker in &scan.tickers {
            let candidates = match self.session.get_price(ticker).await {
                Some(price) => otm_target(price, scan.right, scan.otm_percent).map(|target| {
                    OtmCandidatesDto {
                        stock_price: price,
                        option_type: scan.right,
                        otm_percentage: scan.otm_percent,
                        target_strike: target,
                        expiration: expiration.clone(),
                        monthly_expiration: monthly_expiration.clone(),
                        strikes: otm_strikes(price, scan.right, scan.otm_percent, scan.count),
                    }
                }),
                None => {
                    tracing::debug!(ticker = %ticker, "No price for OTM scan");
                    None
                }
            };
            data.insert(ticker.clone(), candidates);
        }
        data
    }
}
