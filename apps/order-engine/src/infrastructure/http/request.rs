//! HTTP query parameters.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::use_cases::OtmScan;
use crate::domain::order_execution::{OptionRight, OrderError, OrderFilter, OrderStatus};

/// Default row cap for recommendation listings.
const DEFAULT_RECOMMENDATION_LIMIT: u32 = 50;

/// Default number of weekly expirations.
const DEFAULT_EXPIRATION_WEEKS: usize = 4;

/// Largest number of weekly expirations served in one request (two years).
pub const MAX_EXPIRATION_WEEKS: usize = 104;

/// Default strike ladder size.
const DEFAULT_STRIKE_COUNT: usize = 10;

/// Largest strike ladder served in one request.
pub const MAX_STRIKE_COUNT: usize = 200;

/// Default distance of an OTM scan from the price, in percent.
const DEFAULT_OTM_PERCENT: u32 = 10;

/// Default strikes per ticker in an OTM scan.
const DEFAULT_OTM_STRIKES: usize = 5;

/// Query of `GET /orders`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrdersQuery {
    /// Comma-separated statuses.
    pub status: Option<String>,
    /// Ticker.
    pub ticker: Option<String>,
    /// Executed flag.
    pub executed: Option<bool>,
    /// Rollover flag.
    pub rollover: Option<bool>,
    /// Row cap.
    pub limit: Option<u32>,
}

impl OrdersQuery {
    /// Build the store filter.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unknown status.
    pub fn to_filter(&self) -> Result<OrderFilter, OrderError> {
        let mut filter = OrderFilter::all();
        if let Some(raw) = self.status.as_deref() {
            let statuses = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::parse::<OrderStatus>)
                .collect::<Result<Vec<_>, _>>()?;
            filter = filter.with_statuses(statuses);
        }
        if let Some(ticker) = self.ticker.as_deref().filter(|t| !t.trim().is_empty()) {
            filter = filter.with_ticker(ticker);
        }
        if let Some(executed) = self.executed {
            filter = filter.with_executed(executed);
        }
        if let Some(rollover) = self.rollover {
            filter = filter.with_rollover(rollover);
        }
        if let Some(limit) = self.limit {
            filter = filter.with_limit(limit);
        }
        Ok(filter)
    }
}

/// Query of `GET /pending-orders`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PendingOrdersQuery {
    /// Show executed orders instead of in-flight ones.
    #[serde(default)]
    pub executed: bool,
}

/// Query of `GET /stock-price`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockPriceQuery {
    /// Comma-separated tickers.
    pub tickers: Option<String>,
}

impl StockPriceQuery {
    /// Normalized, de-duplicated tickers.
    #[must_use]
    pub fn tickers(&self) -> Vec<String> {
        split_tickers(self.tickers.as_deref())
    }
}

fn split_tickers(raw: Option<&str>) -> Vec<String> {
    let mut tickers: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(|t| t.trim().to_ascii_uppercase())
        .filter(|t| !t.is_empty())
        .collect();
    tickers.sort();
    tickers.dedup();
    tickers
}

/// Query of `GET /otm`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OtmQuery {
    /// Comma-separated tickers.
    pub tickers: Option<String>,
    /// Distance from the price, in percent.
    pub otm: Option<Decimal>,
    /// PUT or CALL, case-insensitive; defaults to PUT.
    #[serde(rename = "optionType")]
    pub option_type: Option<String>,
    /// Strikes per ticker.
    pub count: Option<usize>,
}

impl OtmQuery {
    /// Validated scan parameters.
    ///
    /// # Errors
    ///
    /// Returns a validation error for no tickers, an option type other than
    /// PUT or CALL, a percentage outside `(0, 100)`, or a count above
    /// `MAX_STRIKE_COUNT`.
    pub fn validated(&self) -> Result<OtmScan, OrderError> {
        let tickers = split_tickers(self.tickers.as_deref());
        if tickers.is_empty() {
            return Err(OrderError::validation("tickers", "No tickers provided"));
        }

        let right = match self.option_type.as_deref().map(str::trim) {
            None | Some("") => OptionRight::Put,
            Some(raw) => raw.to_ascii_uppercase().parse::<OptionRight>().map_err(|_| {
                OrderError::validation("optionType", format!("optionType must be PUT or CALL, got '{raw}'"))
            })?,
        };

        let otm_percent = self.otm.unwrap_or_else(|| Decimal::from(DEFAULT_OTM_PERCENT));
        if otm_percent <= Decimal::ZERO || otm_percent >= Decimal::ONE_HUNDRED {
            return Err(OrderError::validation(
                "otm",
                "otm must be a percentage between 0 and 100",
            ));
        }

        let count = self.count.unwrap_or(DEFAULT_OTM_STRIKES);
        if count > MAX_STRIKE_COUNT {
            return Err(OrderError::validation(
                "count",
                format!("count must be at most {MAX_STRIKE_COUNT}"),
            ));
        }

        Ok(OtmScan {
            tickers,
            right,
            otm_percent,
            count,
        })
    }
}

/// Query of `GET /expirations`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpirationsQuery {
    /// Underlying; accepted for symmetry, the calendar is the same for all.
    pub ticker: Option<String>,
    /// Number of weekly expirations.
    pub weeks: Option<usize>,
}

impl ExpirationsQuery {
    /// Requested weeks, defaulting to four.
    ///
    /// # Errors
    ///
    /// Returns a validation error above `MAX_EXPIRATION_WEEKS`.
    pub fn weeks(&self) -> Result<usize, OrderError> {
        let weeks = self.weeks.unwrap_or(DEFAULT_EXPIRATION_WEEKS);
        if weeks > MAX_EXPIRATION_WEEKS {
            return Err(OrderError::validation(
                "weeks",
                format!("weeks must be at most {MAX_EXPIRATION_WEEKS}"),
            ));
        }
        Ok(weeks)
    }
}

/// Query of `GET /strikes`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrikesQuery {
    /// Reference price.
    pub price: Option<Decimal>,
    /// Strike spacing.
    pub interval: Option<Decimal>,
    /// Number of strikes.
    pub count: Option<usize>,
}

impl StrikesQuery {
    /// Validated `(price, interval, count)`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a missing or non-positive price or
    /// interval, or a count above `MAX_STRIKE_COUNT`.
    pub fn validated(&self) -> Result<(Decimal, Decimal, usize), OrderError> {
        let price = self
            .price
            .filter(|p| *p > Decimal::ZERO)
            .ok_or_else(|| OrderError::validation("price", "price must be a positive number"))?;
        let interval = self.interval.unwrap_or(Decimal::ONE);
        if interval <= Decimal::ZERO {
            return Err(OrderError::validation("interval", "interval must be positive"));
        }
        let count = self.count.unwrap_or(DEFAULT_STRIKE_COUNT);
        if count > MAX_STRIKE_COUNT {
            return Err(OrderError::validation(
                "count",
                format!("count must be at most {MAX_STRIKE_COUNT}"),
            ));
        }
        Ok((price, interval, count))
    }
}

/// Query of `GET /recommendations`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationsQuery {
    /// Ticker.
    pub ticker: Option<String>,
    /// Row cap.
    pub limit: Option<u32>,
}

impl RecommendationsQuery {
    /// Row cap, defaulting to fifty.
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_RECOMMENDATION_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn status_accepts_comma_separated_set() {
        let query = OrdersQuery {
            status: Some("pending, processing".into()),
            ticker: Some("aapl".into()),
            limit: Some(10),
            ..OrdersQuery::default()
        };
        let filter = query.to_filter().unwrap();
        assert_eq!(
            filter.statuses,
            vec![OrderStatus::Pending, OrderStatus::Processing]
        );
        assert_eq!(filter.ticker.as_deref(), Some("AAPL"));
        assert_eq!(filter.limit, Some(10));
    }

    #[test]
    fn unknown_status_is_rejected() {
        let query = OrdersQuery {
            status: Some("pending,filled".into()),
            ..OrdersQuery::default()
        };
        assert!(matches!(
            query.to_filter(),
            Err(OrderError::Validation { .. })
        ));
    }

    #[test]
    fn tickers_are_normalized() {
        let query = StockPriceQuery {
            tickers: Some(" msft,AAPL,,aapl ".into()),
        };
        assert_eq!(query.tickers(), vec!["AAPL".to_string(), "MSFT".to_string()]);
        assert!(StockPriceQuery::default().tickers().is_empty());
    }

    #[test]
    fn strikes_require_positive_price() {
        let query = StrikesQuery {
            price: Some(dec!(0)),
            ..StrikesQuery::default()
        };
        assert!(query.validated().is_err());

        let query = StrikesQuery {
            price: Some(dec!(101.3)),
            interval: Some(dec!(5)),
            count: Some(4),
        };
        assert_eq!(query.validated().unwrap(), (dec!(101.3), dec!(5), 4));
    }

    #[test]
    fn otm_query_defaults_and_normalizes() {
        let query = OtmQuery {
            tickers: Some("aapl".into()),
            option_type: Some("call".into()),
            ..OtmQuery::default()
        };
        let scan = query.validated().unwrap();
        assert_eq!(scan.tickers, vec!["AAPL".to_string()]);
        assert_eq!(scan.right, OptionRight::Call);
        assert_eq!(scan.otm_percent, dec!(10));
        assert_eq!(scan.count, 5);
    }

    #[test]
    fn otm_query_rejects_bad_parameters() {
        let bad = [
            OtmQuery {
                tickers: Some("AAPL".into()),
                option_type: Some("INVALID".into()),
                ..OtmQuery::default()
            },
            OtmQuery::default(),
            OtmQuery {
                tickers: Some("AAPL".into()),
                otm: Some(dec!(100)),
                ..OtmQuery::default()
            },
            OtmQuery {
                tickers: Some("AAPL".into()),
                count: Some(MAX_STRIKE_COUNT + 1),
                ..OtmQuery::default()
            },
        ];
        for query in bad {
            assert!(
                matches!(query.validated(), Err(OrderError::Validation { .. })),
                "{query:?}"
            );
        }
    }

    #[test]
    fn oversized_ladders_and_calendars_are_rejected() {
        let query = StrikesQuery {
            price: Some(dec!(100)),
            interval: Some(dec!(1)),
            count: Some(MAX_STRIKE_COUNT + 1),
        };
        assert!(matches!(query.validated(), Err(OrderError::Validation { .. })));

        let query = ExpirationsQuery {
            weeks: Some(20_000_000),
            ..ExpirationsQuery::default()
        };
        assert!(matches!(query.weeks(), Err(OrderError::Validation { .. })));
        assert_eq!(ExpirationsQuery::default().weeks().unwrap(), 4);
    }
}
