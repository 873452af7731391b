//! SQLite Order Store
//!
//! Embedded, durable store for orders and recommendations. Decimals are kept
//! as TEXT so prices round-trip exactly; timestamps are RFC 3339 TEXT.
//!
//! Status writes are a single conditional `UPDATE ... WHERE status IN (...)`
//! so the transition check and the write are one atomic statement.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{QueryBuilder, Row, Sqlite};

use crate::domain::market_calendar::{format_expiration, parse_expiration};
use crate::domain::order_execution::{
    ExecutionDetails, Instrument, InstrumentKind, MarketSnapshot, NewOrder, OptionRight, Order,
    OrderClaims, OrderFilter, OrderRepository, OrderSide, OrderStateMachine, OrderStatus,
    StatusUpdate, StoreError,
};
use crate::domain::recommendation::{NewRecommendation, Recommendation, RecommendationRepository};
use crate::domain::shared::{OrderId, RecommendationId, VenueOrderId};

/// Attempts of a status write that lost a race with another writer.
const MAX_STATUS_WRITE_ATTEMPTS: usize = 3;

const SCHEMA: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS orders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ticker TEXT NOT NULL,
        instrument_kind TEXT NOT NULL DEFAULT 'OPTION',
        option_type TEXT,
        strike TEXT,
        expiration TEXT,
        action TEXT NOT NULL,
        quantity INTEGER NOT NULL CHECK (quantity > 0),
        premium TEXT,
        bid TEXT,
        ask TEXT,
        last TEXT,
        implied_volatility REAL,
        delta REAL,
        gamma REAL,
        theta REAL,
        vega REAL,
        open_interest INTEGER,
        volume INTEGER,
        status TEXT NOT NULL DEFAULT 'pending',
        executed INTEGER NOT NULL DEFAULT 0,
        venue_order_id TEXT,
        venue_status TEXT,
        filled INTEGER,
        remaining INTEGER,
        avg_fill_price TEXT,
        is_mock INTEGER NOT NULL DEFAULT 0,
        is_rollover INTEGER NOT NULL DEFAULT 0,
        rolled_from_order_id INTEGER,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    ",
    "CREATE INDEX IF NOT EXISTS idx_orders_status ON orders (status)",
    "CREATE INDEX IF NOT EXISTS idx_orders_ticker ON orders (ticker)",
    "CREATE INDEX IF NOT EXISTS idx_orders_venue_order_id ON orders (venue_order_id)",
    r"
    CREATE TABLE IF NOT EXISTS recommendations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ticker TEXT NOT NULL,
        option_type TEXT NOT NULL,
        strike TEXT NOT NULL,
        expiration TEXT NOT NULL,
        premium TEXT NOT NULL,
        delta REAL,
        annualized_return REAL,
        score REAL,
        created_at TEXT NOT NULL
    )
    ",
    "CREATE INDEX IF NOT EXISTS idx_recommendations_ticker ON recommendations (ticker)",
];

const ORDER_COLUMNS: &str = "id, ticker, instrument_kind, option_type, strike, expiration, action, \
     quantity, premium, bid, ask, last, implied_volatility, delta, gamma, theta, vega, \
     open_interest, volume, status, executed, venue_order_id, venue_status, filled, remaining, \
     avg_fill_price, is_mock, is_rollover, rolled_from_order_id, created_at, updated_at";

/// SQLite-backed order and recommendation store.
#[derive(Debug, Clone)]
pub struct SqliteOrderStore {
    pool: SqlitePool,
    claims: OrderClaims,
}

impl SqliteOrderStore {
    /// Open (creating if missing) the database file and ensure the schema.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the file cannot be opened or migrated.
    pub async fn open(
        path: &Path,
        max_connections: u32,
        busy_timeout: Duration,
    ) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Storage(format!("create {}: {e}", parent.display())))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(busy_timeout)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(storage)?;

        let store = Self {
            pool,
            claims: OrderClaims::new(),
        };
        store.migrate().await?;
        tracing::info!(path = %path.display(), max_connections, "Order store opened");
        Ok(store)
    }

    /// Private in-memory database, used by tests and dry runs.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the database cannot be created.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(storage)?;
        // One connection that never idles out, or the database disappears.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(storage)?;

        let store = Self {
            pool,
            claims: OrderClaims::new(),
        };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(storage)?;
        }
        Ok(())
    }

    /// Close the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn current_status(&self, id: OrderId) -> Result<Option<OrderStatus>, StoreError> {
        let row = sqlx::query("SELECT status FROM orders WHERE id = ?")
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.map(|r| {
            let raw: String = r.try_get("status").map_err(storage)?;
            raw.parse::<OrderStatus>().map_err(|e| corrupt(id.value(), e))
        })
        .transpose()
    }

    async fn try_status_write(&self, id: OrderId, update: &StatusUpdate) -> Result<bool, StoreError> {
        let details = &update.details;
        let mut query = QueryBuilder::<Sqlite>::new("UPDATE orders SET status = ");
        query.push_bind(update.status.as_str());
        query.push(", executed = COALESCE(");
        query.push_bind(update.executed);
        query.push(", executed), venue_order_id = COALESCE(");
        query.push_bind(details.venue_order_id.as_ref().map(|v| v.as_str().to_string()));
        query.push(", venue_order_id), venue_status = COALESCE(");
        query.push_bind(details.venue_status.clone());
        query.push(", venue_status), filled = COALESCE(");
        query.push_bind(details.filled.map(i64::from));
        query.push(", filled), remaining = COALESCE(");
        query.push_bind(details.remaining.map(i64::from));
        query.push(", remaining), avg_fill_price = COALESCE(");
        query.push_bind(details.avg_fill_price.map(|p| p.to_string()));
        query.push(", avg_fill_price), updated_at = ");
        query.push_bind(timestamp(Utc::now()));
        query.push(" WHERE id = ");
        query.push_bind(id.value());
        query.push(" AND status IN (");
        let mut sources = query.separated(", ");
        for source in OrderStateMachine::allowed_sources(update.status) {
            sources.push_bind(source.as_str());
        }
        sources.push_unseparated(")");

        let result = query.build().execute(&self.pool).await.map_err(storage)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl OrderRepository for SqliteOrderStore {
    fn claims(&self) -> &OrderClaims {
        &self.claims
    }

    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    async fn create(&self, order: &NewOrder) -> Result<OrderId, StoreError> {
        order.validate()?;
        let now = timestamp(Utc::now());
        let snapshot = &order.snapshot;

        let result = sqlx::query(
            r"
            INSERT INTO orders (
                ticker, instrument_kind, option_type, strike, expiration, action, quantity,
                premium, bid, ask, last, implied_volatility, delta, gamma, theta, vega,
                open_interest, volume, status, executed, is_mock, is_rollover,
                rolled_from_order_id, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', 0, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&order.ticker)
        .bind(order.instrument.kind().as_str())
        .bind(order.instrument.option_right().map(|r| r.as_str()))
        .bind(order.instrument.strike().map(|s| s.to_string()))
        .bind(order.instrument.expiration().map(format_expiration))
        .bind(order.action.as_str())
        .bind(i64::from(order.quantity))
        .bind(order.premium.map(|p| p.to_string()))
        .bind(snapshot.bid.map(|p| p.to_string()))
        .bind(snapshot.ask.map(|p| p.to_string()))
        .bind(snapshot.last.map(|p| p.to_string()))
        .bind(snapshot.implied_volatility)
        .bind(snapshot.delta)
        .bind(snapshot.gamma)
        .bind(snapshot.theta)
        .bind(snapshot.vega)
        .bind(snapshot.open_interest)
        .bind(snapshot.volume)
        .bind(order.is_mock)
        .bind(order.is_rollover)
        .bind(order.rolled_from.map(|id| id.value()))
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        let id = OrderId::new(result.last_insert_rowid());
        tracing::debug!(order_id = %id, ticker = %order.ticker, "Order row inserted");
        Ok(id)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.as_ref().map(decode_order).transpose()
    }

    async fn get_by_venue_order_id(
        &self,
        venue_order_id: &VenueOrderId,
    ) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE venue_order_id = ? ORDER BY id DESC LIMIT 1"
        ))
        .bind(venue_order_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;
        row.as_ref().map(decode_order).transpose()
    }

    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError> {
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1 = 1"));

        if !filter.statuses.is_empty() {
            query.push(" AND status IN (");
            let mut statuses = query.separated(", ");
            for status in &filter.statuses {
                statuses.push_bind(status.as_str());
            }
            statuses.push_unseparated(")");
        }
        if let Some(ticker) = &filter.ticker {
            query.push(" AND UPPER(ticker) = ");
            query.push_bind(ticker.to_ascii_uppercase());
        }
        if let Some(executed) = filter.executed {
            query.push(" AND executed = ");
            query.push_bind(executed);
        }
        if let Some(is_rollover) = filter.is_rollover {
            query.push(" AND is_rollover = ");
            query.push_bind(is_rollover);
        }
        query.push(" ORDER BY id DESC");
        if let Some(limit) = filter.limit {
            query.push(" LIMIT ");
            query.push_bind(i64::from(limit));
        }

        let rows = query.build().fetch_all(&self.pool).await.map_err(storage)?;
        rows.iter().map(decode_order).collect()
    }

    async fn update_status(&self, id: OrderId, update: &StatusUpdate) -> Result<bool, StoreError> {
        for _ in 0..MAX_STATUS_WRITE_ATTEMPTS {
            if self.try_status_write(id, update).await? {
                return Ok(true);
            }
            let Some(current) = self.current_status(id).await? else {
                return Ok(false);
            };
            OrderStateMachine::validate_transition(current, update.status)?;
            // The row moved between the write and the read; the transition
            // from the new status is still valid, so try again.
            tracing::debug!(order_id = %id, current = %current, "Status write lost a race, retrying");
        }
        Err(StoreError::Storage(format!(
            "status of order {id} kept changing during update"
        )))
    }

    async fn update_quantity(&self, id: OrderId, quantity: u32) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE orders SET quantity = ?, updated_at = ? WHERE id = ? AND status = 'pending'",
        )
        .bind(i64::from(quantity))
        .bind(timestamp(Utc::now()))
        .bind(id.value())
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: OrderId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = ?")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RecommendationRepository for SqliteOrderStore {
    async fn save_recommendation(
        &self,
        candidate: &NewRecommendation,
    ) -> Result<RecommendationId, StoreError> {
        let result = sqlx::query(
            r"
            INSERT INTO recommendations (
                ticker, option_type, strike, expiration, premium, delta, annualized_return,
                score, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&candidate.ticker)
        .bind(candidate.option_type.as_str())
        .bind(candidate.strike.to_string())
        .bind(format_expiration(candidate.expiration))
        .bind(candidate.premium.to_string())
        .bind(candidate.delta)
        .bind(candidate.annualized_return)
        .bind(candidate.score)
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(RecommendationId::new(result.last_insert_rowid()))
    }

    async fn recent_recommendations(
        &self,
        ticker: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Recommendation>, StoreError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT id, ticker, option_type, strike, expiration, premium, delta, \
             annualized_return, score, created_at FROM recommendations",
        );
        if let Some(ticker) = ticker {
            query.push(" WHERE UPPER(ticker) = ");
            query.push_bind(ticker.trim().to_ascii_uppercase());
        }
        query.push(" ORDER BY id DESC LIMIT ");
        query.push_bind(i64::from(limit));

        let rows = query.build().fetch_all(&self.pool).await.map_err(storage)?;
        rows.iter().map(decode_recommendation).collect()
    }
}

fn storage(err: sqlx::Error) -> StoreError {
    StoreError::Storage(err.to_string())
}

fn corrupt(id: i64, err: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt {
        id,
        message: err.to_string(),
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(id: i64, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| corrupt(id, format!("timestamp '{raw}': {e}")))
}

fn parse_decimal(id: i64, raw: Option<String>) -> Result<Option<Decimal>, StoreError> {
    raw.map(|s| Decimal::from_str(&s).map_err(|e| corrupt(id, format!("decimal '{s}': {e}"))))
        .transpose()
}

fn parse_count(id: i64, raw: Option<i64>) -> Result<Option<u32>, StoreError> {
    raw.map(|n| u32::try_from(n).map_err(|e| corrupt(id, format!("count {n}: {e}"))))
        .transpose()
}

fn decode_order(row: &SqliteRow) -> Result<Order, StoreError> {
    let id: i64 = row.try_get("id").map_err(storage)?;
    let get = |column: &str| -> Result<Option<String>, StoreError> {
        row.try_get::<Option<String>, _>(column)
            .map_err(|e| corrupt(id, e))
    };

    let kind: InstrumentKind = get("instrument_kind")?
        .unwrap_or_default()
        .parse()
        .map_err(|e| corrupt(id, e))?;
    let instrument = match kind {
        InstrumentKind::Equity => Instrument::Equity,
        InstrumentKind::Option => {
            let right: OptionRight = get("option_type")?
                .ok_or_else(|| corrupt(id, "option without option_type"))?
                .parse()
                .map_err(|e| corrupt(id, e))?;
            let strike = parse_decimal(id, get("strike")?)?
                .ok_or_else(|| corrupt(id, "option without strike"))?;
            let expiration: NaiveDate = parse_expiration(
                &get("expiration")?.ok_or_else(|| corrupt(id, "option without expiration"))?,
            )
            .map_err(|e| corrupt(id, e))?;
            Instrument::option(right, strike, expiration).map_err(|e| corrupt(id, e))?
        }
    };

    let action: OrderSide = get("action")?
        .unwrap_or_default()
        .parse()
        .map_err(|e| corrupt(id, e))?;
    let status: OrderStatus = get("status")?
        .unwrap_or_default()
        .parse()
        .map_err(|e| corrupt(id, e))?;
    let quantity: i64 = row.try_get("quantity").map_err(|e| corrupt(id, e))?;
    let quantity = u32::try_from(quantity).map_err(|e| corrupt(id, e))?;

    let snapshot = MarketSnapshot {
        bid: parse_decimal(id, get("bid")?)?,
        ask: parse_decimal(id, get("ask")?)?,
        last: parse_decimal(id, get("last")?)?,
        implied_volatility: row.try_get("implied_volatility").map_err(|e| corrupt(id, e))?,
        delta: row.try_get("delta").map_err(|e| corrupt(id, e))?,
        gamma: row.try_get("gamma").map_err(|e| corrupt(id, e))?,
        theta: row.try_get("theta").map_err(|e| corrupt(id, e))?,
        vega: row.try_get("vega").map_err(|e| corrupt(id, e))?,
        open_interest: row.try_get("open_interest").map_err(|e| corrupt(id, e))?,
        volume: row.try_get("volume").map_err(|e| corrupt(id, e))?,
    };

    let execution = ExecutionDetails {
        venue_order_id: get("venue_order_id")?.map(VenueOrderId::new),
        venue_status: get("venue_status")?,
        filled: parse_count(id, row.try_get("filled").map_err(|e| corrupt(id, e))?)?,
        remaining: parse_count(id, row.try_get("remaining").map_err(|e| corrupt(id, e))?)?,
        avg_fill_price: parse_decimal(id, get("avg_fill_price")?)?,
    };

    let rolled_from: Option<i64> = row
        .try_get("rolled_from_order_id")
        .map_err(|e| corrupt(id, e))?;

    Ok(Order {
        id: OrderId::new(id),
        ticker: get("ticker")?.unwrap_or_default(),
        instrument,
        action,
        quantity,
        premium: parse_decimal(id, get("premium")?)?,
        snapshot,
        status,
        executed: row.try_get("executed").map_err(|e| corrupt(id, e))?,
        execution,
        is_mock: row.try_get("is_mock").map_err(|e| corrupt(id, e))?,
        is_rollover: row.try_get("is_rollover").map_err(|e| corrupt(id, e))?,
        rolled_from: rolled_from.map(OrderId::new),
        created_at: parse_timestamp(id, &get("created_at")?.unwrap_or_default())?,
        updated_at: parse_timestamp(id, &get("updated_at")?.unwrap_or_default())?,
    })
}

fn decode_recommendation(row: &SqliteRow) -> Result<Recommendation, StoreError> {
    let id: i64 = row.try_get("id").map_err(storage)?;
    let text = |column: &str| -> Result<String, StoreError> {
        row.try_get::<String, _>(column).map_err(|e| corrupt(id, e))
    };

    let candidate = NewRecommendation {
        ticker: text("ticker")?,
        option_type: text("option_type")?.parse().map_err(|e| corrupt(id, e))?,
        strike: parse_decimal(id, Some(text("strike")?))?.unwrap_or_default(),
        expiration: parse_expiration(&text("expiration")?).map_err(|e| corrupt(id, e))?,
        premium: parse_decimal(id, Some(text("premium")?))?.unwrap_or_default(),
        delta: row.try_get("delta").map_err(|e| corrupt(id, e))?,
        annualized_return: row.try_get("annualized_return").map_err(|e| corrupt(id, e))?,
        score: row.try_get("score").map_err(|e| corrupt(id, e))?,
    };

    Ok(Recommendation {
        id: RecommendationId::new(id),
        candidate,
        created_at: parse_timestamp(id, &text("created_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::OrderError;
    use rust_decimal_macros::dec;

    fn aapl_put() -> NewOrder {
        NewOrder::new(
            "AAPL",
            Instrument::option(
                OptionRight::Put,
                dec!(150.0),
                NaiveDate::from_ymd_opt(2024, 12, 20).unwrap(),
            )
            .unwrap(),
            OrderSide::Sell,
            1,
            Some(dec!(2.50)),
        )
        .with_snapshot(MarketSnapshot {
            bid: Some(dec!(2.45)),
            ask: Some(dec!(2.55)),
            delta: Some(-0.30),
            open_interest: Some(1_200),
            ..MarketSnapshot::default()
        })
    }

    fn ticker(symbol: &str) -> NewOrder {
        let mut order = aapl_put();
        order.ticker = symbol.to_string();
        order
    }

    async fn store() -> SqliteOrderStore {
        SqliteOrderStore::in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn create_then_get_echoes_intent() {
        let store = store().await;
        let id = store.create(&aapl_put()).await.unwrap();

        let order = store.get(id).await.unwrap().unwrap();
        assert_eq!(order.id, id);
        assert_eq!(order.ticker, "AAPL");
        assert_eq!(order.instrument, aapl_put().instrument);
        assert_eq!(order.action, OrderSide::Sell);
        assert_eq!(order.premium, Some(dec!(2.50)));
        assert_eq!(order.snapshot.bid, Some(dec!(2.45)));
        assert_eq!(order.snapshot.delta, Some(-0.30));
        assert_eq!(order.snapshot.open_interest, Some(1_200));
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(!order.executed);
        assert_eq!(order.execution, ExecutionDetails::default());
        assert_eq!(order.created_at, order.updated_at);
    }

    #[tokio::test]
    async fn equity_orders_round_trip_without_option_fields() {
        let store = store().await;
        let id = store
            .create(&NewOrder::new("SPY", Instrument::Equity, OrderSide::Buy, 10, None))
            .await
            .unwrap();

        let order = store.get(id).await.unwrap().unwrap();
        assert_eq!(order.instrument, Instrument::Equity);
        assert_eq!(order.premium, None);
    }

    #[tokio::test]
    async fn invalid_intent_is_rejected() {
        let store = store().await;
        let mut order = aapl_put();
        order.quantity = 0;

        let err = store.create(&order).await.unwrap_err();
        assert!(matches!(err, StoreError::Order(OrderError::Validation { .. })));
        assert!(store.list(&OrderFilter::all()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_ids_are_absent_not_errors() {
        let store = store().await;
        let id = OrderId::new(99_999);

        assert!(store.get(id).await.unwrap().is_none());
        assert!(!store
            .update_status(id, &StatusUpdate::to(OrderStatus::Processing))
            .await
            .unwrap());
        assert!(!store.update_quantity(id, 3).await.unwrap());
        assert!(!store.delete(id).await.unwrap());
    }

    #[tokio::test]
    async fn filters_compose_newest_first() {
        let store = store().await;
        let a = store.create(&ticker("AAPL")).await.unwrap();
        let m = store.create(&ticker("MSFT")).await.unwrap();
        let b = store.create(&ticker("AAPL").rolling(a)).await.unwrap();
        store
            .update_status(m, &StatusUpdate::to(OrderStatus::Cancelled))
            .await
            .unwrap();

        let all = store.list(&OrderFilter::all()).await.unwrap();
        assert_eq!(all.iter().map(|o| o.id).collect::<Vec<_>>(), vec![b, m, a]);

        let aapl = store
            .list(&OrderFilter::all().with_ticker("aapl"))
            .await
            .unwrap();
        assert_eq!(aapl.iter().map(|o| o.id).collect::<Vec<_>>(), vec![b, a]);

        let rolled = store
            .list(&OrderFilter::all().with_ticker("AAPL").with_rollover(true))
            .await
            .unwrap();
        assert_eq!(rolled.len(), 1);
        assert_eq!(rolled[0].rolled_from, Some(a));

        let open = store
            .list(&OrderFilter::all().with_statuses([OrderStatus::Pending, OrderStatus::Cancelled]))
            .await
            .unwrap();
        assert_eq!(open.len(), 3);

        let limited = store
            .list(&OrderFilter::all().with_status(OrderStatus::Pending).with_limit(1))
            .await
            .unwrap();
        assert_eq!(limited.iter().map(|o| o.id).collect::<Vec<_>>(), vec![b]);
    }

    #[tokio::test]
    async fn status_update_merges_execution_details() {
        let store = store().await;
        let id = store.create(&aapl_put()).await.unwrap();

        let accepted = StatusUpdate::to(OrderStatus::Processing)
            .executed(false)
            .with_details(ExecutionDetails::accepted(
                VenueOrderId::new("V1"),
                "Submitted".into(),
                1,
            ));
        assert!(store.update_status(id, &accepted).await.unwrap());

        let filled = StatusUpdate::to(OrderStatus::Completed)
            .executed(true)
            .with_details(ExecutionDetails {
                venue_status: Some("Filled".into()),
                filled: Some(1),
                remaining: Some(0),
                avg_fill_price: Some(dec!(2.48)),
                ..ExecutionDetails::default()
            });
        assert!(store.update_status(id, &filled).await.unwrap());

        let order = store.get(id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert!(order.executed);
        assert_eq!(order.execution.venue_order_id, Some(VenueOrderId::new("V1")));
        assert_eq!(order.execution.venue_status.as_deref(), Some("Filled"));
        assert_eq!(order.execution.avg_fill_price, Some(dec!(2.48)));
        assert!(order.updated_at >= order.created_at);

        let by_venue = store
            .get_by_venue_order_id(&VenueOrderId::new("V1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_venue.id, id);
    }

    #[tokio::test]
    async fn illegal_transition_is_rejected_and_changes_nothing() {
        let store = store().await;
        let id = store.create(&aapl_put()).await.unwrap();
        store
            .update_status(id, &StatusUpdate::to(OrderStatus::Cancelled))
            .await
            .unwrap();

        let err = store
            .update_status(id, &StatusUpdate::to(OrderStatus::Processing))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Order(OrderError::InvalidStateTransition { .. })
        ));
        assert_eq!(
            store.get(id).await.unwrap().unwrap().status,
            OrderStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn quantity_changes_only_while_pending() {
        let store = store().await;
        let id = store.create(&aapl_put()).await.unwrap();

        assert!(store.update_quantity(id, 5).await.unwrap());

        for status in [
            OrderStatus::Processing,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            let id = store.create(&aapl_put()).await.unwrap();
            assert!(store.update_status(id, &StatusUpdate::to(status)).await.unwrap());
            assert!(!store.update_quantity(id, 7).await.unwrap(), "{status}");
            assert_eq!(store.get(id).await.unwrap().unwrap().quantity, 1, "{status}");
        }
        assert!(!store.update_quantity(OrderId::new(99_999), 7).await.unwrap());
    }

    #[tokio::test]
    async fn ids_are_never_reused_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.db");

        let first = {
            let store = SqliteOrderStore::open(&path, 2, Duration::from_secs(1))
                .await
                .unwrap();
            let first = store.create(&aapl_put()).await.unwrap();
            let second = store.create(&aapl_put()).await.unwrap();
            assert!(store.delete(second).await.unwrap());
            store.close().await;
            first
        };

        let store = SqliteOrderStore::open(&path, 2, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(store.get(first).await.unwrap().is_some());
        let third = store.create(&aapl_put()).await.unwrap();
        assert_eq!(third.value(), first.value() + 2);
    }

    #[tokio::test]
    async fn recommendations_have_their_own_sequence() {
        let store = store().await;
        let order_id = store.create(&aapl_put()).await.unwrap();

        let candidate = NewRecommendation {
            ticker: "MSFT".into(),
            option_type: OptionRight::Put,
            strike: dec!(400),
            expiration: NaiveDate::from_ymd_opt(2024, 12, 20).unwrap(),
            premium: dec!(3.10),
            delta: Some(-0.21),
            annualized_return: Some(0.18),
            score: Some(0.7),
        };
        store.save_recommendation(&candidate).await.unwrap();
        let rec_id = store.save_recommendation(&candidate).await.unwrap();
        assert_eq!(rec_id.value(), 2);

        let next_order = store.create(&aapl_put()).await.unwrap();
        assert_eq!(next_order.value(), order_id.value() + 1);

        let recent = store.recent_recommendations(Some("msft"), 10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, rec_id);
        assert_eq!(recent[0].candidate, candidate);
        assert!(store.recent_recommendations(Some("AAPL"), 10).await.unwrap().is_empty());
    }
}
