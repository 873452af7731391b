//! HTTP Controller (Driver Adapter)
//!
//! Axum-based REST API under `/api/options` that delegates to the order
//! lifecycle use cases.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::application::dto::{
    CreateOrderDto, CreateOrderResponseDto, ExpirationsResponseDto, OrderActionResponseDto,
    OrderDto, OrdersResponseDto, OtmOptionsResponseDto, RecommendationsResponseDto,
    RolloverRequestDto,
    RolloverResponseDto, StockPriceResponseDto, StrikesResponseDto, UpdateQuantityDto,
};
use crate::application::ports::BrokerSession;
use crate::application::use_cases::{
    CancelOrderUseCase, CancelOutcome, CancelSettings, CreateOrderUseCase, ExecuteOrderUseCase,
    ManageOrdersUseCase, RolloverOrderUseCase, ScanOtmOptionsUseCase,
};
use crate::application::LifecycleError;
use crate::domain::market_calendar::{
    Clock, format_expiration, next_monthly_expiration, strikes_around_price, to_eastern,
    upcoming_expirations,
};
use crate::domain::order_execution::OrderRepository;
use crate::domain::recommendation::{NewRecommendation, RecommendationRepository};
use crate::domain::shared::OrderId;
use crate::error::EngineError;

use super::request::{
    ExpirationsQuery, OrdersQuery, OtmQuery, PendingOrdersQuery, RecommendationsQuery, StockPriceQuery,
    StrikesQuery,
};
use super::response::{DeleteOrderResponse, HealthResponse, RecommendationCreatedResponse};

type ApiResult<T> = Result<(StatusCode, Json<T>), EngineError>;

/// Application state shared across handlers.
pub struct AppState<S, O>
where
    S: BrokerSession,
    O: OrderRepository + RecommendationRepository,
{
    /// Use case for storing new orders.
    pub create_order: Arc<CreateOrderUseCase<O>>,
    /// Use case for submitting orders.
    pub execute_order: Arc<ExecuteOrderUseCase<S, O>>,
    /// Use case for cancelling orders.
    pub cancel_order: Arc<CancelOrderUseCase<S, O>>,
    /// Use case for rolling an order into a replacement.
    pub rollover_order: Arc<RolloverOrderUseCase<S, O>>,
    /// Queries, quantity updates and deletes.
    pub manage_orders: Arc<ManageOrdersUseCase<O>>,
    /// Out-of-the-money strike scan.
    pub scan_otm: Arc<ScanOtmOptionsUseCase<S>>,
    /// Broker session for prices and health.
    pub session: Arc<S>,
    /// Store for recommendations and health.
    pub store: Arc<O>,
    /// Clock for calendar helpers.
    pub clock: Arc<dyn Clock>,
    /// Application version.
    pub version: String,
}

impl<S, O> AppState<S, O>
where
    S: BrokerSession,
    O: OrderRepository + RecommendationRepository,
{
    /// Wire every use case over one session and one store.
    pub fn new(
        session: Arc<S>,
        store: Arc<O>,
        cancel: CancelSettings,
        clock: Arc<dyn Clock>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            create_order: Arc::new(CreateOrderUseCase::new(Arc::clone(&store))),
            execute_order: Arc::new(ExecuteOrderUseCase::new(
                Arc::clone(&session),
                Arc::clone(&store),
            )),
            cancel_order: Arc::new(CancelOrderUseCase::new(
                Arc::clone(&session),
                Arc::clone(&store),
                cancel,
            )),
            rollover_order: Arc::new(RolloverOrderUseCase::new(
                Arc::clone(&session),
                Arc::clone(&store),
                cancel,
            )),
            manage_orders: Arc::new(ManageOrdersUseCase::new(Arc::clone(&store))),
            scan_otm: Arc::new(ScanOtmOptionsUseCase::new(
                Arc::clone(&session),
                Arc::clone(&clock),
            )),
            session,
            store,
            clock,
            version: version.into(),
        }
    }
}

impl<S, O> Clone for AppState<S, O>
where
    S: BrokerSession,
    O: OrderRepository + RecommendationRepository,
{
    fn clone(&self) -> Self {
        Self {
            create_order: Arc::clone(&self.create_order),
            execute_order: Arc::clone(&self.execute_order),
            cancel_order: Arc::clone(&self.cancel_order),
            rollover_order: Arc::clone(&self.rollover_order),
            manage_orders: Arc::clone(&self.manage_orders),
            scan_otm: Arc::clone(&self.scan_otm),
            session: Arc::clone(&self.session),
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            version: self.version.clone(),
        }
    }
}

/// Create the HTTP router with all endpoints.
pub fn create_router<S, O>(state: AppState<S, O>) -> Router
where
    S: BrokerSession + 'static,
    O: OrderRepository + RecommendationRepository + 'static,
{
    let api = Router::new()
        .route("/order", post(create_order))
        .route("/orders", get(list_orders))
        .route("/pending-orders", get(pending_orders))
        .route("/order/{id}", get(get_order).delete(delete_order))
        .route("/order/{id}/quantity", put(update_quantity))
        .route("/order/{id}/cancel", post(cancel_order))
        .route("/execute/{id}", post(execute_order))
        .route("/rollover", post(rollover_order))
        .route("/stock-price", get(stock_price))
        .route("/otm", get(otm_options))
        .route("/expirations", get(expirations))
        .route("/strikes", get(strikes))
        .route(
            "/recommendations",
            get(list_recommendations).post(save_recommendation),
        );

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/options", api)
        .with_state(state)
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, EngineError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| EngineError::validation("body", e.body_text()))
}

/// Health check endpoint.
async fn health_check<S, O>(State(state): State<AppState<S, O>>) -> Json<HealthResponse>
where
    S: BrokerSession,
    O: OrderRepository + RecommendationRepository,
{
    let database_ok = state.store.ping().await;
    Json(HealthResponse {
        status: if database_ok { "healthy" } else { "degraded" }.to_string(),
        version: state.version.clone(),
        session_connected: state.session.is_connected(),
        database_ok,
    })
}

async fn create_order<S, O>(
    State(state): State<AppState<S, O>>,
    payload: Result<Json<CreateOrderDto>, JsonRejection>,
) -> ApiResult<CreateOrderResponseDto>
where
    S: BrokerSession,
    O: OrderRepository + RecommendationRepository,
{
    let request = json_body(payload)?;
    let order_id = state.create_order.execute(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponseDto {
            success: true,
            order_id,
        }),
    ))
}

async fn list_orders<S, O>(
    State(state): State<AppState<S, O>>,
    Query(query): Query<OrdersQuery>,
) -> ApiResult<OrdersResponseDto>
where
    S: BrokerSession,
    O: OrderRepository + RecommendationRepository,
{
    let filter = query.to_filter().map_err(LifecycleError::from)?;
    let orders = state.manage_orders.list(&filter).await?;
    Ok((StatusCode::OK, Json(OrdersResponseDto::from_orders(&orders))))
}

async fn pending_orders<S, O>(
    State(state): State<AppState<S, O>>,
    Query(query): Query<PendingOrdersQuery>,
) -> ApiResult<OrdersResponseDto>
where
    S: BrokerSession,
    O: OrderRepository + RecommendationRepository,
{
    let orders = state.manage_orders.pending_orders(query.executed).await?;
    Ok((StatusCode::OK, Json(OrdersResponseDto::from_orders(&orders))))
}

async fn get_order<S, O>(
    State(state): State<AppState<S, O>>,
    Path(id): Path<i64>,
) -> ApiResult<OrderDto>
where
    S: BrokerSession,
    O: OrderRepository + RecommendationRepository,
{
    let order = state.manage_orders.get(OrderId::new(id)).await?;
    Ok((StatusCode::OK, Json(OrderDto::from_order(&order))))
}

async fn update_quantity<S, O>(
    State(state): State<AppState<S, O>>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateQuantityDto>, JsonRejection>,
) -> ApiResult<OrderDto>
where
    S: BrokerSession,
    O: OrderRepository + RecommendationRepository,
{
    let request = json_body(payload)?;
    let order = state
        .manage_orders
        .update_quantity(OrderId::new(id), &request)
        .await?;
    Ok((StatusCode::OK, Json(OrderDto::from_order(&order))))
}

async fn delete_order<S, O>(
    State(state): State<AppState<S, O>>,
    Path(id): Path<i64>,
) -> ApiResult<DeleteOrderResponse>
where
    S: BrokerSession,
    O: OrderRepository + RecommendationRepository,
{
    let order_id = OrderId::new(id);
    state.manage_orders.delete(order_id).await?;
    Ok((
        StatusCode::OK,
        Json(DeleteOrderResponse {
            success: true,
            order_id,
        }),
    ))
}

async fn execute_order<S, O>(
    State(state): State<AppState<S, O>>,
    Path(id): Path<i64>,
) -> ApiResult<OrderActionResponseDto>
where
    S: BrokerSession,
    O: OrderRepository + RecommendationRepository,
{
    let order = state
        .execute_order
        .execute(OrderId::new(id))
        .await
        .map_err(|e| match e {
            LifecycleError::NotConnected => {
                EngineError::from(e).with_status(StatusCode::INTERNAL_SERVER_ERROR)
            }
            other => EngineError::from(other),
        })?;

    let message = if order.is_mock {
        "Mock order filled"
    } else {
        "Order submitted"
    };
    Ok((
        StatusCode::OK,
        Json(OrderActionResponseDto {
            success: true,
            message: message.to_string(),
            order: OrderDto::from_order(&order),
        }),
    ))
}

async fn cancel_order<S, O>(
    State(state): State<AppState<S, O>>,
    Path(id): Path<i64>,
) -> ApiResult<OrderActionResponseDto>
where
    S: BrokerSession,
    O: OrderRepository + RecommendationRepository,
{
    let outcome = state.cancel_order.execute(OrderId::new(id)).await?;
    let message = match &outcome {
        CancelOutcome::Cancelled(_) => "Order cancelled",
        CancelOutcome::Requested(_) => "Cancel requested, awaiting venue confirmation",
    };
    Ok((
        StatusCode::OK,
        Json(OrderActionResponseDto {
            success: true,
            message: message.to_string(),
            order: OrderDto::from_order(outcome.order()),
        }),
    ))
}

async fn rollover_order<S, O>(
    State(state): State<AppState<S, O>>,
    payload: Result<Json<RolloverRequestDto>, JsonRejection>,
) -> ApiResult<RolloverResponseDto>
where
    S: BrokerSession,
    O: OrderRepository + RecommendationRepository,
{
    let request = json_body(payload)?;
    let result = state.rollover_order.execute(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(RolloverResponseDto {
            success: true,
            prior_order_id: result.prior.id,
            order_id: result.order_id,
        }),
    ))
}

async fn stock_price<S, O>(
    State(state): State<AppState<S, O>>,
    Query(query): Query<StockPriceQuery>,
) -> ApiResult<StockPriceResponseDto>
where
    S: BrokerSession,
    O: OrderRepository + RecommendationRepository,
{
    let tickers = query.tickers();
    if tickers.is_empty() {
        return Err(EngineError::validation("tickers", "No tickers provided"));
    }

    let mut data = BTreeMap::new();
    for ticker in tickers {
        let price = state.session.get_price(&ticker).await;
        data.insert(ticker, price);
    }
    Ok((StatusCode::OK, Json(StockPriceResponseDto::success(data))))
}

async fn otm_options<S, O>(
    State(state): State<AppState<S, O>>,
    Query(query): Query<OtmQuery>,
) -> ApiResult<OtmOptionsResponseDto>
where
    S: BrokerSession,
    O: OrderRepository + RecommendationRepository,
{
    let scan = query.validated().map_err(LifecycleError::from)?;
    let data = state.scan_otm.scan(&scan).await;
    Ok((
        StatusCode::OK,
        Json(OtmOptionsResponseDto {
            status: "success".to_string(),
            data,
        }),
    ))
}

async fn expirations<S, O>(
    State(state): State<AppState<S, O>>,
    Query(query): Query<ExpirationsQuery>,
) -> ApiResult<ExpirationsResponseDto>
where
    S: BrokerSession,
    O: OrderRepository + RecommendationRepository,
{
    let weeks = query.weeks().map_err(LifecycleError::from)?;
    let today = to_eastern(state.clock.now()).date();
    Ok((
        StatusCode::OK,
        Json(ExpirationsResponseDto {
            weekly: upcoming_expirations(today, weeks)
                .into_iter()
                .map(format_expiration)
                .collect(),
            monthly: format_expiration(next_monthly_expiration(today)),
        }),
    ))
}

async fn strikes<S, O>(
    State(_state): State<AppState<S, O>>,
    Query(query): Query<StrikesQuery>,
) -> ApiResult<StrikesResponseDto>
where
    S: BrokerSession,
    O: OrderRepository + RecommendationRepository,
{
    let (price, interval, count) = query.validated().map_err(LifecycleError::from)?;
    Ok((
        StatusCode::OK,
        Json(StrikesResponseDto {
            strikes: strikes_around_price(price, interval, count),
        }),
    ))
}

async fn save_recommendation<S, O>(
    State(state): State<AppState<S, O>>,
    payload: Result<Json<NewRecommendation>, JsonRejection>,
) -> ApiResult<RecommendationCreatedResponse>
where
    S: BrokerSession,
    O: OrderRepository + RecommendationRepository,
{
    let candidate = json_body(payload)?
        .validated()
        .map_err(LifecycleError::from)?;
    let recommendation_id = state
        .store
        .save_recommendation(&candidate)
        .await
        .map_err(LifecycleError::from)?;
    tracing::info!(
        recommendation_id = %recommendation_id,
        ticker = %candidate.ticker,
        "Recommendation stored"
    );
    Ok((
        StatusCode::CREATED,
        Json(RecommendationCreatedResponse {
            success: true,
            recommendation_id,
        }),
    ))
}

async fn list_recommendations<S, O>(
    State(state): State<AppState<S, O>>,
    Query(query): Query<RecommendationsQuery>,
) -> ApiResult<RecommendationsResponseDto>
where
    S: BrokerSession,
    O: OrderRepository + RecommendationRepository,
{
    let ticker = query
        .ticker
        .as_deref()
        .map(|t| t.trim().to_ascii_uppercase())
        .filter(|t| !t.is_empty());
    let recommendations = state
        .store
        .recent_recommendations(ticker.as_deref(), query.limit())
        .await
        .map_err(LifecycleError::from)?;
    Ok((
        StatusCode::OK,
        Json(RecommendationsResponseDto { recommendations }),
    ))
}
