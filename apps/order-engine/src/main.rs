//! Order Engine Binary
//!
//! Starts the options order engine against the paper venue.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin order-engine -- config/engine.yaml
//! ```
//!
//! # Environment Variables
//!
//! - `ORDER_ENGINE_CONFIG`: config file path when no argument is given
//! - `RUST_LOG`: overrides `observability.logging.level`
//!
//! Any `${VAR}` or `${VAR:-default}` reference inside the YAML file is
//! interpolated from the environment (after `.env` is loaded).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use order_engine::application::ports::BrokerSession;
use order_engine::application::services::{ReportConsumer, report_channel, spawn_reconciler};
use order_engine::application::use_cases::{CancelSettings, ReconcileUseCase};
use order_engine::config::{
    Config, config_path_from_args, load_config, validate_startup_environment,
};
use order_engine::domain::market_calendar::SystemClock;
use order_engine::infrastructure::http::{AppState, create_router};
use order_engine::infrastructure::persistence::SqliteOrderStore;
use order_engine::infrastructure::session::{ManagedSession, PaperVenue, SessionSupervisor};
use order_engine::observability::{MetricsConfig, init_metrics, init_tracing};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();

    let config_path = config_path_from_args(std::env::args().skip(1));
    let config = load_config(config_path.as_deref()).context("failed to load configuration")?;

    init_tracing(&config.observability.logging).context("failed to initialize logging")?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = config_path.as_deref().unwrap_or("<defaults>"),
        "Starting order engine"
    );

    let validation =
        validate_startup_environment(&config).context("startup validation failed")?;
    for warning in &validation.warnings {
        tracing::warn!(%warning, "Startup warning");
    }
    log_config(&config);

    if config.observability.metrics.enabled {
        let addr: SocketAddr = config
            .observability
            .metrics
            .listen_addr
            .parse()
            .context("invalid metrics listen address")?;
        init_metrics(&MetricsConfig::with_addr(addr))
            .context("failed to start metrics exporter")?;
    }

    let store = Arc::new(open_store(&config).await?);

    let shutdown = CancellationToken::new();
    let (report_tx, report_rx) = report_channel(config.execution.report_queue_capacity);

    let venue = PaperVenue::new(&config.session.paper, Some(report_tx));
    let session = Arc::new(ManagedSession::new(venue, &config.session));
    if !session.connect().await {
        tracing::warn!(
            host = %config.session.host,
            port = config.session.port,
            "Initial session connect failed; the supervisor will keep retrying"
        );
    }

    let consumer =
        ReportConsumer::new(Arc::clone(&store), report_rx, shutdown.clone()).spawn();

    let (supervisor, reconnects) =
        SessionSupervisor::new(Arc::clone(&session), &config.session, shutdown.clone());
    let supervisor = supervisor.spawn();

    let reconcile = Arc::new(ReconcileUseCase::new(Arc::clone(&session), Arc::clone(&store)));
    let reconciler = spawn_reconciler(
        reconcile,
        reconnects,
        config.execution.reconcile_on_startup,
        shutdown.clone(),
    );

    let cancel = CancelSettings {
        confirm_timeout: config.execution.cancel_confirm_timeout(),
        poll_interval: config.execution.cancel_poll_interval(),
    };
    let state = AppState::new(
        Arc::clone(&session),
        Arc::clone(&store),
        cancel,
        Arc::new(SystemClock),
        env!("CARGO_PKG_VERSION"),
    );
    let app = create_router(state);

    let addr = config.server.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "HTTP server listening");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            server_shutdown.cancel();
        })
        .await
        .context("HTTP server error")?;

    // The server can also stop on its own; make sure background tasks follow.
    shutdown.cancel();
    let grace = Duration::from_secs(config.server.shutdown_grace_secs);
    await_background(grace, supervisor, reconciler, consumer).await;

    session.disconnect().await;
    store.close().await;

    tracing::info!("Order engine stopped");
    Ok(())
}

/// Open the configured store.
async fn open_store(config: &Config) -> Result<SqliteOrderStore> {
    let persistence = &config.persistence;
    let store = if persistence.is_in_memory() {
        SqliteOrderStore::in_memory().await
    } else {
        SqliteOrderStore::open(
            &persistence.path(),
            persistence.max_connections,
            persistence.busy_timeout(),
        )
        .await
    };
    store.context("failed to open order store")
}

fn log_config(config: &Config) {
    tracing::info!(
        environment = %config.environment.mode,
        listen_addr = %config.server.listen_addr(),
        db_path = %config.persistence.db_path,
        session_host = %config.session.host,
        session_port = config.session.port,
        client_id = config.session.client_id,
        readonly = config.session.readonly,
        market_data_mode = %config.session.market_data_mode,
        metrics_enabled = config.observability.metrics.enabled,
        "Configuration loaded"
    );
}

/// Wait for background tasks, up to the grace period.
async fn await_background(
    grace: Duration,
    supervisor: JoinHandle<()>,
    reconciler: JoinHandle<()>,
    consumer: JoinHandle<usize>,
) {
    let joined = tokio::time::timeout(grace, async {
        let _ = supervisor.await;
        let _ = reconciler.await;
        consumer.await.unwrap_or_default()
    })
    .await;

    match joined {
        Ok(processed) => tracing::info!(processed, "Background tasks stopped"),
        Err(_) => tracing::warn!(
            grace_secs = grace.as_secs(),
            "Background tasks did not stop within the grace period"
        ),
    }
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
///
/// A handler that cannot be installed is logged and never resolves; the
/// other signal still works.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
