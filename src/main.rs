//! satswallet - Lightning-backed savings wallet settlement engine
//!
//! Accepts deposits and withdrawals in fiat and millisatoshis, routes
//! them across the Lightning, LNURL-withdraw, and fiat swap rails, and
//! reconciles asynchronous rail confirmations into the transaction
//! ledger.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
mod config;
mod db;
pub mod domain;
mod error;
pub mod events;
pub mod handlers;
pub mod ledger;
pub mod metrics;
pub mod quote;
pub mod rail;
pub mod reconcile;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult};

use api::AppState;
use handlers::{DepositHandler, LnurlWithdrawHandler, UpdateTransactionHandler, WithdrawHandler};
use ledger::LedgerService;
use metrics::{MetricsSink, TracingMetricsSink};
use quote::{HttpQuoteClient, QuoteProvider};
use rail::{HttpRailClient, PaymentRail};
use reconcile::Reconciler;
use store::{PgTransactionStore, TransactionStore};

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "satswallet=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing();

    // Load configuration
    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("Starting satswallet settlement engine");
    tracing::info!("Connecting to database...");

    // Create database pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    // Verify database schema
    if !db::check_schema(&pool).await? {
        tracing::error!("Database schema is not complete. Please run migrations.");
        return Err(anyhow::anyhow!("Database schema incomplete"));
    }

    tracing::info!("Database connected successfully");

    // Wire up the settlement collaborators
    let http = reqwest::Client::new();
    let store: Arc<dyn TransactionStore> = Arc::new(PgTransactionStore::new(pool.clone()));
    let quotes: Arc<dyn QuoteProvider> = Arc::new(HttpQuoteClient::new(
        http.clone(),
        config.swap_service_url.clone(),
    ));
    let rail: Arc<dyn PaymentRail> =
        Arc::new(HttpRailClient::new(http, config.ln_gateway_url.clone()));
    let metrics: Arc<dyn MetricsSink> = Arc::new(TracingMetricsSink);
    let settings = config.settlement_settings();

    // Rail events flow from the webhook routes into the reconciler
    let (event_tx, event_rx) = events::channel(config.event_channel_capacity);
    tokio::spawn(Reconciler::new(store.clone()).run(event_rx));

    let state = AppState {
        deposits: DepositHandler::new(
            store.clone(),
            quotes.clone(),
            rail.clone(),
            metrics.clone(),
            settings.clone(),
        ),
        withdrawals: WithdrawHandler::new(
            store.clone(),
            quotes.clone(),
            rail.clone(),
            metrics.clone(),
            settings,
        ),
        lnurl: LnurlWithdrawHandler::new(store.clone(), rail.clone(), metrics.clone()),
        updates: UpdateTransactionHandler::new(store.clone()),
        ledger: LedgerService::new(store),
        metrics,
        events: event_tx,
    };

    // Build router and start server
    let app = Router::new()
        .route("/health", axum::routing::get(health_check))
        .nest("/api/v1", api::create_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cleanup
    tracing::info!("Server shutting down...");
    pool.close().await;
    tracing::info!("Database connections closed. Goodbye!");

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
