//! API Routes
//!
//! HTTP endpoint definitions.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Transaction, TransactionStatus};
use crate::error::AppError;
use crate::events::{EventSender, WalletEvent};
use crate::handlers::{
    ContinueDepositCommand, ContinueWithdrawCommand, DepositCommand, DepositHandler,
    LnurlWithdrawHandler, OfframpTarget, OnrampPayment, UpdateTransactionCommand,
    UpdateTransactionHandler, WalletSnapshot, WithdrawCommand, WithdrawHandler,
};
use crate::ledger::{LedgerService, Pagination, TxLedger, WalletMeta};
use crate::metrics::{MetricsSink, OperationMetric, SettlementMethod};

/// Shared handler state behind the router.
#[derive(Clone)]
pub struct AppState {
    pub deposits: DepositHandler,
    pub withdrawals: WithdrawHandler,
    pub lnurl: LnurlWithdrawHandler,
    pub updates: UpdateTransactionHandler,
    pub ledger: LedgerService,
    pub metrics: Arc<dyn MetricsSink>,
    pub events: EventSender,
}

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct OnrampRequest {
    #[serde(default)]
    pub currency: Option<String>,
    pub origin_account: String,
}

#[derive(Debug, Deserialize)]
pub struct OfframpRequest {
    #[serde(default)]
    pub currency: Option<String>,
    pub account: String,
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub user_id: Uuid,
    pub amount_fiat: Decimal,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub onramp: Option<OnrampRequest>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
pub struct ContinueDepositRequest {
    pub user_id: Uuid,
    pub amount_fiat: Decimal,
    #[serde(default)]
    pub onramp: Option<OnrampRequest>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub amount_fiat: Option<Decimal>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub lightning: Option<String>,
    #[serde(default)]
    pub lnurl: bool,
    #[serde(default)]
    pub offramp: Option<OfframpRequest>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
pub struct ContinueWithdrawRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub amount_fiat: Option<Decimal>,
    #[serde(default)]
    pub lightning: Option<String>,
    #[serde(default)]
    pub lnurl: bool,
    #[serde(default)]
    pub offramp: Option<OfframpRequest>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTransactionRequest {
    #[serde(default)]
    pub status: Option<TransactionStatus>,
    #[serde(default)]
    pub lightning_payload: Option<serde_json::Value>,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub size: usize,
}

fn default_page_size() -> usize {
    10
}

#[derive(Debug, Deserialize)]
pub struct LnurlScanQuery {
    pub k1: String,
}

#[derive(Debug, Deserialize)]
pub struct LnurlCallbackQuery {
    pub k1: String,
    /// The redeeming wallet's payment request.
    pub pr: String,
}

/// LNURL wire response; the redeeming wallet expects exactly this shape.
#[derive(Debug, Serialize)]
pub struct LnurlWireResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        // Deposits
        .route("/wallet/deposits", post(deposit))
        .route("/wallet/deposits/:tx_id/continue", post(continue_deposit))
        // Withdrawals
        .route("/wallet/withdrawals", post(withdraw))
        .route("/wallet/withdrawals/:tx_id/continue", post(continue_withdraw))
        .route("/wallet/withdrawals/:tx_id", get(withdraw_status))
        // Ledger & balance
        .route("/wallet/:user_id/ledger", get(user_ledger))
        .route("/wallet/:user_id/meta", get(wallet_meta))
        // Internal transaction update
        .route("/wallet/transactions/:tx_id", patch(update_transaction))
        // LNURL-withdraw scan + claim (called by external wallets)
        .route("/lnurl/withdraw", get(lnurl_scan))
        .route("/lnurl/withdraw/callback", get(lnurl_callback))
        // Rail event webhooks
        .route("/webhooks/events", post(ingest_event))
}

// =========================================================================
// Deposits
// =========================================================================

async fn deposit(
    State(state): State<AppState>,
    Json(request): Json<DepositRequest>,
) -> Result<(StatusCode, Json<WalletSnapshot>), AppError> {
    let mut command = DepositCommand::new(request.user_id, request.amount_fiat);
    command.reference = request.reference;
    command.onramp = request.onramp.map(onramp_payment);
    command.pagination = request.pagination;

    let snapshot = state.deposits.execute(command).await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

async fn continue_deposit(
    State(state): State<AppState>,
    Path(tx_id): Path<Uuid>,
    Json(request): Json<ContinueDepositRequest>,
) -> Result<Json<WalletSnapshot>, AppError> {
    let mut command = ContinueDepositCommand::new(request.user_id, tx_id, request.amount_fiat);
    command.onramp = request.onramp.map(onramp_payment);
    command.pagination = request.pagination;

    let snapshot = state.deposits.resume(command).await?;
    Ok(Json(snapshot))
}

// =========================================================================
// Withdrawals
// =========================================================================

async fn withdraw(
    State(state): State<AppState>,
    Json(request): Json<WithdrawRequest>,
) -> Result<(StatusCode, Json<WalletSnapshot>), AppError> {
    let mut command = WithdrawCommand::new(request.user_id);
    command.amount_fiat = request.amount_fiat;
    command.reference = request.reference;
    command.lightning = request.lightning;
    command.lnurl = request.lnurl;
    command.offramp = request.offramp.map(offramp_target);
    command.pagination = request.pagination;

    let snapshot = state.withdrawals.execute(command).await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

async fn continue_withdraw(
    State(state): State<AppState>,
    Path(tx_id): Path<Uuid>,
    Json(request): Json<ContinueWithdrawRequest>,
) -> Result<Json<WalletSnapshot>, AppError> {
    let mut command = ContinueWithdrawCommand::new(request.user_id, tx_id);
    command.amount_fiat = request.amount_fiat;
    command.lightning = request.lightning;
    command.lnurl = request.lnurl;
    command.offramp = request.offramp.map(offramp_target);
    command.pagination = request.pagination;

    let snapshot = state.withdrawals.resume(command).await?;
    Ok(Json(snapshot))
}

async fn withdraw_status(
    State(state): State<AppState>,
    Path(tx_id): Path<Uuid>,
) -> Result<Json<Transaction>, AppError> {
    let tx = state.lnurl.check_status(tx_id).await?;
    Ok(Json(tx))
}

// =========================================================================
// Ledger & balance
// =========================================================================

async fn user_ledger(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<TxLedger>, AppError> {
    let pagination = Pagination {
        page: query.page,
        size: query.size,
    };
    let ledger = state
        .ledger
        .paginated_ledger(user_id, pagination, None)
        .await?;
    Ok(Json(ledger))
}

async fn wallet_meta(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Json<WalletMeta> {
    let started = Instant::now();
    let meta = state.ledger.wallet_meta(user_id).await;

    state.metrics.record(OperationMetric {
        user_id,
        amount_msats: Some(meta.current_balance_msats),
        amount_fiat: None,
        method: SettlementMethod::BalanceRead,
        success: true,
        duration: started.elapsed(),
        error_type: None,
    });

    Json(meta)
}

// =========================================================================
// Internal transaction update
// =========================================================================

async fn update_transaction(
    State(state): State<AppState>,
    Path(tx_id): Path<Uuid>,
    Json(request): Json<UpdateTransactionRequest>,
) -> Result<Json<WalletSnapshot>, AppError> {
    let command = UpdateTransactionCommand {
        tx_id,
        status: request.status,
        lightning_payload: request.lightning_payload,
        reference: request.reference,
        pagination: None,
    };
    let snapshot = state.updates.execute(command).await?;
    Ok(Json(snapshot))
}

// =========================================================================
// LNURL-withdraw
// =========================================================================

/// Pre-claim scan validation. Returns `null` when nothing matches the
/// `k1`, the pending withdrawal when one does.
async fn lnurl_scan(
    State(state): State<AppState>,
    Query(query): Query<LnurlScanQuery>,
) -> Result<Json<Option<Transaction>>, AppError> {
    let tx = state.lnurl.find_pending(&query.k1).await?;
    Ok(Json(tx))
}

/// Claim callback hit by the redeeming wallet. Always answers in the
/// LNURL wire format, never with a transport error.
async fn lnurl_callback(
    State(state): State<AppState>,
    Query(query): Query<LnurlCallbackQuery>,
) -> Json<LnurlWireResponse> {
    let result = state.lnurl.process_callback(&query.k1, &query.pr).await;

    Json(if result.success {
        LnurlWireResponse {
            status: "OK",
            reason: None,
        }
    } else {
        LnurlWireResponse {
            status: "ERROR",
            reason: Some(result.message),
        }
    })
}

// =========================================================================
// Rail event webhooks
// =========================================================================

/// Accept a rail confirmation event onto the reconciliation channel.
async fn ingest_event(
    State(state): State<AppState>,
    Json(event): Json<WalletEvent>,
) -> StatusCode {
    tracing::debug!(event = event.name(), "Rail event received");
    if state.events.send(event).await.is_err() {
        tracing::error!("Event channel closed, dropping rail event");
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    StatusCode::ACCEPTED
}

fn onramp_payment(request: OnrampRequest) -> OnrampPayment {
    OnrampPayment {
        currency: request.currency,
        origin_account: request.origin_account,
    }
}

fn offramp_target(request: OfframpRequest) -> OfframpTarget {
    OfframpTarget {
        currency: request.currency,
        account: request.account,
    }
}
