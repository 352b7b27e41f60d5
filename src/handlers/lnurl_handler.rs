//! LNURL-withdraw handler
//!
//! Claim-side of LNURL withdrawals: a third-party wallet scans the code,
//! presents its own invoice against the recorded `k1` nonce, and the
//! engine pays it. The webhook caller must always receive a response, so
//! `process_callback` converts every failure into a result object instead
//! of throwing.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::domain::{Transaction, TransactionPatch, TransactionStatus, TransactionType};
use crate::error::{AppError, AppResult};
use crate::metrics::{MetricsSink, OperationMetric, SettlementMethod};
use crate::rail::{LnurlWithdrawPoint, PaymentRail};
use crate::store::TransactionStore;

/// Handler for LNURL-withdraw claims and status reads
#[derive(Clone)]
pub struct LnurlWithdrawHandler {
    store: Arc<dyn TransactionStore>,
    rail: Arc<dyn PaymentRail>,
    metrics: Arc<dyn MetricsSink>,
}

/// Outcome reported back to the redeeming wallet's webhook call.
#[derive(Debug, Clone, Serialize)]
pub struct LnurlCallbackResult {
    pub success: bool,
    pub message: String,
}

impl LnurlWithdrawHandler {
    pub fn new(
        store: Arc<dyn TransactionStore>,
        rail: Arc<dyn PaymentRail>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            store,
            rail,
            metrics,
        }
    }

    /// Settle a claim against a minted withdraw point.
    ///
    /// Never fails: errors are caught and reported as
    /// `{success: false, message}` so the unauthenticated webhook caller
    /// can always respond to the redeeming wallet.
    pub async fn process_callback(&self, k1: &str, payment_request: &str) -> LnurlCallbackResult {
        let started = Instant::now();
        match self.claim(k1, payment_request).await {
            Ok(tx) => {
                self.metrics.record(OperationMetric {
                    user_id: tx.user_id,
                    amount_msats: Some(tx.amount_msats.value()),
                    amount_fiat: tx.amount_fiat,
                    method: SettlementMethod::LnurlWithdraw,
                    success: true,
                    duration: started.elapsed(),
                    error_type: None,
                });
                LnurlCallbackResult {
                    success: true,
                    message: "withdrawal settled".to_string(),
                }
            }
            Err(e) => {
                tracing::warn!(k1, error = %e, "LNURL-withdraw claim failed");
                LnurlCallbackResult {
                    success: false,
                    message: e.to_string(),
                }
            }
        }
    }

    /// Read a withdrawal by id.
    pub async fn check_status(&self, withdraw_id: Uuid) -> AppResult<Transaction> {
        self.store
            .find_by_id(withdraw_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("transaction {withdraw_id}")))
    }

    /// Lookup restricted to pending withdrawals by `k1`, used by
    /// front-ends to validate a scan before claiming.
    ///
    /// Returns `None` (not an error) when nothing matches, and a state
    /// error when the record exists but is no longer claimable.
    pub async fn find_pending(&self, k1: &str) -> AppResult<Option<Transaction>> {
        let Some(tx) = self.store.find_by_tracker(k1).await? else {
            return Ok(None);
        };

        if tx.tx_type != TransactionType::Withdraw || tx.status != TransactionStatus::Pending {
            return Err(AppError::TransactionState(format!(
                "transaction {} is not a pending withdrawal",
                tx.id
            )));
        }
        Ok(Some(tx))
    }

    async fn claim(&self, k1: &str, payment_request: &str) -> AppResult<Transaction> {
        let tx = self
            .store
            .find_by_tracker(k1)
            .await?
            .filter(|tx| {
                tx.tx_type == TransactionType::Withdraw
                    && tx.status == TransactionStatus::Pending
            })
            .ok_or_else(|| {
                AppError::NotFound(format!("no claimable withdrawal for k1 {k1}"))
            })?;

        let point: LnurlWithdrawPoint = serde_json::from_value(tx.lightning_payload.clone())?;
        if point.expires_at < Utc::now() {
            return Err(AppError::Validation(
                "withdraw point has expired".to_string(),
            ));
        }

        let decoded = self.rail.decode(payment_request).await?;
        // The recorded provisional amount is the authorized maximum.
        if decoded.amount_msats > tx.amount_msats {
            return Err(AppError::Validation(format!(
                "requested {} exceeds the authorized maximum {}",
                decoded.amount_msats, tx.amount_msats
            )));
        }

        let payment = self.rail.pay(payment_request).await?;
        let final_amount = decoded.amount_msats.checked_add(payment.fee_msats)?;

        // Conditional on the version read above: a racing claim or
        // reconciliation event surfaces a conflict instead of a double
        // settlement.
        let updated = self
            .store
            .update(
                tx.id,
                tx.version,
                TransactionPatch {
                    amount_msats: Some(final_amount),
                    status: Some(TransactionStatus::Complete),
                    lightning_payload: Some(json!({
                        "point": point,
                        "claim_operation_id": payment.operation_id,
                        "payment_hash": decoded.payment_hash,
                        "fee_msats": payment.fee_msats.value(),
                    })),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(
            tx_id = %updated.id,
            amount = %updated.amount_msats,
            "LNURL withdrawal claimed"
        );
        Ok(updated)
    }
}
