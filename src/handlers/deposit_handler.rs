//! Deposit handler
//!
//! Initiates and resumes wallet deposits. A deposit always starts from a
//! fiat amount: it is quoted into msats, an invoice is created for it, and
//! either the user pays the invoice directly or an onramp swap collects
//! fiat and settles the invoice itself.

use std::sync::Arc;
use std::time::Instant;

use serde_json::json;

use crate::config::SettlementSettings;
use crate::domain::{
    Msats, NewTransaction, Transaction, TransactionPatch, TransactionStatus, TransactionType,
};
use crate::error::{AppError, AppResult};
use crate::ledger::LedgerService;
use crate::metrics::{MetricsSink, OperationMetric, SettlementMethod};
use crate::quote::{OnrampSwapRequest, QuoteProvider};
use crate::rail::{PaymentContext, PaymentRail};
use crate::store::TransactionStore;

use super::commands::{ContinueDepositCommand, DepositCommand, OnrampPayment};
use super::{wallet_snapshot, WalletSnapshot, DEFAULT_DEPOSIT_REFERENCE};

/// Handler for wallet deposits
#[derive(Clone)]
pub struct DepositHandler {
    store: Arc<dyn TransactionStore>,
    quotes: Arc<dyn QuoteProvider>,
    rail: Arc<dyn PaymentRail>,
    metrics: Arc<dyn MetricsSink>,
    ledger: LedgerService,
    settings: SettlementSettings,
}

/// Rail-side artifacts of a deposit, shared between the initial call and
/// continuation.
struct PreparedDeposit {
    amount_msats: Msats,
    currency: String,
    payment_tracker: String,
    lightning_payload: serde_json::Value,
    status: TransactionStatus,
}

impl DepositHandler {
    pub fn new(
        store: Arc<dyn TransactionStore>,
        quotes: Arc<dyn QuoteProvider>,
        rail: Arc<dyn PaymentRail>,
        metrics: Arc<dyn MetricsSink>,
        settings: SettlementSettings,
    ) -> Self {
        Self {
            ledger: LedgerService::new(store.clone()),
            store,
            quotes,
            rail,
            metrics,
            settings,
        }
    }

    /// Execute a deposit and return the caller's refreshed wallet view
    /// with the new transaction surfaced first.
    pub async fn execute(&self, command: DepositCommand) -> AppResult<WalletSnapshot> {
        let started = Instant::now();
        let result = self.deposit(&command).await;

        self.metrics.record(OperationMetric {
            user_id: command.user_id,
            amount_msats: result.as_ref().ok().map(|tx| tx.amount_msats.value()),
            amount_fiat: Some(command.amount_fiat),
            method: method_of(command.onramp.as_ref()),
            success: result.is_ok(),
            duration: started.elapsed(),
            error_type: result.as_ref().err().map(|e| e.kind().to_string()),
        });

        let tx = result?;
        wallet_snapshot(&self.ledger, command.user_id, tx.id, command.pagination).await
    }

    /// Resume an incomplete deposit, overwriting the existing record's
    /// amount, payload, tracker, and status in place.
    ///
    /// # Errors
    /// - `AppError::Unauthorized` if the transaction belongs to another user
    /// - `AppError::TransactionState` if it is already complete or still
    ///   processing (pending and failed deposits are resumable)
    pub async fn resume(&self, command: ContinueDepositCommand) -> AppResult<WalletSnapshot> {
        let started = Instant::now();
        let result = self.continue_deposit(&command).await;

        self.metrics.record(OperationMetric {
            user_id: command.user_id,
            amount_msats: result.as_ref().ok().map(|tx| tx.amount_msats.value()),
            amount_fiat: Some(command.amount_fiat),
            method: method_of(command.onramp.as_ref()),
            success: result.is_ok(),
            duration: started.elapsed(),
            error_type: result.as_ref().err().map(|e| e.kind().to_string()),
        });

        let tx = result?;
        wallet_snapshot(&self.ledger, command.user_id, tx.id, command.pagination).await
    }

    async fn deposit(&self, command: &DepositCommand) -> AppResult<Transaction> {
        if command.amount_fiat <= rust_decimal::Decimal::ZERO {
            return Err(AppError::Validation(
                "deposit amount must be positive".to_string(),
            ));
        }

        let reference = command
            .reference
            .clone()
            .unwrap_or_else(|| DEFAULT_DEPOSIT_REFERENCE.to_string());

        let prepared = self
            .prepare(command.amount_fiat, &reference, command.onramp.as_ref())
            .await?;

        let tx = self
            .store
            .create(NewTransaction {
                user_id: command.user_id,
                tx_type: TransactionType::Deposit,
                amount_msats: prepared.amount_msats,
                amount_fiat: Some(command.amount_fiat),
                currency: Some(prepared.currency),
                payment_tracker: prepared.payment_tracker,
                lightning_payload: prepared.lightning_payload,
                status: prepared.status,
                reference,
            })
            .await?;

        tracing::info!(
            tx_id = %tx.id,
            user_id = %tx.user_id,
            amount = %tx.amount_msats,
            status = %tx.status,
            "Deposit initiated"
        );
        Ok(tx)
    }

    async fn continue_deposit(&self, command: &ContinueDepositCommand) -> AppResult<Transaction> {
        let existing = self
            .store
            .find_by_id(command.tx_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("transaction {}", command.tx_id)))?;

        if existing.user_id != command.user_id {
            return Err(AppError::Unauthorized(
                "transaction does not belong to the caller".to_string(),
            ));
        }
        match existing.status {
            TransactionStatus::Complete => {
                return Err(AppError::TransactionState(format!(
                    "transaction {} is already complete",
                    existing.id
                )));
            }
            TransactionStatus::Processing => {
                return Err(AppError::TransactionState(format!(
                    "transaction {} is still processing",
                    existing.id
                )));
            }
            _ => {}
        }

        let prepared = self
            .prepare(command.amount_fiat, &existing.reference, command.onramp.as_ref())
            .await?;

        let updated = self
            .store
            .update(
                existing.id,
                existing.version,
                TransactionPatch {
                    amount_msats: Some(prepared.amount_msats),
                    amount_fiat: Some(command.amount_fiat),
                    currency: Some(prepared.currency),
                    payment_tracker: Some(prepared.payment_tracker),
                    lightning_payload: Some(prepared.lightning_payload),
                    status: Some(prepared.status),
                    reference: None,
                },
            )
            .await?;

        tracing::info!(
            tx_id = %updated.id,
            amount = %updated.amount_msats,
            status = %updated.status,
            "Deposit resumed"
        );
        Ok(updated)
    }

    /// Quote the fiat amount, create an invoice for it, and pick the rail:
    /// an onramp swap that settles the invoice, or the invoice itself with
    /// an inbound-payment registration.
    async fn prepare(
        &self,
        amount_fiat: rust_decimal::Decimal,
        reference: &str,
        onramp: Option<&OnrampPayment>,
    ) -> AppResult<PreparedDeposit> {
        let currency = onramp
            .and_then(|o| o.currency.clone())
            .unwrap_or_else(|| self.settings.default_currency.clone());

        let quote = self.quotes.get_quote(&currency, "BTC", amount_fiat).await?;
        let amount_msats = Msats::from_fiat(amount_fiat, quote.rate)?;
        let invoice = self.rail.invoice(amount_msats, reference).await?;

        match onramp {
            Some(onramp) => {
                let swap = self
                    .quotes
                    .create_onramp_swap(OnrampSwapRequest {
                        quote_id: Some(quote.id),
                        amount_fiat,
                        currency: currency.clone(),
                        reference: reference.to_string(),
                        origin_account: onramp.origin_account.clone(),
                        target_invoice: invoice.invoice.clone(),
                    })
                    .await?;

                Ok(PreparedDeposit {
                    amount_msats,
                    currency,
                    payment_tracker: swap.id,
                    lightning_payload: json!({ "invoice": invoice }),
                    status: swap.status.into(),
                })
            }
            None => {
                // The swap settles its own invoice; an inbound-payment
                // listener is only needed when the user pays directly.
                if let Err(e) = self
                    .rail
                    .receive(PaymentContext::Deposit, &invoice.operation_id)
                    .await
                {
                    tracing::warn!(
                        operation_id = %invoice.operation_id,
                        error = %e,
                        "Inbound payment registration failed"
                    );
                }

                Ok(PreparedDeposit {
                    amount_msats,
                    currency,
                    payment_tracker: invoice.operation_id.clone(),
                    lightning_payload: json!({ "invoice": invoice }),
                    status: TransactionStatus::Pending,
                })
            }
        }
    }
}

fn method_of(onramp: Option<&OnrampPayment>) -> SettlementMethod {
    if onramp.is_some() {
        SettlementMethod::OnrampSwap
    } else {
        SettlementMethod::Lightning
    }
}
