//! Withdrawal handler
//!
//! Settles withdrawals over exactly one of three mutually exclusive
//! rails, in precedence order: a supplied Lightning invoice, an
//! LNURL-withdraw access point, or a fiat offramp swap. The balance is
//! always recomputed fresh at the start of the call, and every monetary
//! guard runs before any rail is charged.

use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, Utc};
use serde_json::json;

use crate::config::SettlementSettings;
use crate::domain::{
    Msats, NewTransaction, Transaction, TransactionPatch, TransactionStatus, TransactionType,
};
use crate::error::{AppError, AppResult};
use crate::ledger::LedgerService;
use crate::metrics::{MetricsSink, OperationMetric, SettlementMethod};
use crate::quote::{OfframpSwapRequest, QuoteProvider};
use crate::rail::PaymentRail;
use crate::store::TransactionStore;

use super::commands::{ContinueWithdrawCommand, WithdrawCommand};
use super::{wallet_snapshot, WalletSnapshot, DEFAULT_WITHDRAW_REFERENCE};

/// Handler for wallet withdrawals
#[derive(Clone)]
pub struct WithdrawHandler {
    store: Arc<dyn TransactionStore>,
    quotes: Arc<dyn QuoteProvider>,
    rail: Arc<dyn PaymentRail>,
    metrics: Arc<dyn MetricsSink>,
    ledger: LedgerService,
    settings: SettlementSettings,
}

/// Rail-side artifacts of a withdrawal, shared between the initial call
/// and continuation.
struct PreparedWithdrawal {
    amount_msats: Msats,
    amount_fiat: Option<rust_decimal::Decimal>,
    currency: Option<String>,
    payment_tracker: String,
    lightning_payload: serde_json::Value,
    status: TransactionStatus,
}

impl WithdrawHandler {
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

    /// Execute a withdrawal and return the caller's refreshed wallet view
    /// with the new transaction surfaced first.
    pub async fn execute(&self, command: WithdrawCommand) -> AppResult<WalletSnapshot> {
        let started = Instant::now();
        let result = self.withdraw(&command).await;

        self.metrics.record(OperationMetric {
            user_id: command.user_id,
            amount_msats: result.as_ref().ok().map(|tx| tx.amount_msats.value()),
            amount_fiat: command.amount_fiat,
            method: method_of(&command),
            success: result.is_ok(),
            duration: started.elapsed(),
            error_type: result.as_ref().err().map(|e| e.kind().to_string()),
        });

        let tx = result?;
        wallet_snapshot(&self.ledger, command.user_id, tx.id, command.pagination).await
    }

    /// Resume an incomplete withdrawal in place.
    ///
    /// Stricter than deposit continuation: only a pending withdrawal is
    /// resumable. A processing, complete, or failed one is refused.
    pub async fn resume(&self, command: ContinueWithdrawCommand) -> AppResult<WalletSnapshot> {
        let started = Instant::now();
        let as_withdraw = command.as_withdraw();
        let result = self.continue_withdraw(&command, &as_withdraw).await;

        self.metrics.record(OperationMetric {
            user_id: command.user_id,
            amount_msats: result.as_ref().ok().map(|tx| tx.amount_msats.value()),
            amount_fiat: command.amount_fiat,
            method: method_of(&as_withdraw),
            success: result.is_ok(),
            duration: started.elapsed(),
            error_type: result.as_ref().err().map(|e| e.kind().to_string()),
        });

        let tx = result?;
        wallet_snapshot(&self.ledger, command.user_id, tx.id, command.pagination).await
    }

    async fn withdraw(&self, command: &WithdrawCommand) -> AppResult<Transaction> {
        let reference = command
            .reference
            .clone()
            .unwrap_or_else(|| DEFAULT_WITHDRAW_REFERENCE.to_string());

        let prepared = self.prepare(command, &reference).await?;

        let tx = self
            .store
            .create(NewTransaction {
                user_id: command.user_id,
                tx_type: TransactionType::Withdraw,
                amount_msats: prepared.amount_msats,
                amount_fiat: prepared.amount_fiat,
                currency: prepared.currency,
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
            "Withdrawal initiated"
        );
        Ok(tx)
    }

    async fn continue_withdraw(
        &self,
        command: &ContinueWithdrawCommand,
        as_withdraw: &WithdrawCommand,
    ) -> AppResult<Transaction> {
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
        if existing.status != TransactionStatus::Pending {
            return Err(AppError::TransactionState(format!(
                "transaction {} is {} and cannot be resumed",
                existing.id, existing.status
            )));
        }

        let prepared = self.prepare(as_withdraw, &existing.reference).await?;

        let updated = self
            .store
            .update(
                existing.id,
                existing.version,
                TransactionPatch {
                    amount_msats: Some(prepared.amount_msats),
                    amount_fiat: prepared.amount_fiat,
                    currency: prepared.currency,
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
            "Withdrawal resumed"
        );
        Ok(updated)
    }

    /// Select and execute the settlement rail. The returned amount always
    /// has the rail fee folded in.
    async fn prepare(
        &self,
        command: &WithdrawCommand,
        reference: &str,
    ) -> AppResult<PreparedWithdrawal> {
        let balance = self.ledger.current_balance(command.user_id).await;

        if let Some(invoice) = &command.lightning {
            self.pay_invoice(invoice, balance).await
        } else if command.lnurl {
            self.mint_lnurl_point(command, reference, balance).await
        } else if let Some(offramp) = &command.offramp {
            let amount_fiat = command.amount_fiat.ok_or_else(|| {
                AppError::Validation("offramp withdrawal requires a fiat amount".to_string())
            })?;
            self.offramp_swap(offramp, amount_fiat, reference, balance).await
        } else {
            Err(AppError::Validation(
                "no withdrawal method supplied".to_string(),
            ))
        }
    }

    /// Direct Lightning withdrawal: decode, check balance, pay.
    async fn pay_invoice(&self, invoice: &str, balance: i64) -> AppResult<PreparedWithdrawal> {
        let decoded = self.rail.decode(invoice).await?;
        if decoded.amount_msats.value() > balance {
            return Err(AppError::InsufficientFunds {
                available_msats: balance,
                requested_msats: decoded.amount_msats.value(),
            });
        }

        let payment = self.rail.pay(invoice).await?;
        let amount_msats = decoded.amount_msats.checked_add(payment.fee_msats)?;

        Ok(PreparedWithdrawal {
            amount_msats,
            amount_fiat: None,
            currency: None,
            payment_tracker: payment.operation_id,
            lightning_payload: json!({
                "invoice": invoice,
                "payment_hash": decoded.payment_hash,
                "fee_msats": payment.fee_msats.value(),
            }),
            status: TransactionStatus::Complete,
        })
    }

    /// LNURL-withdraw: mint an access point capped at the withdrawable
    /// amount. The recorded amount is provisional until claimed.
    async fn mint_lnurl_point(
        &self,
        command: &WithdrawCommand,
        reference: &str,
        balance: i64,
    ) -> AppResult<PreparedWithdrawal> {
        let requested = match command.amount_fiat {
            Some(amount_fiat) => {
                let quote = self
                    .quotes
                    .get_quote(&self.settings.default_currency, "BTC", amount_fiat)
                    .await?;
                Msats::from_fiat(amount_fiat, quote.rate)?.value()
            }
            None => balance,
        };

        let max_msats = requested.min(balance);
        if max_msats <= 0 {
            return Err(AppError::Validation(
                "nothing withdrawable: the claimable amount is zero".to_string(),
            ));
        }

        let max = Msats::new(max_msats)?;
        let min = Msats::new(self.settings.min_withdrawable_msats.min(max_msats))?;
        let expires_at =
            Utc::now() + Duration::seconds(self.settings.lnurl_withdraw_expiry_secs as i64);

        let point = self
            .rail
            .create_lnurl_withdraw_point(max, min, reference, expires_at)
            .await?;

        Ok(PreparedWithdrawal {
            // Provisional; corrected when the point is claimed.
            amount_msats: max,
            amount_fiat: command.amount_fiat,
            currency: command
                .amount_fiat
                .map(|_| self.settings.default_currency.clone()),
            payment_tracker: point.k1.clone(),
            lightning_payload: serde_json::to_value(&point)?,
            status: TransactionStatus::Pending,
        })
    }

    /// Fiat offramp: quote, check balance, create the swap, then fund its
    /// settlement invoice.
    async fn offramp_swap(
        &self,
        offramp: &super::commands::OfframpTarget,
        amount_fiat: rust_decimal::Decimal,
        reference: &str,
        balance: i64,
    ) -> AppResult<PreparedWithdrawal> {
        let currency = offramp
            .currency
            .clone()
            .unwrap_or_else(|| self.settings.default_currency.clone());

        let quote = self.quotes.get_quote("BTC", &currency, amount_fiat).await?;
        let requested = Msats::from_fiat(amount_fiat, quote.rate)?;
        if requested.value() > balance {
            return Err(AppError::InsufficientFunds {
                available_msats: balance,
                requested_msats: requested.value(),
            });
        }

        let swap = self
            .quotes
            .create_offramp_swap(OfframpSwapRequest {
                quote_id: Some(quote.id),
                amount_fiat,
                currency: currency.clone(),
                reference: reference.to_string(),
                target_account: offramp.account.clone(),
            })
            .await?;

        let decoded = self.rail.decode(&swap.lightning_invoice).await?;
        let payment = self.rail.pay(&swap.lightning_invoice).await?;
        let amount_msats = decoded.amount_msats.checked_add(payment.fee_msats)?;

        Ok(PreparedWithdrawal {
            amount_msats,
            amount_fiat: Some(amount_fiat),
            currency: Some(currency),
            payment_tracker: swap.id,
            lightning_payload: json!({
                "invoice": swap.lightning_invoice,
                "payment_hash": decoded.payment_hash,
                "fee_msats": payment.fee_msats.value(),
            }),
            status: swap.status.into(),
        })
    }
}

fn method_of(command: &WithdrawCommand) -> SettlementMethod {
    if command.lightning.is_some() {
        SettlementMethod::Lightning
    } else if command.lnurl {
        SettlementMethod::LnurlWithdraw
    } else if command.offramp.is_some() {
        SettlementMethod::OfframpSwap
    } else {
        SettlementMethod::Unspecified
    }
}
