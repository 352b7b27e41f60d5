//! Transaction update handler
//!
//! Generic partial-field merge used by internal callers. Re-reads the
//! owner's ledger and meta afterwards so callers always see a consistent
//! view.

use std::sync::Arc;

use crate::domain::TransactionPatch;
use crate::error::{AppError, AppResult};
use crate::ledger::LedgerService;
use crate::store::TransactionStore;

use super::commands::UpdateTransactionCommand;
use super::{wallet_snapshot, WalletSnapshot};

/// Handler for internal transaction updates
#[derive(Clone)]
pub struct UpdateTransactionHandler {
    store: Arc<dyn TransactionStore>,
    ledger: LedgerService,
}

impl UpdateTransactionHandler {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self {
            ledger: LedgerService::new(store.clone()),
            store,
        }
    }

    /// Apply a partial update and return the owner's refreshed wallet
    /// view.
    ///
    /// Status changes honor the forward-only lifecycle; setting the
    /// current status again is a no-op, not an error.
    pub async fn execute(&self, command: UpdateTransactionCommand) -> AppResult<WalletSnapshot> {
        let existing = self
            .store
            .find_by_id(command.tx_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("transaction {}", command.tx_id)))?;

        let status = match command.status {
            Some(next) if next == existing.status => None,
            Some(next) => {
                if !existing.status.can_transition_to(next) {
                    return Err(AppError::TransactionState(format!(
                        "transaction {} cannot move from {} to {}",
                        existing.id, existing.status, next
                    )));
                }
                Some(next)
            }
            None => None,
        };

        let updated = self
            .store
            .update(
                existing.id,
                existing.version,
                TransactionPatch {
                    status,
                    lightning_payload: command.lightning_payload.clone(),
                    reference: command.reference.clone(),
                    ..Default::default()
                },
            )
            .await?;

        wallet_snapshot(&self.ledger, updated.user_id, updated.id, command.pagination).await
    }
}
