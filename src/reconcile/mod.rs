//! Event reconciliation
//!
//! Consumes rail confirmation events and reconciles them into the
//! transaction store. The channel is at-least-once, so every handler is
//! an idempotent set: redelivering an event leaves the record unchanged.
//! Handler failures are logged, never re-thrown - the channel has no way
//! to receive a rejection back.

use std::sync::Arc;

use crate::domain::{TransactionPatch, TransactionStatus};
use crate::error::{AppError, AppResult};
use crate::events::{EventReceiver, WalletEvent};
use crate::quote::SwapStatus;
use crate::store::TransactionStore;

/// Reconciles rail-side truth into local transaction records.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn TransactionStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self { store }
    }

    /// Consumer loop. Runs until the channel closes.
    pub async fn run(self, mut events: EventReceiver) {
        tracing::info!("Reconciler started");
        while let Some(event) = events.recv().await {
            self.dispatch(event).await;
        }
        tracing::info!("Event channel closed, reconciler stopping");
    }

    /// Dispatch one event. Errors are logged and dropped.
    pub async fn dispatch(&self, event: WalletEvent) {
        let name = event.name();
        let result = match event {
            WalletEvent::PaymentReceived { operation_id, .. } => {
                self.on_payment_received(&operation_id).await
            }
            WalletEvent::PaymentFailed { operation_id, .. } => {
                self.on_payment_failed(&operation_id).await
            }
            WalletEvent::SwapStatusChanged {
                swap_tracker,
                status,
                error,
                ..
            } => {
                if let Some(error) = error {
                    tracing::warn!(%swap_tracker, %error, "Swap reported an error");
                }
                self.on_swap_status_changed(&swap_tracker, status).await
            }
        };

        if let Err(e) = result {
            tracing::error!(event = name, error = %e, "Event reconciliation failed");
        }
    }

    /// An inbound payment settled: mark the matching transaction complete.
    pub async fn on_payment_received(&self, operation_id: &str) -> AppResult<()> {
        self.set_status(operation_id, TransactionStatus::Complete).await
    }

    /// An inbound payment failed: mark the matching transaction failed.
    pub async fn on_payment_failed(&self, operation_id: &str) -> AppResult<()> {
        self.set_status(operation_id, TransactionStatus::Failed).await
    }

    /// A swap changed status: mirror it onto the matching transaction.
    pub async fn on_swap_status_changed(
        &self,
        swap_tracker: &str,
        status: SwapStatus,
    ) -> AppResult<()> {
        self.set_status(swap_tracker, status.into()).await
    }

    /// Idempotent status set keyed by payment tracker.
    async fn set_status(&self, tracker: &str, target: TransactionStatus) -> AppResult<()> {
        let tx = self
            .store
            .find_by_tracker(tracker)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no transaction for tracker {tracker}")))?;

        if tx.status == target {
            // Redelivery of an already-applied event.
            return Ok(());
        }

        if !tx.status.can_transition_to(target) {
            tracing::warn!(
                tx_id = %tx.id,
                from = %tx.status,
                to = %target,
                "Dropping event that would move a settled transaction"
            );
            return Ok(());
        }

        let updated = self
            .store
            .update(tx.id, tx.version, TransactionPatch::status(target))
            .await?;

        tracing::info!(
            tx_id = %updated.id,
            tracker,
            status = %updated.status,
            "Reconciled transaction status"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Msats, NewTransaction, TransactionType};
    use crate::rail::PaymentContext;
    use crate::store::MemoryTransactionStore;
    use uuid::Uuid;

    async fn store_with_pending(tracker: &str) -> (Arc<MemoryTransactionStore>, Uuid) {
        let store = Arc::new(MemoryTransactionStore::new());
        let tx = store
            .create(NewTransaction {
                user_id: Uuid::new_v4(),
                tx_type: TransactionType::Deposit,
                amount_msats: Msats::new(5_000).unwrap(),
                amount_fiat: None,
                currency: None,
                payment_tracker: tracker.to_string(),
                lightning_payload: serde_json::Value::Null,
                status: TransactionStatus::Pending,
                reference: "test".to_string(),
            })
            .await
            .unwrap();
        (store, tx.id)
    }

    #[tokio::test]
    async fn test_payment_received_completes_transaction() {
        let (store, tx_id) = store_with_pending("op-1").await;
        let reconciler = Reconciler::new(store.clone());

        reconciler.on_payment_received("op-1").await.unwrap();

        let tx = store.find_by_id(tx_id).await.unwrap().unwrap();
        assert_eq!(tx.status, TransactionStatus::Complete);
    }

    #[tokio::test]
    async fn test_payment_received_is_idempotent() {
        let (store, tx_id) = store_with_pending("op-1").await;
        let reconciler = Reconciler::new(store.clone());

        reconciler.on_payment_received("op-1").await.unwrap();
        let after_first = store.find_by_id(tx_id).await.unwrap().unwrap();

        // Redelivery is a no-op set, not an increment.
        reconciler.on_payment_received("op-1").await.unwrap();
        let after_second = store.find_by_id(tx_id).await.unwrap().unwrap();

        assert_eq!(after_first.status, TransactionStatus::Complete);
        assert_eq!(after_second.status, TransactionStatus::Complete);
        assert_eq!(after_first.version, after_second.version);
        assert_eq!(after_first.amount_msats, after_second.amount_msats);
    }

    #[tokio::test]
    async fn test_payment_failed_marks_failed() {
        let (store, tx_id) = store_with_pending("op-2").await;
        let reconciler = Reconciler::new(store.clone());

        reconciler.on_payment_failed("op-2").await.unwrap();

        let tx = store.find_by_id(tx_id).await.unwrap().unwrap();
        assert_eq!(tx.status, TransactionStatus::Failed);
    }

    #[tokio::test]
    async fn test_terminal_transaction_not_reopened() {
        let (store, tx_id) = store_with_pending("op-3").await;
        let reconciler = Reconciler::new(store.clone());

        reconciler.on_payment_failed("op-3").await.unwrap();
        // A late success event must not resurrect the failed record.
        reconciler.on_payment_received("op-3").await.unwrap();

        let tx = store.find_by_id(tx_id).await.unwrap().unwrap();
        assert_eq!(tx.status, TransactionStatus::Failed);
    }

    #[tokio::test]
    async fn test_swap_status_changed_maps_status() {
        let (store, tx_id) = store_with_pending("swap-1").await;
        let reconciler = Reconciler::new(store.clone());

        reconciler
            .on_swap_status_changed("swap-1", SwapStatus::Processing)
            .await
            .unwrap();
        let tx = store.find_by_id(tx_id).await.unwrap().unwrap();
        assert_eq!(tx.status, TransactionStatus::Processing);

        reconciler
            .on_swap_status_changed("swap-1", SwapStatus::Complete)
            .await
            .unwrap();
        let tx = store.find_by_id(tx_id).await.unwrap().unwrap();
        assert_eq!(tx.status, TransactionStatus::Complete);
    }

    #[tokio::test]
    async fn test_unknown_tracker_is_an_error() {
        let store = Arc::new(MemoryTransactionStore::new());
        let reconciler = Reconciler::new(store);

        let result = reconciler.on_payment_received("missing").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_dispatch_swallows_errors() {
        let store = Arc::new(MemoryTransactionStore::new());
        let reconciler = Reconciler::new(store);

        // Unknown tracker: dispatch must log and carry on, not panic.
        reconciler
            .dispatch(WalletEvent::PaymentReceived {
                context: PaymentContext::Deposit,
                operation_id: "missing".to_string(),
            })
            .await;
    }
}
