//! Balance & ledger engine
//!
//! Computes per-user aggregate balance and paginated transaction history
//! from the transaction store. Balances are always aggregated fresh, never
//! read from a cached counter.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Transaction, TransactionType};
use crate::error::{AppError, AppResult};
use crate::store::TransactionStore;

const DEFAULT_PAGE_SIZE: usize = 10;

/// Page request for ledger reads.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    pub page: usize,
    pub size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of a user's transaction history, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct TxLedger {
    pub transactions: Vec<Transaction>,
    pub page: usize,
    pub size: usize,
    pub pages: usize,
}

/// Aggregate wallet totals in millisatoshis.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct WalletMeta {
    pub total_deposits_msats: i64,
    pub total_withdrawals_msats: i64,
    pub current_balance_msats: i64,
}

/// Read-side service over the transaction store.
#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn TransactionStore>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self { store }
    }

    /// Load one page of a user's ledger.
    ///
    /// When `priority_tx_id` is given, that transaction is spliced to the
    /// front of the unsliced list so the caller's page always surfaces it,
    /// even if recency ordering would place it off-page. A `page` beyond
    /// the last page clamps to the last page.
    ///
    /// # Errors
    /// - `AppError::NotFound` if `priority_tx_id` is absent from the
    ///   user's transactions
    pub async fn paginated_ledger(
        &self,
        user_id: Uuid,
        pagination: Pagination,
        priority_tx_id: Option<Uuid>,
    ) -> AppResult<TxLedger> {
        let mut transactions = self.store.find_for_user(user_id).await?;

        if let Some(priority_id) = priority_tx_id {
            let position = transactions
                .iter()
                .position(|tx| tx.id == priority_id)
                .ok_or_else(|| AppError::NotFound(format!("transaction {priority_id}")))?;
            let priority = transactions.remove(position);
            transactions.insert(0, priority);
        }

        let size = pagination.size.max(1);
        let total = transactions.len();
        let pages = (total + size - 1) / size;
        let page = if pages == 0 {
            0
        } else {
            pagination.page.min(pages - 1)
        };

        let transactions = transactions
            .into_iter()
            .skip(page * size)
            .take(size)
            .collect();

        Ok(TxLedger {
            transactions,
            page,
            size,
            pages,
        })
    }

    /// Aggregate totals for a user.
    ///
    /// Aggregation failures degrade to zero rather than failing the whole
    /// read; the failure is logged, not propagated.
    pub async fn wallet_meta(&self, user_id: Uuid) -> WalletMeta {
        let total_deposits_msats = self.sum_or_zero(user_id, TransactionType::Deposit).await;
        let total_withdrawals_msats = self.sum_or_zero(user_id, TransactionType::Withdraw).await;

        WalletMeta {
            total_deposits_msats,
            total_withdrawals_msats,
            current_balance_msats: total_deposits_msats - total_withdrawals_msats,
        }
    }

    /// Current spendable balance in msats.
    pub async fn current_balance(&self, user_id: Uuid) -> i64 {
        self.wallet_meta(user_id).await.current_balance_msats
    }

    async fn sum_or_zero(&self, user_id: Uuid, tx_type: TransactionType) -> i64 {
        match self.store.sum_completed(user_id, tx_type).await {
            Ok(total) => total,
            Err(e) => {
                tracing::warn!(
                    %user_id,
                    tx_type = %tx_type,
                    error = %e,
                    "Balance aggregation failed, degrading to zero"
                );
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Msats, NewTransaction, TransactionStatus};
    use crate::store::MemoryTransactionStore;

    fn new_tx(user_id: Uuid, n: usize, status: TransactionStatus) -> NewTransaction {
        NewTransaction {
            user_id,
            tx_type: TransactionType::Deposit,
            amount_msats: Msats::new(1_000 * n as i64).unwrap(),
            amount_fiat: None,
            currency: None,
            payment_tracker: format!("op-{n}"),
            lightning_payload: serde_json::Value::Null,
            status,
            reference: format!("tx {n}"),
        }
    }

    async fn seeded(user_id: Uuid, count: usize) -> (Arc<MemoryTransactionStore>, Vec<Uuid>) {
        let store = Arc::new(MemoryTransactionStore::new());
        let mut ids = Vec::new();
        for n in 0..count {
            let tx = store
                .create(new_tx(user_id, n, TransactionStatus::Pending))
                .await
                .unwrap();
            ids.push(tx.id);
        }
        (store, ids)
    }

    #[tokio::test]
    async fn test_pagination_slices_newest_first() {
        let user_id = Uuid::new_v4();
        let (store, ids) = seeded(user_id, 5).await;
        let ledger = LedgerService::new(store);

        let page = ledger
            .paginated_ledger(user_id, Pagination { page: 0, size: 2 }, None)
            .await
            .unwrap();

        assert_eq!(page.pages, 3);
        assert_eq!(page.transactions.len(), 2);
        // Newest first: the last created id leads.
        assert_eq!(page.transactions[0].id, ids[4]);
        assert_eq!(page.transactions[1].id, ids[3]);
    }

    #[tokio::test]
    async fn test_page_beyond_last_clamps_to_last() {
        let user_id = Uuid::new_v4();
        let (store, ids) = seeded(user_id, 5).await;
        let ledger = LedgerService::new(store);

        let page = ledger
            .paginated_ledger(user_id, Pagination { page: 99, size: 2 }, None)
            .await
            .unwrap();

        assert_eq!(page.page, 2);
        assert_eq!(page.transactions.len(), 1);
        assert_eq!(page.transactions[0].id, ids[0]);
    }

    #[tokio::test]
    async fn test_priority_tx_spliced_to_front() {
        let user_id = Uuid::new_v4();
        let (store, ids) = seeded(user_id, 5).await;
        let ledger = LedgerService::new(store);

        // The oldest transaction would naturally land on the last page.
        let page = ledger
            .paginated_ledger(user_id, Pagination { page: 0, size: 2 }, Some(ids[0]))
            .await
            .unwrap();

        assert_eq!(page.transactions[0].id, ids[0]);
        assert_eq!(page.transactions[1].id, ids[4]);
    }

    #[tokio::test]
    async fn test_priority_tx_missing_is_not_found() {
        let user_id = Uuid::new_v4();
        let (store, _) = seeded(user_id, 2).await;
        let ledger = LedgerService::new(store);

        let result = ledger
            .paginated_ledger(user_id, Pagination::default(), Some(Uuid::new_v4()))
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_ledger() {
        let store = Arc::new(MemoryTransactionStore::new());
        let ledger = LedgerService::new(store);

        let page = ledger
            .paginated_ledger(Uuid::new_v4(), Pagination::default(), None)
            .await
            .unwrap();

        assert_eq!(page.pages, 0);
        assert_eq!(page.page, 0);
        assert!(page.transactions.is_empty());
    }

    #[tokio::test]
    async fn test_wallet_meta_balance() {
        let user_id = Uuid::new_v4();
        let store = Arc::new(MemoryTransactionStore::new());

        let deposit = NewTransaction {
            amount_msats: Msats::new(100_000).unwrap(),
            status: TransactionStatus::Complete,
            ..new_tx(user_id, 1, TransactionStatus::Complete)
        };
        store.create(deposit).await.unwrap();

        let withdrawal = NewTransaction {
            tx_type: TransactionType::Withdraw,
            amount_msats: Msats::new(30_000).unwrap(),
            status: TransactionStatus::Complete,
            ..new_tx(user_id, 2, TransactionStatus::Complete)
        };
        store.create(withdrawal).await.unwrap();

        // Pending amounts never contribute.
        store
            .create(new_tx(user_id, 3, TransactionStatus::Pending))
            .await
            .unwrap();

        let meta = LedgerService::new(store).wallet_meta(user_id).await;
        assert_eq!(meta.total_deposits_msats, 100_000);
        assert_eq!(meta.total_withdrawals_msats, 30_000);
        assert_eq!(meta.current_balance_msats, 70_000);
    }
}
