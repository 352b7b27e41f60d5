//! In-memory transaction store
//!
//! Hashmap-backed store with the same conditional-update semantics as the
//! Postgres implementation. Used by unit and scenario tests.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    NewTransaction, Transaction, TransactionPatch, TransactionStatus, TransactionType,
};

use super::{StoreError, TransactionStore};

#[derive(Default)]
struct Inner {
    records: HashMap<Uuid, Transaction>,
    // Insertion order, oldest first. Newest-first reads walk it backwards,
    // which keeps ordering deterministic when timestamps collide.
    order: Vec<Uuid>,
}

/// Transaction store held entirely in memory.
#[derive(Default)]
pub struct MemoryTransactionStore {
    inner: RwLock<Inner>,
}

impl MemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for MemoryTransactionStore {
    async fn create(&self, new_tx: NewTransaction) -> Result<Transaction, StoreError> {
        let now = Utc::now();
        let tx = Transaction {
            id: Uuid::new_v4(),
            user_id: new_tx.user_id,
            tx_type: new_tx.tx_type,
            amount_msats: new_tx.amount_msats,
            amount_fiat: new_tx.amount_fiat,
            currency: new_tx.currency,
            payment_tracker: new_tx.payment_tracker,
            lightning_payload: new_tx.lightning_payload,
            status: new_tx.status,
            reference: new_tx.reference,
            version: 1,
            created_at: now,
            updated_at: now,
        };

        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.order.push(tx.id);
        inner.records.insert(tx.id, tx.clone());
        Ok(tx)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Transaction>, StoreError> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner.records.get(&id).cloned())
    }

    async fn find_by_tracker(&self, tracker: &str) -> Result<Option<Transaction>, StoreError> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .order
            .iter()
            .rev()
            .filter_map(|id| inner.records.get(id))
            .find(|tx| tx.payment_tracker == tracker)
            .cloned())
    }

    async fn find_for_user(&self, user_id: Uuid) -> Result<Vec<Transaction>, StoreError> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .order
            .iter()
            .rev()
            .filter_map(|id| inner.records.get(id))
            .filter(|tx| tx.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        id: Uuid,
        expected_version: i64,
        patch: TransactionPatch,
    ) -> Result<Transaction, StoreError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let tx = inner.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if tx.version != expected_version {
            return Err(StoreError::VersionConflict {
                id,
                expected: expected_version,
                found: tx.version,
            });
        }

        if let Some(amount) = patch.amount_msats {
            tx.amount_msats = amount;
        }
        if let Some(amount_fiat) = patch.amount_fiat {
            tx.amount_fiat = Some(amount_fiat);
        }
        if let Some(currency) = patch.currency {
            tx.currency = Some(currency);
        }
        if let Some(tracker) = patch.payment_tracker {
            tx.payment_tracker = tracker;
        }
        if let Some(payload) = patch.lightning_payload {
            tx.lightning_payload = payload;
        }
        if let Some(status) = patch.status {
            tx.status = status;
        }
        if let Some(reference) = patch.reference {
            tx.reference = reference;
        }
        tx.version += 1;
        tx.updated_at = Utc::now();

        Ok(tx.clone())
    }

    async fn sum_completed(
        &self,
        user_id: Uuid,
        tx_type: TransactionType,
    ) -> Result<i64, StoreError> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .records
            .values()
            .filter(|tx| {
                tx.user_id == user_id
                    && tx.tx_type == tx_type
                    && tx.status == TransactionStatus::Complete
            })
            .map(|tx| tx.amount_msats.value())
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Msats;

    fn sample(user_id: Uuid, tracker: &str) -> NewTransaction {
        NewTransaction {
            user_id,
            tx_type: TransactionType::Deposit,
            amount_msats: Msats::new(1_000).unwrap(),
            amount_fiat: None,
            currency: None,
            payment_tracker: tracker.to_string(),
            lightning_payload: serde_json::Value::Null,
            status: TransactionStatus::Pending,
            reference: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = MemoryTransactionStore::new();
        let user_id = Uuid::new_v4();

        let tx = store.create(sample(user_id, "op-1")).await.unwrap();
        assert_eq!(tx.version, 1);

        let found = store.find_by_id(tx.id).await.unwrap().unwrap();
        assert_eq!(found.payment_tracker, "op-1");

        let by_tracker = store.find_by_tracker("op-1").await.unwrap().unwrap();
        assert_eq!(by_tracker.id, tx.id);
    }

    #[tokio::test]
    async fn test_find_for_user_newest_first() {
        let store = MemoryTransactionStore::new();
        let user_id = Uuid::new_v4();

        let first = store.create(sample(user_id, "op-1")).await.unwrap();
        let second = store.create(sample(user_id, "op-2")).await.unwrap();
        store.create(sample(Uuid::new_v4(), "op-3")).await.unwrap();

        let txs = store.find_for_user(user_id).await.unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].id, second.id);
        assert_eq!(txs[1].id, first.id);
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let store = MemoryTransactionStore::new();
        let tx = store.create(sample(Uuid::new_v4(), "op-1")).await.unwrap();

        let updated = store
            .update(
                tx.id,
                tx.version,
                TransactionPatch::status(TransactionStatus::Complete),
            )
            .await
            .unwrap();

        assert_eq!(updated.status, TransactionStatus::Complete);
        assert_eq!(updated.version, 2);
    }

    #[tokio::test]
    async fn test_update_version_conflict() {
        let store = MemoryTransactionStore::new();
        let tx = store.create(sample(Uuid::new_v4(), "op-1")).await.unwrap();

        store
            .update(
                tx.id,
                tx.version,
                TransactionPatch::status(TransactionStatus::Processing),
            )
            .await
            .unwrap();

        // A second writer still holding version 1 loses the race.
        let result = store
            .update(
                tx.id,
                tx.version,
                TransactionPatch::status(TransactionStatus::Complete),
            )
            .await;

        assert!(matches!(
            result,
            Err(StoreError::VersionConflict {
                expected: 1,
                found: 2,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let store = MemoryTransactionStore::new();
        let result = store
            .update(
                Uuid::new_v4(),
                1,
                TransactionPatch::status(TransactionStatus::Complete),
            )
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_sum_completed_ignores_non_terminal() {
        let store = MemoryTransactionStore::new();
        let user_id = Uuid::new_v4();

        let mut complete = sample(user_id, "op-1");
        complete.status = TransactionStatus::Complete;
        complete.amount_msats = Msats::new(100_000).unwrap();
        store.create(complete).await.unwrap();

        // Pending deposit must not count.
        let mut pending = sample(user_id, "op-2");
        pending.amount_msats = Msats::new(40_000).unwrap();
        store.create(pending).await.unwrap();

        let total = store
            .sum_completed(user_id, TransactionType::Deposit)
            .await
            .unwrap();
        assert_eq!(total, 100_000);
    }
}
