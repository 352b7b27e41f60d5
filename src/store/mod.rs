//! Transaction store
//!
//! Persistent repository of wallet transactions. The orchestrator depends
//! on the `TransactionStore` trait only; `postgres` holds the production
//! implementation and `memory` a hashmap-backed one used by tests.

mod memory;
mod postgres;

pub use memory::MemoryTransactionStore;
pub use postgres::PgTransactionStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{NewTransaction, Transaction, TransactionPatch, TransactionType};

/// Transaction store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Transaction not found: {0}")]
    NotFound(Uuid),

    #[error("Version conflict on transaction {id}: expected {expected}, found {found}")]
    VersionConflict {
        id: Uuid,
        expected: i64,
        found: i64,
    },

    #[error("Corrupt transaction record {id}: {reason}")]
    Corrupt { id: Uuid, reason: String },
}

/// Repository interface for wallet transactions.
///
/// Records are never deleted; failed and abandoned transactions remain as
/// an audit trail. `update` is conditional on the caller's expected
/// version and bumps it, so racing writers surface a `VersionConflict`
/// instead of overwriting each other.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Persist a new transaction and return the stored record.
    async fn create(&self, new_tx: NewTransaction) -> Result<Transaction, StoreError>;

    /// Point lookup by id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Transaction>, StoreError>;

    /// Lookup by the rail-side correlation key.
    async fn find_by_tracker(&self, tracker: &str) -> Result<Option<Transaction>, StoreError>;

    /// All of a user's transactions, newest first.
    async fn find_for_user(&self, user_id: Uuid) -> Result<Vec<Transaction>, StoreError>;

    /// Conditional partial update. Fails with `VersionConflict` when the
    /// stored version no longer matches `expected_version`.
    async fn update(
        &self,
        id: Uuid,
        expected_version: i64,
        patch: TransactionPatch,
    ) -> Result<Transaction, StoreError>;

    /// Sum of `amount_msats` over a user's COMPLETE transactions of the
    /// given type.
    async fn sum_completed(
        &self,
        user_id: Uuid,
        tx_type: TransactionType,
    ) -> Result<i64, StoreError>;
}
