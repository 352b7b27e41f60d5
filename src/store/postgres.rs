//! Postgres transaction store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::{
    Msats, NewTransaction, Transaction, TransactionPatch, TransactionStatus, TransactionType,
};

use super::{StoreError, TransactionStore};

const TX_COLUMNS: &str = "id, user_id, tx_type, amount_msats, amount_fiat, currency, \
     payment_tracker, lightning_payload, status, reference, version, created_at, updated_at";

/// Transaction store backed by the `wallet_transactions` table.
#[derive(Debug, Clone)]
pub struct PgTransactionStore {
    pool: PgPool,
}

impl PgTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_transaction(row: &PgRow) -> Result<Transaction, StoreError> {
        let id: Uuid = row.try_get("id")?;

        let tx_type_raw: String = row.try_get("tx_type")?;
        let tx_type = TransactionType::from_db(&tx_type_raw).ok_or_else(|| StoreError::Corrupt {
            id,
            reason: format!("unknown transaction type '{tx_type_raw}'"),
        })?;

        let amount_raw: i64 = row.try_get("amount_msats")?;
        let amount_msats = Msats::new(amount_raw).map_err(|e| StoreError::Corrupt {
            id,
            reason: e.to_string(),
        })?;

        let status_raw: String = row.try_get("status")?;

        Ok(Transaction {
            id,
            user_id: row.try_get("user_id")?,
            tx_type,
            amount_msats,
            amount_fiat: row.try_get::<Option<Decimal>, _>("amount_fiat")?,
            currency: row.try_get::<Option<String>, _>("currency")?,
            payment_tracker: row.try_get("payment_tracker")?,
            lightning_payload: row.try_get("lightning_payload")?,
            status: TransactionStatus::from_db(&status_raw),
            reference: row.try_get("reference")?,
            version: row.try_get("version")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }
}

#[async_trait]
impl TransactionStore for PgTransactionStore {
    async fn create(&self, new_tx: NewTransaction) -> Result<Transaction, StoreError> {
        let query = format!(
            r#"
            INSERT INTO wallet_transactions (
                id, user_id, tx_type, amount_msats, amount_fiat, currency,
                payment_tracker, lightning_payload, status, reference, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 1)
            RETURNING {TX_COLUMNS}
            "#
        );

        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(new_tx.user_id)
            .bind(new_tx.tx_type.as_str())
            .bind(new_tx.amount_msats.value())
            .bind(new_tx.amount_fiat)
            .bind(new_tx.currency)
            .bind(&new_tx.payment_tracker)
            .bind(&new_tx.lightning_payload)
            .bind(new_tx.status.as_str())
            .bind(&new_tx.reference)
            .fetch_one(&self.pool)
            .await?;

        Self::row_to_transaction(&row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Transaction>, StoreError> {
        let query = format!("SELECT {TX_COLUMNS} FROM wallet_transactions WHERE id = $1");

        let row = sqlx::query(&query).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::row_to_transaction).transpose()
    }

    async fn find_by_tracker(&self, tracker: &str) -> Result<Option<Transaction>, StoreError> {
        // The tracker is unique among non-terminal transactions of the same
        // rail; the newest record wins if an old terminal one shares it.
        let query = format!(
            r#"
            SELECT {TX_COLUMNS} FROM wallet_transactions
            WHERE payment_tracker = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#
        );

        let row = sqlx::query(&query)
            .bind(tracker)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_transaction).transpose()
    }

    async fn find_for_user(&self, user_id: Uuid) -> Result<Vec<Transaction>, StoreError> {
        let query = format!(
            r#"
            SELECT {TX_COLUMNS} FROM wallet_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#
        );

        let rows = sqlx::query(&query).bind(user_id).fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_transaction).collect()
    }

    async fn update(
        &self,
        id: Uuid,
        expected_version: i64,
        patch: TransactionPatch,
    ) -> Result<Transaction, StoreError> {
        let query = format!(
            r#"
            UPDATE wallet_transactions
            SET
                amount_msats = COALESCE($3, amount_msats),
                amount_fiat = COALESCE($4, amount_fiat),
                currency = COALESCE($5, currency),
                payment_tracker = COALESCE($6, payment_tracker),
                lightning_payload = COALESCE($7, lightning_payload),
                status = COALESCE($8, status),
                reference = COALESCE($9, reference),
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING {TX_COLUMNS}
            "#
        );

        let row = sqlx::query(&query)
            .bind(id)
            .bind(expected_version)
            .bind(patch.amount_msats.map(|m| m.value()))
            .bind(patch.amount_fiat)
            .bind(patch.currency)
            .bind(patch.payment_tracker)
            .bind(patch.lightning_payload)
            .bind(patch.status.map(|s| s.as_str()))
            .bind(patch.reference)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Self::row_to_transaction(&row),
            None => {
                // Distinguish a missing record from a lost optimistic-lock
                // race.
                let found: Option<i64> =
                    sqlx::query_scalar("SELECT version FROM wallet_transactions WHERE id = $1")
                        .bind(id)
                        .fetch_optional(&self.pool)
                        .await?;

                match found {
                    None => Err(StoreError::NotFound(id)),
                    Some(found) => Err(StoreError::VersionConflict {
                        id,
                        expected: expected_version,
                        found,
                    }),
                }
            }
        }
    }

    async fn sum_completed(
        &self,
        user_id: Uuid,
        tx_type: TransactionType,
    ) -> Result<i64, StoreError> {
        let total: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT SUM(amount_msats)::BIGINT FROM wallet_transactions
            WHERE user_id = $1 AND tx_type = $2 AND status = 'complete'
            "#,
        )
        .bind(user_id)
        .bind(tx_type.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or(0))
    }
}
