//! Wallet transaction entity
//!
//! The central record of the settlement engine. A transaction's truth is
//! split between this local record and an external payment rail that
//! confirms out-of-band; `payment_tracker` is the join key between the two.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Msats;

/// Direction of a wallet transaction. Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdraw,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdraw => "withdraw",
        }
    }

    /// Decode from a stored string. Unknown values are a data error the
    /// store surfaces, so this is strict.
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "deposit" => Some(TransactionType::Deposit),
            "withdraw" => Some(TransactionType::Withdraw),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Settlement lifecycle of a transaction.
///
/// Status only moves forward: Pending -> Processing -> {Complete, Failed}.
/// Complete and Failed are terminal. `Unrecognized` is a defensive decode
/// fallback and is never set by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Complete,
    Failed,
    #[serde(other)]
    Unrecognized,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Processing => "processing",
            TransactionStatus::Complete => "complete",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Unrecognized => "unrecognized",
        }
    }

    /// Decode from a stored string, falling back to `Unrecognized`.
    pub fn from_db(s: &str) -> Self {
        match s {
            "pending" => TransactionStatus::Pending,
            "processing" => TransactionStatus::Processing,
            "complete" => TransactionStatus::Complete,
            "failed" => TransactionStatus::Failed,
            _ => TransactionStatus::Unrecognized,
        }
    }

    /// Whether this status admits no further mutation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Complete | TransactionStatus::Failed)
    }

    /// Forward-only transition check. Enforced by the orchestrator, not
    /// the store.
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        match (self, next) {
            (Pending, Processing) | (Pending, Complete) | (Pending, Failed) => true,
            (Processing, Complete) | (Processing, Failed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted wallet transaction.
///
/// `version` is a monotonically increasing optimistic-lock token: every
/// update is conditional on the expected prior version, so a continuation
/// call racing an asynchronous reconciliation event surfaces a conflict
/// instead of silently overwriting it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tx_type: TransactionType,
    pub amount_msats: Msats,
    pub amount_fiat: Option<Decimal>,
    pub currency: Option<String>,
    pub payment_tracker: String,
    pub lightning_payload: serde_json::Value,
    pub status: TransactionStatus,
    pub reference: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a new transaction record.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: Uuid,
    pub tx_type: TransactionType,
    pub amount_msats: Msats,
    pub amount_fiat: Option<Decimal>,
    pub currency: Option<String>,
    pub payment_tracker: String,
    pub lightning_payload: serde_json::Value,
    pub status: TransactionStatus,
    pub reference: String,
}

/// Partial-field update applied through the store's conditional update.
/// Absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct TransactionPatch {
    pub amount_msats: Option<Msats>,
    pub amount_fiat: Option<Decimal>,
    pub currency: Option<String>,
    pub payment_tracker: Option<String>,
    pub lightning_payload: Option<serde_json::Value>,
    pub status: Option<TransactionStatus>,
    pub reference: Option<String>,
}

impl TransactionPatch {
    pub fn status(status: TransactionStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}
