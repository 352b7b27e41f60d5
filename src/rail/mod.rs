//! Payment rail interface
//!
//! Lightning operations consumed by the settlement orchestrator: invoice
//! creation, decode, pay, inbound-payment registration, and LNURL-withdraw
//! access points. The concrete gateway client lives in `client`.

mod client;

pub use client::HttpRailClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Msats;

/// Which side of the wallet an operation belongs to. Carried through
/// `receive` registrations and echoed back in rail events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentContext {
    Deposit,
    Withdraw,
}

/// A freshly created Lightning invoice together with the rail-side
/// operation id used to correlate its confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightningInvoice {
    pub operation_id: String,
    pub invoice: String,
}

/// Fields decoded out of a payment request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodedInvoice {
    pub amount_msats: Msats,
    pub payment_hash: String,
    pub description: String,
}

/// Result of paying an invoice. The fee is folded into the stored
/// transaction amount, never tracked separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub operation_id: String,
    pub fee_msats: Msats,
}

/// A minted LNURL-withdraw access point. `k1` is the correlation nonce a
/// redeeming wallet presents at claim time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LnurlWithdrawPoint {
    pub lnurl: String,
    pub k1: String,
    pub callback: String,
    pub expires_at: DateTime<Utc>,
}

/// Payment rail errors
#[derive(Debug, thiserror::Error)]
pub enum RailError {
    #[error("Lightning gateway request failed: {0}")]
    Transport(String),

    #[error("Lightning gateway rejected request: {0}")]
    Rejected(String),

    #[error("Invalid invoice: {0}")]
    InvalidInvoice(String),
}

/// Lightning operations behind the settlement engine.
///
/// Timeouts are the adapter's responsibility; the orchestrator performs
/// each step once and surfaces the first error.
#[async_trait]
pub trait PaymentRail: Send + Sync {
    /// Create an invoice for the given amount.
    async fn invoice(&self, amount: Msats, memo: &str) -> Result<LightningInvoice, RailError>;

    /// Decode a payment request without paying it.
    async fn decode(&self, invoice: &str) -> Result<DecodedInvoice, RailError>;

    /// Pay a payment request, returning the rail fee charged.
    async fn pay(&self, invoice: &str) -> Result<PaymentOutcome, RailError>;

    /// Register for an asynchronous inbound-payment notification on an
    /// operation id. Fire-and-forget from the orchestrator's perspective.
    async fn receive(&self, context: PaymentContext, operation_id: &str)
        -> Result<(), RailError>;

    /// Mint an LNURL-withdraw access point capped at `max_msats` with a
    /// minimum claimable floor of `min_msats`.
    async fn create_lnurl_withdraw_point(
        &self,
        max_msats: Msats,
        min_msats: Msats,
        memo: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<LnurlWithdrawPoint, RailError>;
}
