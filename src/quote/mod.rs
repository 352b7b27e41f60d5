//! Quote provider interface
//!
//! Fiat/BTC exchange quotes and on/off-ramp swap creation, supplied by the
//! external swap service. The orchestrator only ever talks to the
//! `QuoteProvider` trait; the HTTP client lives in `client`.

mod client;

pub use client::HttpQuoteClient;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::TransactionStatus;

/// A fiat<->BTC exchange quote. `rate` is fiat units per whole BTC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub id: String,
    pub rate: Decimal,
}

/// Status vocabulary of the swap service. Maps 1:1 onto the transaction
/// status enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapStatus {
    Pending,
    Processing,
    Complete,
    Failed,
}

impl From<SwapStatus> for TransactionStatus {
    fn from(status: SwapStatus) -> Self {
        match status {
            SwapStatus::Pending => TransactionStatus::Pending,
            SwapStatus::Processing => TransactionStatus::Processing,
            SwapStatus::Complete => TransactionStatus::Complete,
            SwapStatus::Failed => TransactionStatus::Failed,
        }
    }
}

/// Request to collect fiat from a user and pay out to a Lightning invoice.
#[derive(Debug, Clone, Serialize)]
pub struct OnrampSwapRequest {
    pub quote_id: Option<String>,
    pub amount_fiat: Decimal,
    pub currency: String,
    pub reference: String,
    /// Fiat collection source (e.g. a mobile-money account).
    pub origin_account: String,
    /// Lightning invoice the swap pays out to once fiat clears.
    pub target_invoice: String,
}

/// Request to settle BTC out to a fiat destination.
#[derive(Debug, Clone, Serialize)]
pub struct OfframpSwapRequest {
    pub quote_id: Option<String>,
    pub amount_fiat: Decimal,
    pub currency: String,
    pub reference: String,
    /// Fiat payout destination.
    pub target_account: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OnrampSwap {
    pub id: String,
    pub status: SwapStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OfframpSwap {
    pub id: String,
    pub status: SwapStatus,
    /// Settlement invoice the engine must pay to fund the swap.
    pub lightning_invoice: String,
}

/// Quote provider errors
#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    #[error("Swap service request failed: {0}")]
    Transport(String),

    #[error("Swap service rejected request: {0}")]
    Rejected(String),
}

/// Fiat<->BTC quotes and swap creation.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Get an exchange quote for converting `amount` of `from` into `to`.
    async fn get_quote(&self, from: &str, to: &str, amount: Decimal)
        -> Result<Quote, QuoteError>;

    /// Create a fiat-collection swap paying out to a Lightning invoice.
    async fn create_onramp_swap(&self, request: OnrampSwapRequest)
        -> Result<OnrampSwap, QuoteError>;

    /// Create a fiat-payout swap funded by a Lightning invoice.
    async fn create_offramp_swap(
        &self,
        request: OfframpSwapRequest,
    ) -> Result<OfframpSwap, QuoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_status_maps_onto_transaction_status() {
        assert_eq!(
            TransactionStatus::from(SwapStatus::Pending),
            TransactionStatus::Pending
        );
        assert_eq!(
            TransactionStatus::from(SwapStatus::Processing),
            TransactionStatus::Processing
        );
        assert_eq!(
            TransactionStatus::from(SwapStatus::Complete),
            TransactionStatus::Complete
        );
        assert_eq!(
            TransactionStatus::from(SwapStatus::Failed),
            TransactionStatus::Failed
        );
    }

    #[test]
    fn test_swap_status_decode() {
        let status: SwapStatus = serde_json::from_str(r#""processing""#).unwrap();
        assert_eq!(status, SwapStatus::Processing);
    }
}
