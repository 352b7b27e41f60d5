//! Settlement handlers module
//!
//! The orchestrator core: handlers that initiate, resume, and settle
//! deposits and withdrawals. Each handler coordinates the transaction
//! store, quote provider, payment rail, and metrics sink.

mod commands;
mod deposit_handler;
mod lnurl_handler;
mod update_handler;
mod withdraw_handler;


pub use commands::*;
pub use deposit_handler::DepositHandler;
pub use lnurl_handler::{LnurlCallbackResult, LnurlWithdrawHandler};
pub use update_handler::UpdateTransactionHandler;
pub use withdraw_handler::WithdrawHandler;

use serde::Serialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::ledger::{LedgerService, Pagination, TxLedger, WalletMeta};

pub(crate) const DEFAULT_DEPOSIT_REFERENCE: &str = "Savings deposit";
pub(crate) const DEFAULT_WITHDRAW_REFERENCE: &str = "Savings withdrawal";

/// Wallet view returned by every mutating operation: the affected
/// transaction id, the refreshed ledger page with that transaction
/// surfaced first, and the recomputed balance.
#[derive(Debug, Clone, Serialize)]
pub struct WalletSnapshot {
    pub tx_id: Uuid,
    pub ledger: TxLedger,
    pub meta: WalletMeta,
}

/// Recompute the caller's wallet view with `tx_id` prioritized to the
/// front of the ledger.
pub(crate) async fn wallet_snapshot(
    ledger: &LedgerService,
    user_id: Uuid,
    tx_id: Uuid,
    pagination: Option<Pagination>,
) -> AppResult<WalletSnapshot> {
    let page = ledger
        .paginated_ledger(user_id, pagination.unwrap_or_default(), Some(tx_id))
        .await?;
    let meta = ledger.wallet_meta(user_id).await;
    Ok(WalletSnapshot {
        tx_id,
        ledger: page,
        meta,
    })
}
