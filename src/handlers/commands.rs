//! Command definitions
//!
//! Commands represent intentions to change wallet state. They are plain
//! data; all validation happens inside the handlers so the API layer
//! stays thin.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::TransactionStatus;
use crate::ledger::Pagination;

/// Fiat collection details for an onramp deposit.
#[derive(Debug, Clone)]
pub struct OnrampPayment {
    /// Currency the fiat is collected in; falls back to the system default.
    pub currency: Option<String>,
    /// Source the swap service collects from (e.g. a mobile-money account).
    pub origin_account: String,
}

/// Fiat payout destination for an offramp withdrawal.
#[derive(Debug, Clone)]
pub struct OfframpTarget {
    /// Currency to pay out in; falls back to the system default.
    pub currency: Option<String>,
    /// Destination account for the fiat payout.
    pub account: String,
}

/// Command to deposit funds into a user's wallet.
#[derive(Debug, Clone)]
pub struct DepositCommand {
    pub user_id: Uuid,
    pub amount_fiat: Decimal,
    pub reference: Option<String>,
    /// When present, fiat is collected through an onramp swap instead of a
    /// directly-paid Lightning invoice.
    pub onramp: Option<OnrampPayment>,
    pub pagination: Option<Pagination>,
}

impl DepositCommand {
    pub fn new(user_id: Uuid, amount_fiat: Decimal) -> Self {
        Self {
            user_id,
            amount_fiat,
            reference: None,
            onramp: None,
            pagination: None,
        }
    }

    pub fn with_reference(mut self, reference: String) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn with_onramp(mut self, onramp: OnrampPayment) -> Self {
        self.onramp = Some(onramp);
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

/// Command to resume an incomplete deposit in place.
#[derive(Debug, Clone)]
pub struct ContinueDepositCommand {
    pub user_id: Uuid,
    pub tx_id: Uuid,
    pub amount_fiat: Decimal,
    pub onramp: Option<OnrampPayment>,
    pub pagination: Option<Pagination>,
}

impl ContinueDepositCommand {
    pub fn new(user_id: Uuid, tx_id: Uuid, amount_fiat: Decimal) -> Self {
        Self {
            user_id,
            tx_id,
            amount_fiat,
            onramp: None,
            pagination: None,
        }
    }

    pub fn with_onramp(mut self, onramp: OnrampPayment) -> Self {
        self.onramp = Some(onramp);
        self
    }
}

/// Command to withdraw funds over exactly one of three rails, checked in
/// precedence order: Lightning invoice, LNURL-withdraw, fiat offramp.
#[derive(Debug, Clone)]
pub struct WithdrawCommand {
    pub user_id: Uuid,
    /// Required for offramp, optional cap for LNURL, ignored for a direct
    /// invoice (the invoice carries its own amount).
    pub amount_fiat: Option<Decimal>,
    pub reference: Option<String>,
    /// A bolt11 invoice to pay directly.
    pub lightning: Option<String>,
    /// Mint an LNURL-withdraw access point instead of paying out now.
    pub lnurl: bool,
    pub offramp: Option<OfframpTarget>,
    pub pagination: Option<Pagination>,
}

impl WithdrawCommand {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            amount_fiat: None,
            reference: None,
            lightning: None,
            lnurl: false,
            offramp: None,
            pagination: None,
        }
    }

    pub fn with_amount_fiat(mut self, amount_fiat: Decimal) -> Self {
        self.amount_fiat = Some(amount_fiat);
        self
    }

    pub fn with_reference(mut self, reference: String) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn with_lightning(mut self, invoice: String) -> Self {
        self.lightning = Some(invoice);
        self
    }

    pub fn with_lnurl(mut self) -> Self {
        self.lnurl = true;
        self
    }

    pub fn with_offramp(mut self, offramp: OfframpTarget) -> Self {
        self.offramp = Some(offramp);
        self
    }
}

/// Command to resume an incomplete withdrawal in place.
#[derive(Debug, Clone)]
pub struct ContinueWithdrawCommand {
    pub user_id: Uuid,
    pub tx_id: Uuid,
    pub amount_fiat: Option<Decimal>,
    pub lightning: Option<String>,
    pub lnurl: bool,
    pub offramp: Option<OfframpTarget>,
    pub pagination: Option<Pagination>,
}

impl ContinueWithdrawCommand {
    pub fn new(user_id: Uuid, tx_id: Uuid) -> Self {
        Self {
            user_id,
            tx_id,
            amount_fiat: None,
            lightning: None,
            lnurl: false,
            offramp: None,
            pagination: None,
        }
    }

    pub fn with_amount_fiat(mut self, amount_fiat: Decimal) -> Self {
        self.amount_fiat = Some(amount_fiat);
        self
    }

    pub fn with_lightning(mut self, invoice: String) -> Self {
        self.lightning = Some(invoice);
        self
    }

    pub fn with_lnurl(mut self) -> Self {
        self.lnurl = true;
        self
    }

    pub fn with_offramp(mut self, offramp: OfframpTarget) -> Self {
        self.offramp = Some(offramp);
        self
    }

    /// Reshape into the withdrawal inputs shared with the initial call.
    pub(crate) fn as_withdraw(&self) -> WithdrawCommand {
        WithdrawCommand {
            user_id: self.user_id,
            amount_fiat: self.amount_fiat,
            reference: None,
            lightning: self.lightning.clone(),
            lnurl: self.lnurl,
            offramp: self.offramp.clone(),
            pagination: self.pagination,
        }
    }
}

/// Generic partial update of a transaction record, used by internal
/// callers.
#[derive(Debug, Clone, Default)]
pub struct UpdateTransactionCommand {
    pub tx_id: Uuid,
    pub status: Option<TransactionStatus>,
    pub lightning_payload: Option<serde_json::Value>,
    pub reference: Option<String>,
    pub pagination: Option<Pagination>,
}

impl UpdateTransactionCommand {
    pub fn new(tx_id: Uuid) -> Self {
        Self {
            tx_id,
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_reference(mut self, reference: String) -> Self {
        self.reference = Some(reference);
        self
    }
}
