//! Common test utilities
//!
//! Scripted collaborator fakes for driving settlement flows end to end
//! against the in-memory store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use satswallet::config::SettlementSettings;
use satswallet::domain::Msats;
use satswallet::handlers::{DepositHandler, LnurlWithdrawHandler, WithdrawHandler};
use satswallet::ledger::LedgerService;
use satswallet::metrics::{MetricsSink, OperationMetric};
use satswallet::quote::{
    OfframpSwap, OfframpSwapRequest, OnrampSwap, OnrampSwapRequest, Quote, QuoteError,
    QuoteProvider, SwapStatus,
};
use satswallet::rail::{
    DecodedInvoice, LightningInvoice, LnurlWithdrawPoint, PaymentContext, PaymentOutcome,
    PaymentRail, RailError,
};
use satswallet::reconcile::Reconciler;
use satswallet::store::MemoryTransactionStore;

/// Quote provider pinned to a fixed rate with always-processing swaps.
pub struct FixedQuotes {
    pub rate: Decimal,
}

#[async_trait]
impl QuoteProvider for FixedQuotes {
    async fn get_quote(
        &self,
        _from: &str,
        _to: &str,
        _amount: Decimal,
    ) -> Result<Quote, QuoteError> {
        Ok(Quote {
            id: Uuid::new_v4().to_string(),
            rate: self.rate,
        })
    }

    async fn create_onramp_swap(
        &self,
        _request: OnrampSwapRequest,
    ) -> Result<OnrampSwap, QuoteError> {
        Ok(OnrampSwap {
            id: "swap-onramp".to_string(),
            status: SwapStatus::Processing,
        })
    }

    async fn create_offramp_swap(
        &self,
        _request: OfframpSwapRequest,
    ) -> Result<OfframpSwap, QuoteError> {
        Ok(OfframpSwap {
            id: "swap-offramp".to_string(),
            status: SwapStatus::Processing,
            lightning_invoice: "lnbc-offramp".to_string(),
        })
    }
}

/// Rail whose decode table and fee are scripted by the test.
pub struct ScriptedRail {
    pub decode_table: Mutex<HashMap<String, i64>>,
    pub fee_msats: i64,
    pub k1: String,
}

impl ScriptedRail {
    pub fn new(fee_msats: i64) -> Self {
        Self {
            decode_table: Mutex::new(HashMap::new()),
            fee_msats,
            k1: "k1-flow".to_string(),
        }
    }

    pub fn script_invoice(&self, invoice: &str, amount_msats: i64) {
        self.decode_table
            .lock()
            .unwrap()
            .insert(invoice.to_string(), amount_msats);
    }
}

#[async_trait]
impl PaymentRail for ScriptedRail {
    async fn invoice(&self, amount: Msats, _memo: &str) -> Result<LightningInvoice, RailError> {
        Ok(LightningInvoice {
            operation_id: format!("op-{}", amount.value()),
            invoice: format!("lnbc-{}", amount.value()),
        })
    }

    async fn decode(&self, invoice: &str) -> Result<DecodedInvoice, RailError> {
        let amount = self
            .decode_table
            .lock()
            .unwrap()
            .get(invoice)
            .copied()
            .ok_or_else(|| RailError::InvalidInvoice(invoice.to_string()))?;
        Ok(DecodedInvoice {
            amount_msats: Msats::new(amount).unwrap(),
            payment_hash: format!("hash-{amount}"),
            description: "scripted".to_string(),
        })
    }

    async fn pay(&self, invoice: &str) -> Result<PaymentOutcome, RailError> {
        Ok(PaymentOutcome {
            operation_id: format!("pay-{invoice}"),
            fee_msats: Msats::new(self.fee_msats).unwrap(),
        })
    }

    async fn receive(
        &self,
        _context: PaymentContext,
        _operation_id: &str,
    ) -> Result<(), RailError> {
        Ok(())
    }

    async fn create_lnurl_withdraw_point(
        &self,
        _max_msats: Msats,
        _min_msats: Msats,
        _memo: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<LnurlWithdrawPoint, RailError> {
        Ok(LnurlWithdrawPoint {
            lnurl: "lnurl1flow".to_string(),
            k1: self.k1.clone(),
            callback: "https://wallet.test/lnurl/withdraw/callback".to_string(),
            expires_at,
        })
    }
}

/// Sink that discards everything.
pub struct NullSink;

impl MetricsSink for NullSink {
    fn record(&self, _metric: OperationMetric) {}
}

/// A fully wired wallet over the in-memory store.
pub struct Wallet {
    pub store: Arc<MemoryTransactionStore>,
    pub rail: Arc<ScriptedRail>,
    pub deposits: DepositHandler,
    pub withdrawals: WithdrawHandler,
    pub lnurl: LnurlWithdrawHandler,
    pub ledger: LedgerService,
    pub reconciler: Reconciler,
}

/// Wire a wallet at 5,000,000 fiat units per BTC (100 fiat = 2,000,000
/// msats) with the given rail fee.
pub fn wallet_with_fee(fee_msats: i64) -> Wallet {
    let store = Arc::new(MemoryTransactionStore::new());
    let quotes = Arc::new(FixedQuotes { rate: dec!(5000000) });
    let rail = Arc::new(ScriptedRail::new(fee_msats));
    let metrics = Arc::new(NullSink);
    let settings = SettlementSettings::default();

    Wallet {
        deposits: DepositHandler::new(
            store.clone(),
            quotes.clone(),
            rail.clone(),
            metrics.clone(),
            settings.clone(),
        ),
        withdrawals: WithdrawHandler::new(
            store.clone(),
            quotes.clone(),
            rail.clone(),
            metrics.clone(),
            settings,
        ),
        lnurl: LnurlWithdrawHandler::new(store.clone(), rail.clone(), metrics),
        ledger: LedgerService::new(store.clone()),
        reconciler: Reconciler::new(store.clone()),
        store,
        rail,
    }
}
