//! Settlement flow tests
//!
//! End-to-end flows across the handlers, reconciler, and ledger: a
//! deposit or withdrawal is initiated, rail confirmations arrive over the
//! event channel, and the balance reflects only settled transactions.

mod common;

use rust_decimal_macros::dec;
use uuid::Uuid;

use satswallet::domain::TransactionStatus;
use satswallet::events::WalletEvent;
use satswallet::handlers::{
    ContinueDepositCommand, DepositCommand, OnrampPayment, WithdrawCommand,
};
use satswallet::quote::SwapStatus;
use satswallet::rail::PaymentContext;
use satswallet::store::TransactionStore;

use common::wallet_with_fee;

fn payment_received(operation_id: &str) -> WalletEvent {
    WalletEvent::PaymentReceived {
        context: PaymentContext::Deposit,
        operation_id: operation_id.to_string(),
    }
}

#[tokio::test]
async fn test_deposit_settles_on_payment_received() {
    let wallet = wallet_with_fee(0);
    let user_id = Uuid::new_v4();

    // 100 fiat at 5,000,000/BTC = 2,000,000 msats, pending until the rail
    // confirms.
    let snapshot = wallet
        .deposits
        .execute(DepositCommand::new(user_id, dec!(100)))
        .await
        .unwrap();
    assert_eq!(snapshot.meta.current_balance_msats, 0);

    wallet.reconciler.dispatch(payment_received("op-2000000")).await;

    let meta = wallet.ledger.wallet_meta(user_id).await;
    assert_eq!(meta.current_balance_msats, 2_000_000);

    // At-least-once delivery: a duplicate confirmation changes nothing.
    let before = wallet.store.find_by_id(snapshot.tx_id).await.unwrap().unwrap();
    wallet.reconciler.dispatch(payment_received("op-2000000")).await;
    let after = wallet.store.find_by_id(snapshot.tx_id).await.unwrap().unwrap();
    assert_eq!(before.version, after.version);
    assert_eq!(
        wallet.ledger.wallet_meta(user_id).await.current_balance_msats,
        2_000_000
    );
}

#[tokio::test]
async fn test_onramp_deposit_follows_swap_lifecycle() {
    let wallet = wallet_with_fee(0);
    let user_id = Uuid::new_v4();

    let command = DepositCommand::new(user_id, dec!(100)).with_onramp(OnrampPayment {
        currency: None,
        origin_account: "254700000001".to_string(),
    });
    let snapshot = wallet.deposits.execute(command).await.unwrap();

    let tx = wallet.store.find_by_id(snapshot.tx_id).await.unwrap().unwrap();
    assert_eq!(tx.payment_tracker, "swap-onramp");
    assert_eq!(tx.status, TransactionStatus::Processing);

    wallet
        .reconciler
        .dispatch(WalletEvent::SwapStatusChanged {
            context: PaymentContext::Deposit,
            swap_tracker: "swap-onramp".to_string(),
            status: SwapStatus::Complete,
            error: None,
        })
        .await;

    let tx = wallet.store.find_by_id(snapshot.tx_id).await.unwrap().unwrap();
    assert_eq!(tx.status, TransactionStatus::Complete);
    assert_eq!(
        wallet.ledger.wallet_meta(user_id).await.current_balance_msats,
        2_000_000
    );
}

#[tokio::test]
async fn test_balance_conservation_across_deposit_and_withdrawal() {
    let wallet = wallet_with_fee(0);
    let user_id = Uuid::new_v4();

    // Settle a 100,000 msat deposit (5 fiat at the fixed rate).
    wallet
        .deposits
        .execute(DepositCommand::new(user_id, dec!(5)))
        .await
        .unwrap();
    wallet.reconciler.dispatch(payment_received("op-100000")).await;

    // Withdraw 30,000 msats over a direct invoice (zero fee).
    wallet.rail.script_invoice("lnbc-w", 30_000);
    let snapshot = wallet
        .withdrawals
        .execute(WithdrawCommand::new(user_id).with_lightning("lnbc-w".to_string()))
        .await
        .unwrap();

    assert_eq!(snapshot.meta.total_deposits_msats, 100_000);
    assert_eq!(snapshot.meta.total_withdrawals_msats, 30_000);
    assert_eq!(snapshot.meta.current_balance_msats, 70_000);
}

#[tokio::test]
async fn test_lnurl_withdraw_end_to_end() {
    let wallet = wallet_with_fee(500);
    let user_id = Uuid::new_v4();

    // Fund the wallet with a settled 100,000 msat deposit.
    wallet
        .deposits
        .execute(DepositCommand::new(user_id, dec!(5)))
        .await
        .unwrap();
    wallet.reconciler.dispatch(payment_received("op-100000")).await;

    // Mint the withdraw point.
    let snapshot = wallet
        .withdrawals
        .execute(WithdrawCommand::new(user_id).with_lnurl())
        .await
        .unwrap();
    let pending = wallet.store.find_by_id(snapshot.tx_id).await.unwrap().unwrap();
    assert_eq!(pending.status, TransactionStatus::Pending);
    assert_eq!(pending.amount_msats.value(), 100_000);

    // A front-end validates the scan before the wallet claims.
    let found = wallet.lnurl.find_pending("k1-flow").await.unwrap().unwrap();
    assert_eq!(found.id, snapshot.tx_id);

    // The redeeming wallet presents its own 40,000 msat invoice.
    wallet.rail.script_invoice("lnbc-claim", 40_000);
    let result = wallet.lnurl.process_callback("k1-flow", "lnbc-claim").await;
    assert!(result.success, "claim failed: {}", result.message);

    let settled = wallet.store.find_by_id(snapshot.tx_id).await.unwrap().unwrap();
    assert_eq!(settled.status, TransactionStatus::Complete);
    // Provisional 100,000 corrected to 40,000 + 500 fee.
    assert_eq!(settled.amount_msats.value(), 40_500);

    let meta = wallet.ledger.wallet_meta(user_id).await;
    assert_eq!(meta.current_balance_msats, 100_000 - 40_500);

    // The point is spent: a second claim is refused.
    let second = wallet.lnurl.process_callback("k1-flow", "lnbc-claim").await;
    assert!(!second.success);
}

#[tokio::test]
async fn test_failed_deposit_is_resumable() {
    let wallet = wallet_with_fee(0);
    let user_id = Uuid::new_v4();

    let snapshot = wallet
        .deposits
        .execute(DepositCommand::new(user_id, dec!(100)))
        .await
        .unwrap();

    wallet
        .reconciler
        .dispatch(WalletEvent::PaymentFailed {
            context: PaymentContext::Deposit,
            operation_id: "op-2000000".to_string(),
        })
        .await;
    let tx = wallet.store.find_by_id(snapshot.tx_id).await.unwrap().unwrap();
    assert_eq!(tx.status, TransactionStatus::Failed);

    // Resuming re-quotes and rewinds the same record to pending.
    wallet
        .deposits
        .resume(ContinueDepositCommand::new(user_id, snapshot.tx_id, dec!(250)))
        .await
        .unwrap();

    let tx = wallet.store.find_by_id(snapshot.tx_id).await.unwrap().unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert_eq!(tx.amount_msats.value(), 5_000_000);
    assert_eq!(tx.payment_tracker, "op-5000000");
}

#[tokio::test]
async fn test_unsettled_deposit_cannot_fund_a_withdrawal() {
    let wallet = wallet_with_fee(0);
    let user_id = Uuid::new_v4();

    // Deposit initiated but never confirmed by the rail.
    wallet
        .deposits
        .execute(DepositCommand::new(user_id, dec!(100)))
        .await
        .unwrap();

    wallet.rail.script_invoice("lnbc-w", 1_000);
    let result = wallet
        .withdrawals
        .execute(WithdrawCommand::new(user_id).with_lightning("lnbc-w".to_string()))
        .await;

    assert!(result.is_err());
}
