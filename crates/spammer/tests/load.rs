//! Integration tests for the load generator against an in-memory ledger.

mod fixtures;

use fixtures::{open_funded, sink_address, MockLedger};
use std::sync::Arc;
use txflood_spammer::{AccountPool, DerivationEngine, LoadGenerator, SpamError};

const ROOT_SEED: [u8; 32] = [7u8; 32];

#[tokio::test]
async fn test_single_account_exhausts_quota() {
    let ledger = Arc::new(MockLedger::new());
    let receiver = sink_address(&ledger);
    let account = open_funded(&ledger, &ROOT_SEED, 1_000, 10, Some(receiver)).await;
    let address = account.address();

    let generator = LoadGenerator::new(Arc::clone(&ledger));
    let report = generator
        .run(AccountPool::from_accounts(vec![account]), 5)
        .await
        .unwrap();

    assert_eq!(report.total_submitted, 5);
    assert_eq!(report.total_confirmed, 5);
    assert_eq!(report.accounts_retired, 1);
    assert_eq!(ledger.broadcast_count(), 5);

    // First send drains everything above the (fee + 1) * 5 reservation,
    // the rest move one unit each: the account lands on exactly 1.
    assert_eq!(ledger.balance_of(&address), 1);

    // Sequences were accepted strictly in order, no gaps.
    assert_eq!(ledger.history_of(&address), vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn test_derive_then_flood_end_to_end() {
    let ledger = Arc::new(MockLedger::new());
    let receiver = sink_address(&ledger);
    let root = open_funded(&ledger, &ROOT_SEED, 1_000_000, 10, Some(receiver)).await;

    let engine = DerivationEngine::new(Arc::clone(&ledger));
    let pool = engine.derive(root, 4).await.unwrap();

    let generator = LoadGenerator::new(Arc::clone(&ledger));
    let report = generator.run(pool, 5).await.unwrap();

    assert_eq!(report.total_confirmed, 20);
    assert_eq!(report.accounts_retired, 4);
    // 3 splits + 20 load transfers.
    assert_eq!(ledger.broadcast_count(), 23);
}

#[tokio::test]
async fn test_broadcast_failure_stops_the_run() {
    let ledger = Arc::new(MockLedger::new());
    let receiver = sink_address(&ledger);
    let account = open_funded(&ledger, &ROOT_SEED, 1_000, 10, Some(receiver)).await;

    // Accept two sends, reject the third.
    ledger.fail_after(2);

    let generator = LoadGenerator::new(Arc::clone(&ledger));
    let err = generator
        .run(AccountPool::from_accounts(vec![account]), 5)
        .await
        .unwrap_err();
    assert!(matches!(err, SpamError::Broadcast(_)), "got {err:?}");

    // A single account sends serially, so nothing follows the failure.
    assert_eq!(ledger.broadcast_count(), 3);
    assert_eq!(generator.stats().confirmed.load(std::sync::atomic::Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_underfunded_account_is_balance_underflow() {
    let ledger = Arc::new(MockLedger::new());
    let receiver = sink_address(&ledger);
    // (fee + 1) * 5 = 55 > 54: the first send cannot reserve its quota.
    let account = open_funded(&ledger, &ROOT_SEED, 54, 10, Some(receiver)).await;

    let generator = LoadGenerator::new(Arc::clone(&ledger));
    let err = generator
        .run(AccountPool::from_accounts(vec![account]), 5)
        .await
        .unwrap_err();
    assert!(matches!(err, SpamError::BalanceUnderflow { .. }), "got {err:?}");
    assert_eq!(ledger.broadcast_count(), 0);
}

#[tokio::test]
async fn test_run_prepared_skips_exhausted_accounts() {
    let ledger = Arc::new(MockLedger::new());
    let receiver = sink_address(&ledger);

    let mut live = open_funded(&ledger, &[1u8; 32], 1_000, 10, Some(receiver)).await;
    live.remaining_sends = 3;
    let mut spent = open_funded(&ledger, &[2u8; 32], 1_000, 10, Some(receiver)).await;
    spent.remaining_sends = 0;
    let spent_address = spent.address();

    let generator = LoadGenerator::new(Arc::clone(&ledger));
    let report = generator
        .run_prepared(AccountPool::from_accounts(vec![live, spent]), 3)
        .await
        .unwrap();

    assert_eq!(report.total_confirmed, 3);
    assert_eq!(report.accounts_retired, 1);
    assert!(ledger.history_of(&spent_address).is_empty());
}

#[tokio::test]
async fn test_empty_pool_is_a_noop() {
    let ledger = Arc::new(MockLedger::new());
    let generator = LoadGenerator::new(Arc::clone(&ledger));
    let report = generator
        .run(AccountPool::from_accounts(Vec::new()), 5)
        .await
        .unwrap();
    assert_eq!(report.total_submitted, 0);
    assert_eq!(ledger.broadcast_count(), 0);
}
