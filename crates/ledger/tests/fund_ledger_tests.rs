//! Tests for the fund ledger service
//!
//! These exercise the ledger through its transactional front end: failed
//! operations must leave every balance untouched, and concurrent callers must
//! never drive a wallet or fund negative.

use std::sync::Arc;

use chrono::Utc;
use proptest::prelude::*;

use flagship_common::{Amount, Clock, ManualClock, MemberId};
use flagship_ledger::{FundLedger, FundType, LedgerBook, LedgerError};
use flagship_storage::TxStore;

fn setup_ledger() -> FundLedger<LedgerBook> {
    let store = Arc::new(TxStore::<LedgerBook>::in_memory());
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(Utc::now()));
    FundLedger::new(store, clock)
}

#[tokio::test]
async fn test_contribution_exceeding_wallet_changes_nothing() {
    let ledger = setup_ledger();
    let member = MemberId::new("member-e");
    ledger.credit_wallet(&member, Amount::new(20)).await.unwrap();
    ledger
        .contribute_from_operator(FundType::Pool, Amount::new(500), None)
        .await
        .unwrap();

    let result = ledger
        .contribute_from_member(&member, Amount::new(30), None)
        .await;

    assert!(matches!(result, Err(LedgerError::InsufficientBalance(_))));
    assert_eq!(ledger.wallet_balance(&member).await, Amount::new(20));
    assert_eq!(ledger.fund_balance(FundType::Pool).await, Amount::new(500));
    assert_eq!(ledger.contributions(FundType::Pool).await.len(), 1);
}

#[tokio::test]
async fn test_operator_and_member_contributions_recorded() {
    let ledger = setup_ledger();
    let member = MemberId::new("member-1");
    ledger.credit_wallet(&member, Amount::new(100)).await.unwrap();

    ledger
        .contribute_from_member(&member, Amount::new(40), Some("monthly".to_string()))
        .await
        .unwrap();
    ledger
        .contribute_from_operator(FundType::Reserve, Amount::new(10_000), Some("seed".to_string()))
        .await
        .unwrap();

    let pool = ledger.contributions(FundType::Pool).await;
    assert_eq!(pool.len(), 1);
    assert_eq!(pool[0].contributor, Some(member.clone()));
    assert_eq!(pool[0].note.as_deref(), Some("monthly"));

    let reserve = ledger.contributions(FundType::Reserve).await;
    assert_eq!(reserve.len(), 1);
    assert!(reserve[0].is_operator);
    assert!(reserve[0].contributor.is_none());

    let summaries = ledger.summaries().await;
    assert_eq!(summaries[0].fund_type, FundType::Reserve);
    assert_eq!(summaries[0].balance, Amount::new(10_000));
    assert_eq!(summaries[1].balance, Amount::new(40));
}

#[tokio::test]
async fn test_concurrent_contributions_respect_wallet() {
    let ledger = setup_ledger();
    let member = MemberId::new("member-busy");
    ledger.credit_wallet(&member, Amount::new(100)).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let ledger = ledger.clone();
        let member = member.clone();
        handles.push(tokio::spawn(async move {
            ledger.contribute_from_member(&member, Amount::new(25), None).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(e) => assert!(matches!(e, LedgerError::InsufficientBalance(_))),
        }
    }

    assert_eq!(succeeded, 4);
    assert_eq!(ledger.wallet_balance(&member).await, Amount::zero());
    assert_eq!(ledger.fund_balance(FundType::Pool).await, Amount::new(100));
    assert!(ledger.reconcile(FundType::Pool).await.consistent);
}

#[derive(Debug, Clone)]
enum Op {
    Wallet(u32),
    Member(u32),
    Operator(bool, u32),
    Disburse(bool, u32, u32),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u32..500).prop_map(Op::Wallet),
        (1u32..500).prop_map(Op::Member),
        (any::<bool>(), 1u32..500).prop_map(|(r, a)| Op::Operator(r, a)),
        (any::<bool>(), 1u32..500, 0u32..500).prop_map(|(r, a, n)| Op::Disburse(r, a, n)),
    ]
}

fn fund(reserve: bool) -> FundType {
    if reserve {
        FundType::Reserve
    } else {
        FundType::Pool
    }
}

proptest! {
    #[test]
    fn prop_balance_matches_records(ops in proptest::collection::vec(op_strategy(), 1..60)) {
        let now = Utc::now();
        let member = MemberId::new("prop-member");
        let mut book = LedgerBook::default();

        for op in ops {
            let before = book.clone();
            let result = match op {
                Op::Wallet(a) => book.credit_wallet(&member, Amount::new(a as i64), now).map(|_| ()),
                Op::Member(a) => book.contribute_from_member(&member, Amount::new(a as i64), None, now).map(|_| ()),
                Op::Operator(r, a) => book.contribute_from_operator(fund(r), Amount::new(a as i64), None, now).map(|_| ()),
                Op::Disburse(r, a, n) => book
                    .disburse(fund(r), "flagship-prop", Amount::new(a as i64), Amount::new(n as i64), now)
                    .map(|_| ()),
            };
            if result.is_err() {
                prop_assert_eq!(&book, &before);
            }

            for fund_type in [FundType::Reserve, FundType::Pool] {
                let audit = book.reconcile(fund_type);
                prop_assert!(audit.consistent);
                prop_assert!(!audit.balance.is_negative());
            }
            prop_assert!(!book.wallet_balance(&member).is_negative());
        }
    }
}
