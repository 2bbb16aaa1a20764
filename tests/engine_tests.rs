//! Whole-engine test over file-backed storage.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tempfile::tempdir;

use flagship::prelude::*;
use flagship::storage::{FileStorage, Storage};

#[tokio::test]
async fn test_pool_vote_survives_restart() {
    let dir = tempdir().unwrap();
    let storage: Arc<dyn Storage> = Arc::new(FileStorage::open(dir.path(), None).unwrap());
    let members: Vec<MemberId> = (0..4).map(|i| MemberId::new(format!("member-{}", i))).collect();
    let membership = Arc::new(StaticMembership::from_members(members.clone()));
    let clock = Arc::new(ManualClock::new(Utc::now()));

    let manager = GovernanceManager::open(
        storage.clone(),
        membership.clone(),
        clock.clone(),
        GovernanceSettings::default(),
    )
    .await
    .unwrap();

    for member in &members {
        manager.ledger().credit_wallet(member, Amount::new(100)).await.unwrap();
        manager
            .ledger()
            .contribute_from_member(member, Amount::new(75), None)
            .await
            .unwrap();
    }

    let draft = ProjectDraft {
        title: "Playground".to_string(),
        description: "Swings and a sandpit".to_string(),
        category: "children".to_string(),
        funding_goal: Amount::new(250),
        creator: members[0].clone(),
    };
    let id = manager
        .create_flagship(draft, FundingSource::Pool, None)
        .await
        .unwrap()
        .flagship
        .id;
    for member in &members[..3] {
        manager.cast_vote(&id, member, VoteChoice::Approve).await.unwrap();
    }
    drop(manager);

    clock.advance(Duration::days(15));
    let reopened = GovernanceManager::open(storage, membership, clock, GovernanceSettings::default())
        .await
        .unwrap();
    assert_eq!(reopened.votes(&id).await.unwrap().len(), 3);

    let report = reopened.finalize_vote(&id).await.unwrap();
    assert_eq!(
        report.outcome,
        FinalizationOutcome::Funded {
            disbursed: Amount::new(250)
        }
    );
    assert_eq!(reopened.ledger().fund_balance(FundType::Pool).await, Amount::new(50));
    assert_eq!(reopened.ledger().wallet_balance(&members[3]).await, Amount::new(25));
    assert!(reopened.ledger().reconcile(FundType::Pool).await.consistent);
}
