//! Who may vote.
//!
//! The engine does not manage users itself; it asks a
//! [`MembershipProvider`] whether a member is an eligible voter and how many
//! eligible voters there are.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use flagship_common::MemberId;

use crate::GovernanceResult;

#[async_trait]
pub trait MembershipProvider: Send + Sync {
    async fn is_eligible_voter(&self, member: &MemberId) -> GovernanceResult<bool>;

    async fn eligible_voter_count(&self) -> GovernanceResult<u64>;
}

/// In-process membership list
#[derive(Debug, Default)]
pub struct StaticMembership {
    voters: RwLock<BTreeSet<MemberId>>,
}

impl StaticMembership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_members(members: impl IntoIterator<Item = MemberId>) -> Self {
        Self {
            voters: RwLock::new(members.into_iter().collect()),
        }
    }

    /// Returns false if the member was already eligible
    pub async fn grant(&self, member: MemberId) -> bool {
        let added = self.voters.write().await.insert(member.clone());
        if added {
            info!(member = %member, "Granted voting role");
        }
        added
    }

    /// Returns false if the member was not eligible
    pub async fn revoke(&self, member: &MemberId) -> bool {
        let removed = self.voters.write().await.remove(member);
        if removed {
            info!(member = %member, "Revoked voting role");
        }
        removed
    }

    pub async fn members(&self) -> Vec<MemberId> {
        self.voters.read().await.iter().cloned().collect()
    }
}

#[async_trait]
impl MembershipProvider for StaticMembership {
    async fn is_eligible_voter(&self, member: &MemberId) -> GovernanceResult<bool> {
        Ok(self.voters.read().await.contains(member))
    }

    async fn eligible_voter_count(&self) -> GovernanceResult<u64> {
        Ok(self.voters.read().await.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_grant_and_revoke() {
        let membership = StaticMembership::from_members(vec![MemberId::new("a"), MemberId::new("b")]);
        assert_eq!(membership.eligible_voter_count().await.unwrap(), 2);

        assert!(!membership.grant(MemberId::new("a")).await);
        assert!(membership.grant(MemberId::new("c")).await);
        assert!(membership.revoke(&MemberId::new("a")).await);
        assert!(!membership.revoke(&MemberId::new("zed")).await);

        assert!(!membership.is_eligible_voter(&MemberId::new("a")).await.unwrap());
        assert!(membership.is_eligible_voter(&MemberId::new("c")).await.unwrap());
        assert_eq!(
            membership.members().await,
            vec![MemberId::new("b"), MemberId::new("c")]
        );
    }

    #[test]
    fn test_empty_membership() {
        let membership = StaticMembership::new();
        let count = tokio_test::block_on(membership.eligible_voter_count()).unwrap();
        assert_eq!(count, 0);
    }
}
