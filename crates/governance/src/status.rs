//! Flagship status machine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{GovernanceError, GovernanceResult};

/// Where a flagship stands in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagshipStatus {
    /// Reserve flagship waiting for disbursements
    Active,
    /// Pool flagship open for votes, or approved and waiting for Pool money
    Voting,
    /// Funding goal met
    Funded,
    /// Sent back by the community, can be reactivated by sponsors
    Tabled,
    /// Voted down for good
    Rejected,
}

/// Something that happened to a flagship
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagshipEvent {
    /// A disbursement brought the project to its goal
    GoalReached,
    /// The vote passed but the Pool could not cover the remaining need
    VoteApprovedUnfunded,
    VoteTabled,
    VoteRejected,
    /// Enough sponsors joined a tabled flagship
    Reactivated,
}

impl FlagshipStatus {
    /// Next status after `event`, or a state error if the transition is not allowed
    pub fn apply(self, event: FlagshipEvent) -> GovernanceResult<FlagshipStatus> {
        use FlagshipEvent::*;
        use FlagshipStatus::*;

        match (self, event) {
            (Active, GoalReached) | (Voting, GoalReached) => Ok(Funded),
            (Voting, VoteApprovedUnfunded) => Ok(Voting),
            (Voting, VoteTabled) => Ok(Tabled),
            (Voting, VoteRejected) => Ok(Rejected),
            (Tabled, Reactivated) => Ok(Voting),
            (status, event) => Err(GovernanceError::State(format!(
                "cannot apply {:?} to a flagship in status {}",
                event, status
            ))),
        }
    }

    /// Funded and rejected flagships never change again
    pub fn is_final(&self) -> bool {
        matches!(self, FlagshipStatus::Funded | FlagshipStatus::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FlagshipStatus::Active => "active",
            FlagshipStatus::Voting => "voting",
            FlagshipStatus::Funded => "funded",
            FlagshipStatus::Tabled => "tabled",
            FlagshipStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for FlagshipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlagshipStatus {
    type Err = GovernanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(FlagshipStatus::Active),
            "voting" => Ok(FlagshipStatus::Voting),
            "funded" => Ok(FlagshipStatus::Funded),
            "tabled" => Ok(FlagshipStatus::Tabled),
            "rejected" => Ok(FlagshipStatus::Rejected),
            other => Err(GovernanceError::Validation(format!("unknown flagship status '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use FlagshipEvent::*;
    use FlagshipStatus::*;

    #[test]
    fn test_allowed_transitions() {
        assert_eq!(Active.apply(GoalReached).unwrap(), Funded);
        assert_eq!(Voting.apply(GoalReached).unwrap(), Funded);
        assert_eq!(Voting.apply(VoteApprovedUnfunded).unwrap(), Voting);
        assert_eq!(Voting.apply(VoteTabled).unwrap(), Tabled);
        assert_eq!(Voting.apply(VoteRejected).unwrap(), Rejected);
        assert_eq!(Tabled.apply(Reactivated).unwrap(), Voting);
    }

    #[test]
    fn test_final_statuses_reject_every_event() {
        for status in [Funded, Rejected] {
            assert!(status.is_final());
            for event in [GoalReached, VoteApprovedUnfunded, VoteTabled, VoteRejected, Reactivated] {
                assert!(matches!(status.apply(event), Err(GovernanceError::State(_))));
            }
        }
    }

    #[test]
    fn test_reserve_flagship_never_votes() {
        assert!(Active.apply(VoteTabled).is_err());
        assert!(Active.apply(Reactivated).is_err());
        assert!(Tabled.apply(GoalReached).is_err());
    }

    #[test]
    fn test_parse_status() {
        assert_eq!("Tabled".parse::<FlagshipStatus>().unwrap(), Tabled);
        assert!("paused".parse::<FlagshipStatus>().is_err());
    }
}
