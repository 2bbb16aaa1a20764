//! Community voting on Pool flagships.
//!
//! One vote per member per flagship, changeable until the deadline. After the
//! deadline a single finalization tallies the votes and decides the outcome:
//!
//! 1. no votes, or a table share above the table threshold: tabled
//! 2. an approve share at or above the approval threshold: approved, and
//!    funded from the Pool if it can cover the remaining need
//! 3. anything else: rejected

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use flagship_common::{Amount, MemberId, Timestamp};
use flagship_config::GovernanceSettings;
use flagship_ledger::FundType;

use crate::state::GovernanceState;
use crate::status::{FlagshipEvent, FlagshipStatus};
use crate::{GovernanceError, GovernanceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteChoice {
    Approve,
    Reject,
    /// Send the flagship back for later reconsideration
    Table,
}

impl fmt::Display for VoteChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteChoice::Approve => write!(f, "approve"),
            VoteChoice::Reject => write!(f, "reject"),
            VoteChoice::Table => write!(f, "table"),
        }
    }
}

impl FromStr for VoteChoice {
    type Err = GovernanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approve" | "yes" => Ok(VoteChoice::Approve),
            "reject" | "no" => Ok(VoteChoice::Reject),
            "table" => Ok(VoteChoice::Table),
            other => Err(GovernanceError::Validation(format!("unknown vote choice '{}'", other))),
        }
    }
}

/// A member's current vote on a flagship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub flagship_id: String,
    pub voter: MemberId,
    pub choice: VoteChoice,
    /// Voting round the vote belongs to
    pub round: u32,
    pub cast_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoteTally {
    pub approve: u64,
    pub reject: u64,
    pub table: u64,
    pub total: u64,
    /// `approve / total`, zero when nobody voted
    pub approval_rate: Decimal,
    /// `table / total`, zero when nobody voted
    pub table_rate: Decimal,
}

impl VoteTally {
    pub fn from_votes<'a>(votes: impl IntoIterator<Item = &'a Vote>) -> Self {
        let mut tally = VoteTally::default();
        for vote in votes {
            match vote.choice {
                VoteChoice::Approve => tally.approve += 1,
                VoteChoice::Reject => tally.reject += 1,
                VoteChoice::Table => tally.table += 1,
            }
            tally.total += 1;
        }

        if tally.total > 0 {
            let total = Decimal::from(tally.total);
            tally.approval_rate = Decimal::from(tally.approve) / total;
            tally.table_rate = Decimal::from(tally.table) / total;
        }
        tally
    }
}

/// What the votes alone decide, before looking at the Pool balance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteDecision {
    Approved,
    Tabled,
    Rejected,
}

/// Thresholds applied at finalization
#[derive(Debug, Clone, PartialEq)]
pub struct VotingRules {
    pub approval_threshold: Decimal,
    pub table_threshold: Decimal,
}

impl From<&GovernanceSettings> for VotingRules {
    fn from(settings: &GovernanceSettings) -> Self {
        Self {
            approval_threshold: settings.approval_threshold,
            table_threshold: settings.table_threshold,
        }
    }
}

impl VotingRules {
    pub fn decide(&self, tally: &VoteTally) -> VoteDecision {
        if tally.total == 0 || tally.table_rate > self.table_threshold {
            VoteDecision::Tabled
        } else if tally.approval_rate >= self.approval_threshold {
            VoteDecision::Approved
        } else {
            VoteDecision::Rejected
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FinalizationOutcome {
    /// Approved and paid from the Pool
    Funded { disbursed: Amount },
    /// Approved but the Pool could not cover the remaining need; the flagship stays in voting
    ApprovedUnfunded { shortfall: Amount },
    Tabled,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizationReport {
    pub flagship_id: String,
    pub tally: VoteTally,
    pub outcome: FinalizationOutcome,
    pub status: FlagshipStatus,
}

impl GovernanceState {
    /// Record or replace `voter`'s vote. Eligibility is checked by the caller.
    pub fn cast_vote(
        &mut self,
        flagship_id: &str,
        voter: &MemberId,
        choice: VoteChoice,
        now: Timestamp,
    ) -> GovernanceResult<Vote> {
        let flagship = self.flagship(flagship_id)?;
        if !flagship.is_open_for_votes(now) {
            return Err(GovernanceError::State(format!(
                "flagship {} is not open for votes (status {})",
                flagship_id, flagship.status
            )));
        }
        let round = flagship.round;

        let votes = self.votes.entry(flagship_id.to_string()).or_default();
        let vote = match votes.get_mut(voter) {
            Some(existing) => {
                existing.choice = choice;
                existing.updated_at = now;
                existing.clone()
            }
            None => {
                let vote = Vote {
                    flagship_id: flagship_id.to_string(),
                    voter: voter.clone(),
                    choice,
                    round,
                    cast_at: now,
                    updated_at: now,
                };
                votes.insert(voter.clone(), vote.clone());
                vote
            }
        };
        Ok(vote)
    }

    pub fn tally(&self, flagship_id: &str) -> GovernanceResult<VoteTally> {
        self.flagship(flagship_id)?;
        Ok(VoteTally::from_votes(
            self.votes.get(flagship_id).into_iter().flat_map(|votes| votes.values()),
        ))
    }

    /// Close the vote on a flagship whose deadline has passed
    pub fn finalize_vote(
        &mut self,
        flagship_id: &str,
        rules: &VotingRules,
        now: Timestamp,
    ) -> GovernanceResult<FinalizationReport> {
        let flagship = self.flagship(flagship_id)?;
        if flagship.status != FlagshipStatus::Voting {
            return Err(GovernanceError::State(format!(
                "flagship {} is {}, there is no vote to finalize",
                flagship_id, flagship.status
            )));
        }
        if !flagship.is_due(now) {
            return Err(GovernanceError::State(format!(
                "voting on flagship {} is still open",
                flagship_id
            )));
        }
        let project_id = flagship.project_id.clone();

        let tally = self.tally(flagship_id)?;
        let outcome = match rules.decide(&tally) {
            VoteDecision::Tabled => {
                let flagship = self.flagship_mut(flagship_id)?;
                flagship.transition(FlagshipEvent::VoteTabled, now)?;
                flagship.tabled_at = Some(now);
                FinalizationOutcome::Tabled
            }
            VoteDecision::Rejected => {
                self.flagship_mut(flagship_id)?
                    .transition(FlagshipEvent::VoteRejected, now)?;
                FinalizationOutcome::Rejected
            }
            VoteDecision::Approved => {
                let remaining = self.project(&project_id)?.remaining_need();
                let balance = self.ledger.fund_balance(FundType::Pool);

                if remaining.is_zero() {
                    self.flagship_mut(flagship_id)?
                        .transition(FlagshipEvent::GoalReached, now)?;
                    FinalizationOutcome::Funded { disbursed: Amount::zero() }
                } else if balance >= remaining {
                    let disbursement = self.disburse_to_flagship(FundType::Pool, flagship_id, remaining, now)?;
                    FinalizationOutcome::Funded {
                        disbursed: disbursement.amount,
                    }
                } else {
                    self.flagship_mut(flagship_id)?
                        .transition(FlagshipEvent::VoteApprovedUnfunded, now)?;
                    FinalizationOutcome::ApprovedUnfunded {
                        shortfall: remaining - balance,
                    }
                }
            }
        };

        Ok(FinalizationReport {
            flagship_id: flagship_id.to_string(),
            tally,
            outcome,
            status: self.flagship(flagship_id)?.status,
        })
    }

    /// Voting flagships past their deadline, earliest deadline first
    pub fn due_for_finalization(&self, now: Timestamp) -> Vec<String> {
        let mut due: Vec<_> = self.flagships.values().filter(|f| f.is_due(now)).collect();
        due.sort_by_key(|f| (f.voting_deadline, f.id.clone()));
        due.into_iter().map(|f| f.id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flagship::FundingSource;
    use crate::project::ProjectDraft;
    use chrono::{Duration, Utc};

    fn rules() -> VotingRules {
        VotingRules::from(&GovernanceSettings::default())
    }

    fn vote(choice: VoteChoice) -> Vote {
        let now = Utc::now();
        Vote {
            flagship_id: "flagship-1".to_string(),
            voter: MemberId::new("v"),
            choice,
            round: 1,
            cast_at: now,
            updated_at: now,
        }
    }

    fn tally_of(approve: usize, reject: usize, table: usize) -> VoteTally {
        let votes: Vec<_> = std::iter::repeat(VoteChoice::Approve)
            .take(approve)
            .chain(std::iter::repeat(VoteChoice::Reject).take(reject))
            .chain(std::iter::repeat(VoteChoice::Table).take(table))
            .map(vote)
            .collect();
        VoteTally::from_votes(&votes)
    }

    fn pool_flagship(state: &mut GovernanceState, goal: i64, now: Timestamp) -> String {
        let draft = ProjectDraft {
            title: "Bike repair cafe".to_string(),
            description: String::new(),
            category: "mobility".to_string(),
            funding_goal: Amount::new(goal),
            creator: MemberId::new("carol"),
        };
        state
            .create_flagship(draft, FundingSource::Pool, None, Duration::days(14), now)
            .unwrap()
            .flagship
            .id
    }

    #[test]
    fn test_decision_order() {
        let rules = rules();
        assert_eq!(rules.decide(&tally_of(0, 0, 0)), VoteDecision::Tabled);
        assert_eq!(rules.decide(&tally_of(4, 0, 6)), VoteDecision::Tabled);
        // exactly half tabled is not above the threshold
        assert_eq!(rules.decide(&tally_of(5, 0, 5)), VoteDecision::Rejected);
        assert_eq!(rules.decide(&tally_of(7, 3, 0)), VoteDecision::Approved);
        assert_eq!(rules.decide(&tally_of(6, 4, 0)), VoteDecision::Rejected);
    }

    #[test]
    fn test_tally_rates() {
        let tally = tally_of(3, 1, 0);
        assert_eq!(tally.total, 4);
        assert_eq!(tally.approval_rate, Decimal::new(75, 2));
        assert_eq!(tally.table_rate, Decimal::ZERO);
    }

    #[test]
    fn test_vote_replaced_not_duplicated() {
        let now = Utc::now();
        let mut state = GovernanceState::default();
        let id = pool_flagship(&mut state, 100, now);
        let voter = MemberId::new("dave");

        state.cast_vote(&id, &voter, VoteChoice::Reject, now).unwrap();
        let later = now + Duration::hours(1);
        let vote = state.cast_vote(&id, &voter, VoteChoice::Approve, later).unwrap();

        assert_eq!(vote.cast_at, now);
        assert_eq!(vote.updated_at, later);
        let tally = state.tally(&id).unwrap();
        assert_eq!((tally.total, tally.approve, tally.reject), (1, 1, 0));
    }

    #[test]
    fn test_vote_window() {
        let now = Utc::now();
        let mut state = GovernanceState::default();
        let id = pool_flagship(&mut state, 100, now);
        let voter = MemberId::new("erin");

        let deadline = now + Duration::days(14);
        assert!(matches!(
            state.cast_vote(&id, &voter, VoteChoice::Approve, deadline),
            Err(GovernanceError::State(_))
        ));
        assert!(matches!(
            state.finalize_vote(&id, &rules(), deadline - Duration::seconds(1)),
            Err(GovernanceError::State(_))
        ));
        assert_eq!(state.due_for_finalization(deadline), vec![id]);
    }

    #[test]
    fn test_approved_without_pool_money_stays_voting() {
        let now = Utc::now();
        let mut state = GovernanceState::default();
        let id = pool_flagship(&mut state, 100, now);
        state
            .ledger
            .contribute_from_operator(FundType::Pool, Amount::new(30), None, now)
            .unwrap();
        state.cast_vote(&id, &MemberId::new("frank"), VoteChoice::Approve, now).unwrap();

        let report = state.finalize_vote(&id, &rules(), now + Duration::days(15)).unwrap();
        assert_eq!(
            report.outcome,
            FinalizationOutcome::ApprovedUnfunded {
                shortfall: Amount::new(70)
            }
        );
        assert_eq!(report.status, FlagshipStatus::Voting);
        assert_eq!(state.ledger.fund_balance(FundType::Pool), Amount::new(30));
    }

    #[test]
    fn test_outcome_serializes_tagged() {
        let json = serde_json::to_value(FinalizationOutcome::ApprovedUnfunded {
            shortfall: Amount::new(70),
        })
        .unwrap();
        assert_eq!(json["outcome"], "approved_unfunded");
        assert_eq!(serde_json::to_value(FinalizationOutcome::Tabled).unwrap()["outcome"], "tabled");
    }
}
