//! Flagship lifecycle: creation, Reserve funding and removal.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use flagship_common::utils::generate_prefixed_uuid;
use flagship_common::{Amount, Timestamp};
use flagship_ledger::{Disbursement, FundType};

use crate::plans::PlanStatus;
use crate::project::{Project, ProjectDraft};
use crate::state::GovernanceState;
use crate::status::{FlagshipEvent, FlagshipStatus};
use crate::{GovernanceError, GovernanceResult};

/// Which fund pays for a flagship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FundingSource {
    /// Operator-directed, tied to a strategic plan
    Reserve,
    /// Community-directed, decided by vote
    Pool,
}

impl FundingSource {
    pub fn fund_type(&self) -> FundType {
        match self {
            FundingSource::Reserve => FundType::Reserve,
            FundingSource::Pool => FundType::Pool,
        }
    }
}

impl fmt::Display for FundingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.fund_type(), f)
    }
}

impl FromStr for FundingSource {
    type Err = GovernanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reserve" => Ok(FundingSource::Reserve),
            "pool" => Ok(FundingSource::Pool),
            other => Err(GovernanceError::Validation(format!("unknown funding source '{}'", other))),
        }
    }
}

/// A project promoted for funding from one of the two funds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flagship {
    pub id: String,
    pub project_id: String,
    /// Set exactly when the source is Reserve
    pub plan_id: Option<String>,
    pub funding_source: FundingSource,
    pub status: FlagshipStatus,
    /// Set for Pool flagships while a vote is (or was last) open
    pub voting_deadline: Option<Timestamp>,
    pub tabled_at: Option<Timestamp>,
    /// Voting round, starting at 1 for Pool flagships and bumped on reactivation
    pub round: u32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Flagship {
    pub(crate) fn transition(&mut self, event: FlagshipEvent, now: Timestamp) -> GovernanceResult<()> {
        self.status = self.status.apply(event)?;
        self.updated_at = now;
        Ok(())
    }

    /// Voting is open while the status is voting and the deadline is ahead
    pub fn is_open_for_votes(&self, now: Timestamp) -> bool {
        self.status == FlagshipStatus::Voting && self.voting_deadline.map_or(false, |deadline| now < deadline)
    }

    /// A voting flagship whose deadline has passed
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.status == FlagshipStatus::Voting && self.voting_deadline.map_or(false, |deadline| now >= deadline)
    }
}

/// A flagship joined with its project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagshipView {
    pub flagship: Flagship,
    pub project: Project,
}

/// Result of a Reserve disbursement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingReceipt {
    pub disbursement: Disbursement,
    pub flagship: FlagshipView,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagshipFilter {
    pub status: Option<FlagshipStatus>,
    pub funding_source: Option<FundingSource>,
}

impl FlagshipFilter {
    fn matches(&self, flagship: &Flagship) -> bool {
        self.status.map_or(true, |s| s == flagship.status)
            && self.funding_source.map_or(true, |s| s == flagship.funding_source)
    }
}

/// End of a voting round opened at `now`
pub(crate) fn voting_deadline(now: Timestamp, vote_duration: Duration) -> GovernanceResult<Timestamp> {
    now.checked_add_signed(vote_duration).ok_or_else(|| {
        GovernanceError::Validation(format!(
            "a {} day voting round starting at {} ends past the supported date range",
            vote_duration.num_days(),
            now
        ))
    })
}

impl GovernanceState {
    /// Create a project and its flagship in one step
    pub fn create_flagship(
        &mut self,
        draft: ProjectDraft,
        source: FundingSource,
        plan_id: Option<&str>,
        vote_duration: Duration,
        now: Timestamp,
    ) -> GovernanceResult<FlagshipView> {
        draft.validate()?;

        let plan_id = match (source, plan_id) {
            (FundingSource::Reserve, None) => {
                return Err(GovernanceError::Validation(
                    "reserve flagships must reference a strategic plan".to_string(),
                ))
            }
            (FundingSource::Reserve, Some(plan_id)) => {
                let plan = self
                    .plans
                    .get(plan_id)
                    .ok_or_else(|| GovernanceError::NotFound(format!("plan {}", plan_id)))?;
                if plan.status != PlanStatus::Active {
                    return Err(GovernanceError::Validation(format!(
                        "plan {} is {}, reserve flagships need an active plan",
                        plan_id, plan.status
                    )));
                }
                Some(plan.id.clone())
            }
            (FundingSource::Pool, Some(_)) => {
                return Err(GovernanceError::Validation(
                    "pool flagships must not reference a strategic plan".to_string(),
                ))
            }
            (FundingSource::Pool, None) => None,
        };

        let (status, voting_deadline, round) = match source {
            FundingSource::Reserve => (FlagshipStatus::Active, None, 0),
            FundingSource::Pool => (FlagshipStatus::Voting, Some(voting_deadline(now, vote_duration)?), 1),
        };

        let project = Project::from_draft(draft, now);
        let flagship = Flagship {
            id: generate_prefixed_uuid("flagship"),
            project_id: project.id.clone(),
            plan_id,
            funding_source: source,
            status,
            voting_deadline,
            tabled_at: None,
            round,
            created_at: now,
            updated_at: now,
        };

        self.projects.insert(project.id.clone(), project.clone());
        self.flagships.insert(flagship.id.clone(), flagship.clone());
        Ok(FlagshipView { flagship, project })
    }

    /// Operator-directed Reserve disbursement
    pub fn fund_from_reserve(
        &mut self,
        flagship_id: &str,
        amount: Amount,
        now: Timestamp,
    ) -> GovernanceResult<FundingReceipt> {
        let flagship = self.flagship(flagship_id)?;
        if flagship.funding_source != FundingSource::Reserve {
            return Err(GovernanceError::Validation(format!(
                "flagship {} is funded by vote from the pool",
                flagship_id
            )));
        }
        if flagship.status != FlagshipStatus::Active {
            return Err(GovernanceError::State(format!(
                "flagship {} is {} and cannot receive reserve money",
                flagship_id, flagship.status
            )));
        }

        let disbursement = self.disburse_to_flagship(FundType::Reserve, flagship_id, amount, now)?;
        let flagship = self.view(flagship_id)?;
        Ok(FundingReceipt { disbursement, flagship })
    }

    /// Move money from a fund into a flagship's project.
    ///
    /// Debits the fund, credits the project by the applied amount and marks
    /// the flagship funded when the goal is met, all against the same draft.
    pub(crate) fn disburse_to_flagship(
        &mut self,
        fund_type: FundType,
        flagship_id: &str,
        amount: Amount,
        now: Timestamp,
    ) -> GovernanceResult<Disbursement> {
        let project_id = self.flagship(flagship_id)?.project_id.clone();
        let remaining = self.project(&project_id)?.remaining_need();

        let disbursement = self
            .ledger
            .disburse(fund_type, flagship_id, amount, remaining, now)?;

        let goal_reached = self.project_mut(&project_id)?.credit(disbursement.amount, now);
        if goal_reached {
            self.flagship_mut(flagship_id)?
                .transition(FlagshipEvent::GoalReached, now)?;
        }
        Ok(disbursement)
    }

    pub fn view(&self, flagship_id: &str) -> GovernanceResult<FlagshipView> {
        let flagship = self.flagship(flagship_id)?.clone();
        let project = self.project(&flagship.project_id)?.clone();
        Ok(FlagshipView { flagship, project })
    }

    /// Flagships matching `filter`, oldest first
    pub fn list_flagships(&self, filter: &FlagshipFilter) -> Vec<FlagshipView> {
        let mut views: Vec<_> = self
            .flagships
            .values()
            .filter(|f| filter.matches(f))
            .filter_map(|f| self.view(&f.id).ok())
            .collect();
        views.sort_by(|a, b| {
            a.flagship
                .created_at
                .cmp(&b.flagship.created_at)
                .then_with(|| a.flagship.id.cmp(&b.flagship.id))
        });
        views
    }

    pub fn flagships_for_plan(&self, plan_id: &str) -> Vec<FlagshipView> {
        self.list_flagships(&FlagshipFilter::default())
            .into_iter()
            .filter(|v| v.flagship.plan_id.as_deref() == Some(plan_id))
            .collect()
    }

    /// Delete a flagship that never received money, with its project, votes and sponsors
    pub fn remove_flagship(&mut self, flagship_id: &str) -> GovernanceResult<FlagshipView> {
        let view = self.view(flagship_id)?;
        if view.flagship.status == FlagshipStatus::Funded
            || !self.ledger.disbursements_for(flagship_id).is_empty()
        {
            return Err(GovernanceError::State(format!(
                "flagship {} has received disbursements and cannot be removed",
                flagship_id
            )));
        }

        self.flagships.remove(flagship_id);
        self.projects.remove(&view.project.id);
        self.votes.remove(flagship_id);
        self.sponsors.remove(flagship_id);
        Ok(view)
    }
}
