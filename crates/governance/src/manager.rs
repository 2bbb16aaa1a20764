//! Governance manager
//!
//! Async facade over the transactional [`GovernanceState`]. Every mutating
//! call runs as one `TxStore` transaction: the membership lookup happens
//! first, then the state checks and all writes commit together or not at all.

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, error, info, warn};

use flagship_common::{Amount, Clock, MemberId, Timestamp};
use flagship_config::GovernanceSettings;
use flagship_ledger::{FundLedger, FundType};
use flagship_storage::{Storage, TxStore};

use crate::flagship::{FlagshipFilter, FlagshipView, FundingReceipt, FundingSource};
use crate::membership::MembershipProvider;
use crate::plans::{ReserveProgress, StrategicPlan};
use crate::project::ProjectDraft;
use crate::reactivation::{sponsors_needed, Sponsor, SponsorOutcome, SponsorshipStatus};
use crate::state::GovernanceState;
use crate::voting::{FinalizationOutcome, FinalizationReport, Vote, VoteChoice, VoteTally, VotingRules};
use crate::{GovernanceError, GovernanceResult};

/// Storage key of the committed governance snapshot
pub const STATE_KEY: &str = "governance/state";

pub struct GovernanceManager {
    store: Arc<TxStore<GovernanceState>>,
    ledger: FundLedger<GovernanceState>,
    membership: Arc<dyn MembershipProvider>,
    clock: Arc<dyn Clock>,
    settings: GovernanceSettings,
}

impl GovernanceManager {
    pub fn new(
        store: Arc<TxStore<GovernanceState>>,
        membership: Arc<dyn MembershipProvider>,
        clock: Arc<dyn Clock>,
        settings: GovernanceSettings,
    ) -> Self {
        let ledger = FundLedger::new(store.clone(), clock.clone());
        Self {
            store,
            ledger,
            membership,
            clock,
            settings,
        }
    }

    /// A manager whose state lives only in memory
    pub fn in_memory(
        membership: Arc<dyn MembershipProvider>,
        clock: Arc<dyn Clock>,
        settings: GovernanceSettings,
    ) -> Self {
        Self::new(Arc::new(TxStore::in_memory()), membership, clock, settings)
    }

    /// Open a manager persisted in `storage`, reloading the last committed state
    pub async fn open(
        storage: Arc<dyn Storage>,
        membership: Arc<dyn MembershipProvider>,
        clock: Arc<dyn Clock>,
        settings: GovernanceSettings,
    ) -> GovernanceResult<Self> {
        let store = TxStore::open(storage, STATE_KEY).await?;
        Ok(Self::new(Arc::new(store), membership, clock, settings))
    }

    /// The fund ledger sharing this manager's transactions
    pub fn ledger(&self) -> &FundLedger<GovernanceState> {
        &self.ledger
    }

    pub fn settings(&self) -> &GovernanceSettings {
        &self.settings
    }

    /// Clone of the committed state
    pub async fn snapshot(&self) -> GovernanceState {
        self.store.snapshot().await
    }

    fn vote_duration(&self) -> GovernanceResult<Duration> {
        Duration::try_days(self.settings.vote_duration_days).ok_or_else(|| {
            GovernanceError::Validation(format!(
                "vote duration of {} days is out of range",
                self.settings.vote_duration_days
            ))
        })
    }

    fn rules(&self) -> VotingRules {
        VotingRules::from(&self.settings)
    }

    fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // Strategic plans

    pub async fn create_plan(
        &self,
        title: &str,
        description: &str,
        vision: &str,
        funding_goal: Amount,
    ) -> GovernanceResult<StrategicPlan> {
        let now = self.now();
        let plan = self
            .store
            .transaction(|state| state.plans.create(title, description, vision, funding_goal, now))
            .await?;
        info!(plan_id = %plan.id, goal = %plan.funding_goal, "Created strategic plan: {}", plan.title);
        Ok(plan)
    }

    /// Complete a plan; returns the plan that is current afterwards
    pub async fn complete_plan(&self, plan_id: &str) -> GovernanceResult<Option<StrategicPlan>> {
        let now = self.now();
        let next = self
            .store
            .transaction(|state| state.plans.complete(plan_id, now))
            .await?;
        info!(plan_id = %plan_id, next_plan = ?next.as_ref().map(|p| &p.id), "Completed strategic plan");
        Ok(next)
    }

    pub async fn archive_plan(&self, plan_id: &str) -> GovernanceResult<StrategicPlan> {
        let plan = self.store.transaction(|state| state.plans.archive(plan_id)).await?;
        info!(plan_id = %plan_id, "Archived strategic plan");
        Ok(plan)
    }

    /// The active plan with the lowest ordering key
    pub async fn active_plan(&self) -> Option<StrategicPlan> {
        self.store.read(|state| state.plans.current().cloned()).await
    }

    pub async fn get_plan(&self, plan_id: &str) -> GovernanceResult<StrategicPlan> {
        self.store
            .read(|state| state.plans.get(plan_id).cloned())
            .await
            .ok_or_else(|| GovernanceError::NotFound(format!("plan {}", plan_id)))
    }

    pub async fn list_plans(&self) -> Vec<StrategicPlan> {
        self.store.read(|state| state.plans.list()).await
    }

    /// Reserve balance against the current plan's goal, if there is a current plan
    pub async fn reserve_progress(&self) -> Option<ReserveProgress> {
        self.store
            .read(|state| -> Option<ReserveProgress> {
                let plan = state.plans.current()?;
                Some(ReserveProgress::new(plan, state.ledger.fund_balance(FundType::Reserve)))
            })
            .await
    }

    // Flagships

    pub async fn create_flagship(
        &self,
        draft: ProjectDraft,
        source: FundingSource,
        plan_id: Option<&str>,
    ) -> GovernanceResult<FlagshipView> {
        let now = self.now();
        let duration = self.vote_duration()?;
        let view = self
            .store
            .transaction(|state| state.create_flagship(draft, source, plan_id, duration, now))
            .await?;
        info!(
            flagship_id = %view.flagship.id,
            source = %source,
            status = %view.flagship.status,
            goal = %view.project.funding_goal,
            "Created flagship: {}",
            view.project.title
        );
        Ok(view)
    }

    /// Operator-directed Reserve disbursement toward an active Reserve flagship
    pub async fn fund_from_reserve(&self, flagship_id: &str, amount: Amount) -> GovernanceResult<FundingReceipt> {
        let now = self.now();
        let result = self
            .store
            .transaction(|state| state.fund_from_reserve(flagship_id, amount, now))
            .await;

        match &result {
            Ok(receipt) => info!(
                flagship_id = %flagship_id,
                requested = %amount,
                disbursed = %receipt.disbursement.amount,
                status = %receipt.flagship.flagship.status,
                "Disbursed reserve money"
            ),
            Err(e) => warn!(flagship_id = %flagship_id, requested = %amount, "Reserve disbursement refused: {}", e),
        }
        result
    }

    pub async fn get_flagship(&self, flagship_id: &str) -> GovernanceResult<FlagshipView> {
        self.store.read(|state| state.view(flagship_id)).await
    }

    pub async fn list_flagships(&self, filter: &FlagshipFilter) -> Vec<FlagshipView> {
        self.store.read(|state| state.list_flagships(filter)).await
    }

    pub async fn flagships_for_plan(&self, plan_id: &str) -> GovernanceResult<Vec<FlagshipView>> {
        self.store
            .read(|state| -> GovernanceResult<Vec<FlagshipView>> {
                state
                    .plans
                    .get(plan_id)
                    .ok_or_else(|| GovernanceError::NotFound(format!("plan {}", plan_id)))?;
                Ok(state.flagships_for_plan(plan_id))
            })
            .await
    }

    pub async fn remove_flagship(&self, flagship_id: &str) -> GovernanceResult<FlagshipView> {
        let view = self
            .store
            .transaction(|state| state.remove_flagship(flagship_id))
            .await?;
        info!(flagship_id = %flagship_id, "Removed flagship");
        Ok(view)
    }

    // Voting

    /// Cast or replace a vote on a Pool flagship that is open for voting
    pub async fn cast_vote(&self, flagship_id: &str, voter: &MemberId, choice: VoteChoice) -> GovernanceResult<Vote> {
        self.get_flagship(flagship_id).await?;

        if !self.membership.is_eligible_voter(voter).await? {
            warn!(flagship_id = %flagship_id, voter = %voter, "Vote refused: not an eligible voter");
            return Err(GovernanceError::Authorization(format!(
                "{} is not an eligible voter",
                voter
            )));
        }

        let now = self.now();
        let vote = self
            .store
            .transaction(|state| state.cast_vote(flagship_id, voter, choice, now))
            .await?;
        info!(flagship_id = %flagship_id, voter = %voter, choice = %choice, "Vote recorded");
        Ok(vote)
    }

    pub async fn tally(&self, flagship_id: &str) -> GovernanceResult<VoteTally> {
        self.store.read(|state| state.tally(flagship_id)).await
    }

    /// Votes on a flagship in the order they were first cast
    pub async fn votes(&self, flagship_id: &str) -> GovernanceResult<Vec<Vote>> {
        self.store
            .read(|state| -> GovernanceResult<Vec<Vote>> {
                state.flagship(flagship_id)?;
                let mut votes = state.votes_for(flagship_id);
                votes.sort_by(|a, b| a.cast_at.cmp(&b.cast_at).then_with(|| a.voter.cmp(&b.voter)));
                Ok(votes)
            })
            .await
    }

    /// Tally and resolve a vote whose deadline has passed
    pub async fn finalize_vote(&self, flagship_id: &str) -> GovernanceResult<FinalizationReport> {
        let now = self.now();
        let rules = self.rules();
        let report = self
            .store
            .transaction(|state| state.finalize_vote(flagship_id, &rules, now))
            .await?;

        match &report.outcome {
            FinalizationOutcome::Funded { disbursed } => {
                info!(flagship_id = %flagship_id, disbursed = %disbursed, "Vote approved, flagship funded from pool")
            }
            FinalizationOutcome::ApprovedUnfunded { shortfall } => warn!(
                flagship_id = %flagship_id,
                shortfall = %shortfall,
                "Vote approved but pool cannot cover the remaining need"
            ),
            FinalizationOutcome::Tabled => info!(flagship_id = %flagship_id, "Vote tabled flagship"),
            FinalizationOutcome::Rejected => info!(flagship_id = %flagship_id, "Vote rejected flagship"),
        }
        debug!(
            flagship_id = %flagship_id,
            approve = report.tally.approve,
            reject = report.tally.reject,
            table = report.tally.table,
            "Final tally"
        );
        Ok(report)
    }

    /// Voting flagships whose deadline has passed
    pub async fn due_for_finalization(&self) -> Vec<String> {
        let now = self.now();
        self.store.read(|state| state.due_for_finalization(now)).await
    }

    /// Finalize every due vote, logging failures and moving on
    pub async fn finalize_due(&self) -> Vec<FinalizationReport> {
        let due = self.due_for_finalization().await;
        debug!("Finalizing {} due flagships", due.len());

        let mut reports = Vec::with_capacity(due.len());
        for flagship_id in due {
            match self.finalize_vote(&flagship_id).await {
                Ok(report) => reports.push(report),
                Err(e) => error!(flagship_id = %flagship_id, "Failed to finalize vote: {}", e),
            }
        }
        reports
    }

    // Reactivation

    async fn sponsors_needed(&self) -> GovernanceResult<u64> {
        let eligible = self.membership.eligible_voter_count().await?;
        Ok(sponsors_needed(eligible, self.settings.reactivation_threshold))
    }

    /// Sponsor a tabled flagship, reopening it for voting once enough members have
    pub async fn sponsor(&self, flagship_id: &str, sponsor: &MemberId) -> GovernanceResult<SponsorOutcome> {
        let needed = self.sponsors_needed().await?;
        let now = self.now();
        let duration = self.vote_duration()?;
        let outcome = self
            .store
            .transaction(|state| state.sponsor(flagship_id, sponsor, needed, duration, now))
            .await?;

        info!(
            flagship_id = %flagship_id,
            sponsor = %sponsor,
            current = outcome.current,
            needed = outcome.needed,
            "Sponsorship recorded"
        );
        if outcome.reactivated {
            info!(flagship_id = %flagship_id, "Flagship reactivated for a new vote");
        }
        Ok(outcome)
    }

    pub async fn sponsors(&self, flagship_id: &str) -> GovernanceResult<Vec<Sponsor>> {
        self.store
            .read(|state| -> GovernanceResult<Vec<Sponsor>> {
                state.flagship(flagship_id)?;
                Ok(state.sponsors_for(flagship_id))
            })
            .await
    }

    pub async fn sponsorship_status(&self, flagship_id: &str) -> GovernanceResult<SponsorshipStatus> {
        let needed = self.sponsors_needed().await?;
        self.store
            .read(|state| state.sponsorship_status(flagship_id, needed))
            .await
    }
}
