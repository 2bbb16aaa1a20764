//! Strategic plan registry.
//!
//! Plans steer the Reserve fund. Many plans may be active at once; the
//! "current" plan is the active one created first (lowest ordering key).

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use flagship_common::utils::generate_prefixed_uuid;
use flagship_common::{Amount, Timestamp};

use crate::{GovernanceError, GovernanceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Active,
    Completed,
    Archived,
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanStatus::Active => write!(f, "active"),
            PlanStatus::Completed => write!(f, "completed"),
            PlanStatus::Archived => write!(f, "archived"),
        }
    }
}

/// A long-horizon plan that Reserve flagships belong to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategicPlan {
    pub id: String,
    pub title: String,
    pub description: String,
    pub vision: String,
    pub funding_goal: Amount,
    pub status: PlanStatus,
    /// Monotonic creation order, used to pick the current plan
    pub ordering_key: u64,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

/// How far the Reserve balance has come toward the current plan's goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReserveProgress {
    pub plan_id: String,
    pub goal: Amount,
    pub balance: Amount,
    /// `balance / goal`, capped at 1
    pub ratio: Decimal,
}

impl ReserveProgress {
    pub fn new(plan: &StrategicPlan, balance: Amount) -> Self {
        let goal = plan.funding_goal.decimal_value();
        let ratio = if goal.is_zero() {
            Decimal::ONE
        } else {
            (balance.decimal_value() / goal).min(Decimal::ONE)
        };
        Self {
            plan_id: plan.id.clone(),
            goal: plan.funding_goal,
            balance,
            ratio,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanRegistry {
    plans: BTreeMap<String, StrategicPlan>,
    next_ordering_key: u64,
}

impl PlanRegistry {
    pub fn create(
        &mut self,
        title: &str,
        description: &str,
        vision: &str,
        funding_goal: Amount,
        now: Timestamp,
    ) -> GovernanceResult<StrategicPlan> {
        if title.trim().is_empty() {
            return Err(GovernanceError::Validation("plan title must not be empty".to_string()));
        }
        if !funding_goal.is_positive() {
            return Err(GovernanceError::Validation(format!(
                "plan funding goal must be positive, got {}",
                funding_goal
            )));
        }

        let plan = StrategicPlan {
            id: generate_prefixed_uuid("plan"),
            title: title.trim().to_string(),
            description: description.to_string(),
            vision: vision.to_string(),
            funding_goal,
            status: PlanStatus::Active,
            ordering_key: self.next_ordering_key,
            created_at: now,
            completed_at: None,
        };
        self.next_ordering_key += 1;
        self.plans.insert(plan.id.clone(), plan.clone());
        Ok(plan)
    }

    /// Mark an active plan completed and return the plan that is now current
    pub fn complete(&mut self, plan_id: &str, now: Timestamp) -> GovernanceResult<Option<StrategicPlan>> {
        let plan = self.active_mut(plan_id, "complete")?;
        plan.status = PlanStatus::Completed;
        plan.completed_at = Some(now);
        Ok(self.current().cloned())
    }

    pub fn archive(&mut self, plan_id: &str) -> GovernanceResult<StrategicPlan> {
        let plan = self.active_mut(plan_id, "archive")?;
        plan.status = PlanStatus::Archived;
        Ok(plan.clone())
    }

    fn active_mut(&mut self, plan_id: &str, action: &str) -> GovernanceResult<&mut StrategicPlan> {
        let plan = self
            .plans
            .get_mut(plan_id)
            .ok_or_else(|| GovernanceError::NotFound(format!("plan {}", plan_id)))?;
        if plan.status != PlanStatus::Active {
            return Err(GovernanceError::State(format!(
                "cannot {} plan {} in status {}",
                action, plan_id, plan.status
            )));
        }
        Ok(plan)
    }

    /// The active plan with the lowest ordering key
    pub fn current(&self) -> Option<&StrategicPlan> {
        self.plans
            .values()
            .filter(|p| p.status == PlanStatus::Active)
            .min_by_key(|p| p.ordering_key)
    }

    pub fn get(&self, plan_id: &str) -> Option<&StrategicPlan> {
        self.plans.get(plan_id)
    }

    /// All plans in creation order
    pub fn list(&self) -> Vec<StrategicPlan> {
        let mut plans: Vec<_> = self.plans.values().cloned().collect();
        plans.sort_by_key(|p| p.ordering_key);
        plans
    }
}
