//! Projects backing flagships.

use serde::{Deserialize, Serialize};

use flagship_common::utils::generate_prefixed_uuid;
use flagship_common::{Amount, MemberId, Timestamp};

use crate::{GovernanceError, GovernanceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Open,
    Funded,
}

/// Caller input for a new flagship's project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub funding_goal: Amount,
    pub creator: MemberId,
}

impl ProjectDraft {
    pub fn validate(&self) -> GovernanceResult<()> {
        if self.title.trim().is_empty() {
            return Err(GovernanceError::Validation("project title must not be empty".to_string()));
        }
        if !self.funding_goal.is_positive() {
            return Err(GovernanceError::Validation(format!(
                "project funding goal must be positive, got {}",
                self.funding_goal
            )));
        }
        if self.creator.as_str().trim().is_empty() {
            return Err(GovernanceError::Validation("project creator must be set".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub funding_goal: Amount,
    /// Only grows, and only through disbursements
    pub funding_raised: Amount,
    pub creator: MemberId,
    pub status: ProjectStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Project {
    pub fn from_draft(draft: ProjectDraft, now: Timestamp) -> Self {
        Self {
            id: generate_prefixed_uuid("project"),
            title: draft.title.trim().to_string(),
            description: draft.description,
            category: draft.category,
            funding_goal: draft.funding_goal,
            funding_raised: Amount::zero(),
            creator: draft.creator,
            status: ProjectStatus::Open,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn remaining_need(&self) -> Amount {
        self.funding_goal.saturating_sub(self.funding_raised)
    }

    /// Add a disbursed amount; returns true when the goal is now met
    pub fn credit(&mut self, amount: Amount, now: Timestamp) -> bool {
        self.funding_raised += amount;
        self.updated_at = now;
        if self.funding_raised >= self.funding_goal {
            self.status = ProjectStatus::Funded;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn draft(goal: i64) -> ProjectDraft {
        ProjectDraft {
            title: "Community kitchen".to_string(),
            description: String::new(),
            category: "food".to_string(),
            funding_goal: Amount::new(goal),
            creator: MemberId::new("alice"),
        }
    }

    #[test]
    fn test_credit_until_goal() {
        let now = Utc::now();
        let mut project = Project::from_draft(draft(100), now);
        assert_eq!(project.remaining_need(), Amount::new(100));

        assert!(!project.credit(Amount::new(60), now));
        assert_eq!(project.remaining_need(), Amount::new(40));
        assert_eq!(project.status, ProjectStatus::Open);

        assert!(project.credit(Amount::new(40), now));
        assert_eq!(project.remaining_need(), Amount::zero());
        assert_eq!(project.status, ProjectStatus::Funded);
    }

    #[test]
    fn test_draft_validation() {
        assert!(draft(100).validate().is_ok());
        assert!(draft(0).validate().is_err());

        let mut untitled = draft(100);
        untitled.title = " ".to_string();
        assert!(matches!(untitled.validate(), Err(GovernanceError::Validation(_))));
    }
}
