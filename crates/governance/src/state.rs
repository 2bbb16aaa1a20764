//! The single transactional state behind the governance manager.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use flagship_common::MemberId;
use flagship_ledger::{HasLedger, LedgerBook};

use crate::flagship::Flagship;
use crate::plans::PlanRegistry;
use crate::project::Project;
use crate::reactivation::Sponsor;
use crate::voting::Vote;
use crate::{GovernanceError, GovernanceResult};

/// Every table the engine owns, committed as one snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GovernanceState {
    pub(crate) ledger: LedgerBook,
    pub(crate) plans: PlanRegistry,
    pub(crate) projects: BTreeMap<String, Project>,
    pub(crate) flagships: BTreeMap<String, Flagship>,
    /// flagship id -> voter -> vote
    pub(crate) votes: BTreeMap<String, BTreeMap<MemberId, Vote>>,
    /// flagship id -> sponsor -> record
    pub(crate) sponsors: BTreeMap<String, BTreeMap<MemberId, Sponsor>>,
}

impl HasLedger for GovernanceState {
    fn ledger(&self) -> &LedgerBook {
        &self.ledger
    }

    fn ledger_mut(&mut self) -> &mut LedgerBook {
        &mut self.ledger
    }
}

impl GovernanceState {
    pub fn plans(&self) -> &PlanRegistry {
        &self.plans
    }

    pub fn flagship(&self, flagship_id: &str) -> GovernanceResult<&Flagship> {
        self.flagships
            .get(flagship_id)
            .ok_or_else(|| GovernanceError::NotFound(format!("flagship {}", flagship_id)))
    }

    pub(crate) fn flagship_mut(&mut self, flagship_id: &str) -> GovernanceResult<&mut Flagship> {
        self.flagships
            .get_mut(flagship_id)
            .ok_or_else(|| GovernanceError::NotFound(format!("flagship {}", flagship_id)))
    }

    pub fn project(&self, project_id: &str) -> GovernanceResult<&Project> {
        self.projects
            .get(project_id)
            .ok_or_else(|| GovernanceError::NotFound(format!("project {}", project_id)))
    }

    pub(crate) fn project_mut(&mut self, project_id: &str) -> GovernanceResult<&mut Project> {
        self.projects
            .get_mut(project_id)
            .ok_or_else(|| GovernanceError::NotFound(format!("project {}", project_id)))
    }

    /// Votes on a flagship ordered by voter
    pub fn votes_for(&self, flagship_id: &str) -> Vec<Vote> {
        self.votes
            .get(flagship_id)
            .map(|votes| votes.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Sponsors of a flagship ordered by voter
    pub fn sponsors_for(&self, flagship_id: &str) -> Vec<Sponsor> {
        self.sponsors
            .get(flagship_id)
            .map(|sponsors| sponsors.values().cloned().collect())
            .unwrap_or_default()
    }
}
