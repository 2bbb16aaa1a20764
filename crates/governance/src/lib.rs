//! Governance for the flagship engine
//!
//! Strategic plans steer Reserve money, community votes steer Pool money, and
//! tabled flagships can be brought back to a vote by member sponsorship. All
//! tables live in one [`GovernanceState`] next to the [`LedgerBook`] so that a
//! disbursement and the flagship status change it causes commit together.
//!
//! [`LedgerBook`]: flagship_ledger::LedgerBook

use thiserror::Error;

use flagship_common::ErrorKind;
use flagship_ledger::LedgerError;
use flagship_storage::StorageError;

pub mod flagship;
pub mod manager;
pub mod membership;
pub mod plans;
pub mod project;
pub mod reactivation;
pub mod state;
pub mod status;
pub mod voting;

pub use flagship::{Flagship, FlagshipFilter, FlagshipView, FundingReceipt, FundingSource};
pub use manager::GovernanceManager;
pub use membership::{MembershipProvider, StaticMembership};
pub use plans::{PlanRegistry, PlanStatus, ReserveProgress, StrategicPlan};
pub use project::{Project, ProjectDraft, ProjectStatus};
pub use reactivation::{sponsors_needed, Sponsor, SponsorOutcome, SponsorshipStatus};
pub use state::GovernanceState;
pub use status::{FlagshipEvent, FlagshipStatus};
pub use voting::{
    FinalizationOutcome, FinalizationReport, Vote, VoteChoice, VoteDecision, VoteTally, VotingRules,
};

/// Error types for governance operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GovernanceError {
    /// Malformed input or a duplicate record
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown plan, flagship or project
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation not allowed in the current status or time window
    #[error("Invalid state: {0}")]
    State(String),

    /// Caller is not an eligible voter
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Balance or disbursement failure from the fund ledger
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Snapshot could not be written or read
    #[error("Storage error: {0}")]
    Storage(String),

    /// Membership lookup failed
    #[error("Membership error: {0}")]
    Membership(String),
}

impl GovernanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GovernanceError::Validation(_) => ErrorKind::Validation,
            GovernanceError::NotFound(_) => ErrorKind::NotFound,
            GovernanceError::State(_) => ErrorKind::State,
            GovernanceError::Authorization(_) => ErrorKind::Authorization,
            GovernanceError::Ledger(err) => match err {
                LedgerError::InvalidAmount(_) => ErrorKind::Validation,
                LedgerError::InsufficientBalance(_) => ErrorKind::InsufficientBalance,
                LedgerError::InsufficientFunds(_) => ErrorKind::InsufficientFunds,
                LedgerError::FundNotFound(_) => ErrorKind::NotFound,
                LedgerError::Storage(_) => ErrorKind::Internal,
            },
            GovernanceError::Storage(_) | GovernanceError::Membership(_) => ErrorKind::Internal,
        }
    }
}

impl From<StorageError> for GovernanceError {
    fn from(err: StorageError) -> Self {
        GovernanceError::Storage(err.to_string())
    }
}

impl From<GovernanceError> for flagship_common::Error {
    fn from(err: GovernanceError) -> Self {
        match err {
            GovernanceError::Validation(msg) => flagship_common::Error::validation(msg),
            GovernanceError::NotFound(msg) => flagship_common::Error::not_found(msg),
            GovernanceError::State(msg) => flagship_common::Error::state(msg),
            GovernanceError::Authorization(msg) => flagship_common::Error::unauthorized(msg),
            GovernanceError::Ledger(err) => err.into(),
            GovernanceError::Storage(msg) | GovernanceError::Membership(msg) => {
                flagship_common::Error::internal(msg)
            }
        }
    }
}

/// Result type for governance operations
pub type GovernanceResult<T> = Result<T, GovernanceError>;
