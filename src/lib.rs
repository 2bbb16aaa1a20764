//! Flagship governance engine
//!
//! Two funds finance community projects ("flagships"): the operator-funded
//! Reserve, tied to strategic plans, and the member-funded Pool, spent only
//! after a community vote. This crate re-exports the workspace crates under
//! one name.

/// Module version information
pub mod version {
    /// The current version of the flagship library
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}

pub use flagship_common as common;
pub use flagship_config as config;
pub use flagship_governance as governance;
pub use flagship_ledger as ledger;
pub use flagship_storage as storage;

/// The types most callers need to drive the engine
pub mod prelude {
    pub use flagship_common::{Amount, Clock, ManualClock, MemberId, SystemClock};
    pub use flagship_config::{FundConfig, GovernanceSettings};
    pub use flagship_governance::{
        FinalizationOutcome, FlagshipFilter, FlagshipStatus, FundingSource, GovernanceError, GovernanceManager,
        MembershipProvider, ProjectDraft, StaticMembership, VoteChoice,
    };
    pub use flagship_ledger::{FundType, LedgerError};
}
