//! Sponsorship of tabled flagships.
//!
//! Once the number of distinct sponsors reaches
//! `ceil(eligible_voters * reactivation_threshold)` the flagship reopens for a
//! fresh round of voting with its previous votes discarded. Sponsor records
//! are kept across rounds.

use chrono::Duration;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use flagship_common::{MemberId, Timestamp};

use crate::flagship::voting_deadline;
use crate::state::GovernanceState;
use crate::status::{FlagshipEvent, FlagshipStatus};
use crate::{GovernanceError, GovernanceResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sponsor {
    pub flagship_id: String,
    pub sponsor: MemberId,
    pub sponsored_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SponsorshipStatus {
    pub current: u64,
    pub needed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SponsorOutcome {
    pub current: u64,
    pub needed: u64,
    /// The flagship went back to voting because of this sponsorship
    pub reactivated: bool,
}

/// Sponsors required to reopen a tabled flagship
pub fn sponsors_needed(eligible_voters: u64, threshold: Decimal) -> u64 {
    let needed = (Decimal::from(eligible_voters) * threshold).ceil();
    needed.to_u64().unwrap_or(u64::MAX)
}

impl GovernanceState {
    /// Record a sponsorship and reactivate the flagship when the quorum is met
    pub fn sponsor(
        &mut self,
        flagship_id: &str,
        sponsor: &MemberId,
        needed: u64,
        vote_duration: Duration,
        now: Timestamp,
    ) -> GovernanceResult<SponsorOutcome> {
        let flagship = self.flagship(flagship_id)?;
        if flagship.status != FlagshipStatus::Tabled {
            return Err(GovernanceError::State(format!(
                "flagship {} is {}, only tabled flagships take sponsors",
                flagship_id, flagship.status
            )));
        }

        let sponsors = self.sponsors.entry(flagship_id.to_string()).or_default();
        if sponsors.contains_key(sponsor) {
            return Err(GovernanceError::Validation(format!(
                "{} already sponsors flagship {}",
                sponsor, flagship_id
            )));
        }
        sponsors.insert(
            sponsor.clone(),
            Sponsor {
                flagship_id: flagship_id.to_string(),
                sponsor: sponsor.clone(),
                sponsored_at: now,
            },
        );
        let current = sponsors.len() as u64;

        let reactivated = needed > 0 && current >= needed;
        if reactivated {
            let deadline = voting_deadline(now, vote_duration)?;
            self.votes.remove(flagship_id);
            let flagship = self.flagship_mut(flagship_id)?;
            flagship.transition(FlagshipEvent::Reactivated, now)?;
            flagship.voting_deadline = Some(deadline);
            flagship.tabled_at = None;
            flagship.round += 1;
        }

        Ok(SponsorOutcome {
            current,
            needed,
            reactivated,
        })
    }

    pub fn sponsorship_status(&self, flagship_id: &str, needed: u64) -> GovernanceResult<SponsorshipStatus> {
        self.flagship(flagship_id)?;
        let current = self.sponsors.get(flagship_id).map_or(0, |s| s.len() as u64);
        Ok(SponsorshipStatus { current, needed })
    }
}
