//! Stake-weighted tallying.
//!
//! ```text
//! turnout  = cast_weight / electorate_weight
//! turnout  < quorum            → Expired
//! for      > against           → Passed
//! for     <= against           → Rejected   (ties reject)
//! ```
//!
//! Abstentions count toward turnout only. A ballot from a voter outside the
//! electorate snapshot carries zero weight.

use crate::{Ballot, Choice, ProposalStatus, Quorum};
use hive_membership::Weight;
use serde::{Deserialize, Serialize};

/// Weight totals for one proposal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub for_weight: Weight,
    pub against_weight: Weight,
    pub abstain_weight: Weight,
    pub cast_weight: Weight,
    /// Snapshot total from proposal open.
    pub electorate_weight: Weight,
    pub ballots: usize,
}

impl Tally {
    /// Sum `ballots` against an electorate of `electorate_weight`.
    ///
    /// Expects at most one ballot per voter.
    pub fn count<'a>(ballots: impl IntoIterator<Item = &'a Ballot>, electorate_weight: Weight) -> Self {
        let mut tally = Self {
            electorate_weight,
            ..Self::default()
        };
        for ballot in ballots {
            match ballot.choice {
                Choice::For => tally.for_weight = tally.for_weight + ballot.weight,
                Choice::Against => tally.against_weight = tally.against_weight + ballot.weight,
                Choice::Abstain => tally.abstain_weight = tally.abstain_weight + ballot.weight,
            }
            tally.cast_weight = tally.cast_weight + ballot.weight;
            tally.ballots += 1;
        }
        tally
    }

    /// Fraction of the electorate weight that took part. Zero for an empty
    /// electorate.
    pub fn turnout(&self) -> f64 {
        if self.electorate_weight.is_zero() {
            return 0.0;
        }
        self.cast_weight.units() as f64 / self.electorate_weight.units() as f64
    }

    /// Electorate weight not yet accounted for by any ballot.
    pub fn uncast_weight(&self) -> Weight {
        Weight::new(
            self.electorate_weight
                .units()
                .saturating_sub(self.cast_weight.units()),
        )
    }

    pub fn meets_quorum(&self, quorum: Quorum) -> bool {
        quorum.is_met(self.cast_weight.units(), self.electorate_weight.units())
    }

    /// Terminal outcome if the proposal closed now.
    pub fn outcome(&self, quorum: Quorum) -> ProposalStatus {
        if !self.meets_quorum(quorum) {
            ProposalStatus::Expired
        } else if self.for_weight > self.against_weight {
            ProposalStatus::Passed
        } else {
            ProposalStatus::Rejected
        }
    }

    /// Outcome that no remaining ballot can change, if there is one.
    ///
    /// Assumes every uncast unit of electorate weight may still arrive, on
    /// either side. Revisions by voters who already cast are not modelled;
    /// once a proposal closes early its ballots are frozen anyway.
    pub fn decided_outcome(&self, quorum: Quorum) -> Option<ProposalStatus> {
        let electorate = self.electorate_weight.units();
        if !quorum.is_met(electorate, electorate) {
            // Only an empty electorate can never reach quorum.
            return Some(ProposalStatus::Expired);
        }
        if !self.meets_quorum(quorum) {
            return None;
        }

        let uncast = self.uncast_weight().units();
        let for_w = self.for_weight.units();
        let against_w = self.against_weight.units();

        if for_w > against_w.saturating_add(uncast) {
            Some(ProposalStatus::Passed)
        } else if for_w.saturating_add(uncast) <= against_w {
            Some(ProposalStatus::Rejected)
        } else {
            None
        }
    }
}
