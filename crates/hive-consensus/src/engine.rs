//! Proposal lifecycle.
//!
//! The engine owns every proposal, its electorate snapshot and its ballots.
//! It is synchronous; callers pass `now` (unix millis) and serialize access.
//! Whether a voter is currently Active is checked by the caller against the
//! membership directory before `cast_ballot` is reached.

use crate::error::{ConsensusError, Result};
use crate::{Ballot, Choice, Electorate, Proposal, ProposalDraft, ProposalId, ProposalStatus, Tally};
use hive_membership::AgentId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// A proposal that reached a terminal status, with its final tally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finalized {
    pub proposal: Proposal,
    pub tally: Tally,
}

/// Proposal counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusStats {
    pub open: usize,
    pub passed: usize,
    pub rejected: usize,
    pub expired: usize,
    pub ballots: usize,
}

impl ConsensusStats {
    pub fn total(&self) -> usize {
        self.open + self.passed + self.rejected + self.expired
    }
}

#[derive(Debug)]
struct Entry {
    proposal: Proposal,
    electorate: Electorate,
    ballots: HashMap<AgentId, Ballot>,
    final_tally: Option<Tally>,
}

impl Entry {
    fn tally(&self) -> Tally {
        self.final_tally
            .unwrap_or_else(|| Tally::count(self.ballots.values(), self.electorate.total()))
    }

    fn finalize(&mut self, now: u64) -> Finalized {
        let tally = Tally::count(self.ballots.values(), self.electorate.total());
        self.proposal.status = tally.outcome(self.proposal.quorum);
        self.proposal.closed_at = Some(now);
        self.final_tally = Some(tally);
        Finalized {
            proposal: self.proposal.clone(),
            tally,
        }
    }
}

/// Owns the lifecycle of every proposal on this node.
#[derive(Debug, Default)]
pub struct ConsensusEngine {
    entries: BTreeMap<ProposalId, Entry>,
    next_id: u64,
}

impl ConsensusEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a proposal against an electorate snapshot.
    ///
    /// The snapshot total becomes the proposal's quorum denominator and is
    /// never recomputed.
    pub fn open(&mut self, draft: ProposalDraft, electorate: Electorate, now: u64) -> Result<Proposal> {
        draft.validate()?;

        self.next_id += 1;
        let id = ProposalId::new(self.next_id);
        let window_ms = u64::try_from(draft.window.as_millis()).unwrap_or(u64::MAX);

        let proposal = Proposal {
            id,
            proposer: draft.proposer,
            topic: draft.topic,
            description: draft.description,
            opened_at: now,
            closes_at: now.saturating_add(window_ms),
            quorum: draft.quorum,
            electorate_weight: electorate.total(),
            status: ProposalStatus::Open,
            closed_at: None,
        };

        info!(
            %id,
            topic = %proposal.topic,
            electorate = electorate.len(),
            weight = %proposal.electorate_weight,
            quorum = %proposal.quorum,
            closes_at = proposal.closes_at,
            "proposal opened"
        );

        self.entries.insert(
            id,
            Entry {
                proposal: proposal.clone(),
                electorate,
                ballots: HashMap::new(),
                final_tally: None,
            },
        );
        Ok(proposal)
    }

    /// Record `voter`'s choice, replacing any earlier ballot from them.
    pub fn cast_ballot(&mut self, id: ProposalId, voter: AgentId, choice: Choice, now: u64) -> Result<Ballot> {
        let entry = self.entry_mut(id)?;
        if !entry.proposal.accepts_ballots(now) {
            return Err(ConsensusError::ProposalClosed(id));
        }

        let ballot = Ballot {
            proposal: id,
            weight: entry.electorate.weight_of(&voter),
            voter: voter.clone(),
            choice,
            cast_at: now,
        };
        let previous = entry.ballots.insert(voter, ballot.clone());

        debug!(
            %id,
            voter = %ballot.voter,
            %choice,
            weight = %ballot.weight,
            revised = previous.is_some(),
            "ballot cast"
        );
        Ok(ballot)
    }

    /// Finalize every open proposal whose window has elapsed.
    ///
    /// Results are in proposal id order.
    pub fn close_due(&mut self, now: u64) -> Vec<Finalized> {
        let mut finalized = Vec::new();
        for entry in self.entries.values_mut() {
            if entry.proposal.is_due(now) {
                let done = entry.finalize(now);
                info!(
                    id = %done.proposal.id,
                    status = %done.proposal.status,
                    turnout = done.tally.turnout(),
                    "proposal closed"
                );
                finalized.push(done);
            }
        }
        finalized
    }

    /// Finalize before `closes_at` if no further ballot can change the outcome.
    ///
    /// Returns `Ok(None)` while the outcome is still open.
    pub fn close_early(&mut self, id: ProposalId, now: u64) -> Result<Option<Finalized>> {
        let entry = self.entry_mut(id)?;
        if !entry.proposal.is_open() {
            return Err(ConsensusError::ProposalClosed(id));
        }
        if entry.proposal.is_due(now) {
            return Ok(Some(entry.finalize(now)));
        }

        let preview = entry.tally();
        match preview.decided_outcome(entry.proposal.quorum) {
            Some(decided) => {
                let done = entry.finalize(now);
                debug_assert_eq!(done.proposal.status, decided);
                info!(%id, status = %decided, "proposal closed early");
                Ok(Some(done))
            }
            None => {
                debug!(%id, "early close refused, outcome undecided");
                Ok(None)
            }
        }
    }

    /// Current tally. Advisory while the proposal is open; final afterwards.
    pub fn preview(&self, id: ProposalId) -> Result<Tally> {
        Ok(self.entry(id)?.tally())
    }

    pub fn proposal(&self, id: ProposalId) -> Result<&Proposal> {
        Ok(&self.entry(id)?.proposal)
    }

    pub fn electorate(&self, id: ProposalId) -> Result<&Electorate> {
        Ok(&self.entry(id)?.electorate)
    }

    /// Ballots on `id`, ordered by voter.
    pub fn ballots(&self, id: ProposalId) -> Result<Vec<&Ballot>> {
        let mut ballots: Vec<&Ballot> = self.entry(id)?.ballots.values().collect();
        ballots.sort_by(|a, b| a.voter.cmp(&b.voter));
        Ok(ballots)
    }

    pub fn ballot_of(&self, id: ProposalId, voter: &AgentId) -> Result<Option<&Ballot>> {
        Ok(self.entry(id)?.ballots.get(voter))
    }

    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.entries.values().map(|e| &e.proposal)
    }

    pub fn open_proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals().filter(|p| p.is_open())
    }

    /// Earliest `closes_at` among open proposals.
    pub fn next_deadline(&self) -> Option<u64> {
        self.open_proposals().map(|p| p.closes_at).min()
    }

    pub fn stats(&self) -> ConsensusStats {
        let mut stats = ConsensusStats::default();
        for entry in self.entries.values() {
            match entry.proposal.status {
                ProposalStatus::Open => stats.open += 1,
                ProposalStatus::Passed => stats.passed += 1,
                ProposalStatus::Rejected => stats.rejected += 1,
                ProposalStatus::Expired => stats.expired += 1,
            }
            stats.ballots += entry.ballots.len();
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, id: ProposalId) -> Result<&Entry> {
        self.entries.get(&id).ok_or(ConsensusError::UnknownProposal(id))
    }

    fn entry_mut(&mut self, id: ProposalId) -> Result<&mut Entry> {
        self.entries.get_mut(&id).ok_or(ConsensusError::UnknownProposal(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Quorum;
    use hive_membership::Weight;
    use std::time::Duration;

    const SEC: u64 = 1_000;

    fn agent(s: &str) -> AgentId {
        AgentId::new(s).unwrap()
    }

    fn electorate(members: &[(&str, u64)]) -> Electorate {
        members.iter().map(|(a, w)| (agent(a), Weight::new(*w))).collect()
    }

    fn draft(quorum: f64) -> ProposalDraft {
        ProposalDraft::new("expand ring 3", Quorum::new(quorum).unwrap(), Duration::from_secs(60))
    }

    #[test]
    fn lone_member_passes_at_close() {
        let mut engine = ConsensusEngine::new();
        let p = engine
            .open(draft(0.5).proposed_by(agent("a")), electorate(&[("a", 10)]), 0)
            .unwrap();
        assert_eq!(p.id.to_string(), "prop-1");
        assert_eq!(p.electorate_weight, Weight::new(10));
        assert_eq!(p.closes_at, 60 * SEC);

        engine.cast_ballot(p.id, agent("a"), Choice::For, SEC).unwrap();
        assert!(engine.close_due(59 * SEC).is_empty());

        let done = engine.close_due(60 * SEC);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].proposal.status, ProposalStatus::Passed);
        assert_eq!(done[0].tally.turnout(), 1.0);
        assert_eq!(done[0].proposal.closed_at, Some(60 * SEC));
    }

    #[test]
    fn insufficient_turnout_expires() {
        let mut engine = ConsensusEngine::new();
        let p = engine
            .open(draft(0.6), electorate(&[("a", 40), ("b", 30), ("c", 30)]), 0)
            .unwrap();
        assert_eq!(p.electorate_weight, Weight::new(100));

        engine.cast_ballot(p.id, agent("a"), Choice::For, SEC).unwrap();
        let done = engine.close_due(60 * SEC);
        assert_eq!(done[0].proposal.status, ProposalStatus::Expired);
    }

    #[test]
    fn revision_replaces_earlier_ballot() {
        let mut engine = ConsensusEngine::new();
        let p = engine.open(draft(0.5), electorate(&[("a", 10), ("b", 5)]), 0).unwrap();

        engine.cast_ballot(p.id, agent("a"), Choice::Against, SEC).unwrap();
        engine.cast_ballot(p.id, agent("a"), Choice::For, 2 * SEC).unwrap();

        let tally = engine.preview(p.id).unwrap();
        assert_eq!(tally.ballots, 1);
        assert_eq!(tally.for_weight, Weight::new(10));
        assert_eq!(tally.against_weight, Weight::ZERO);

        let ballot = engine.ballot_of(p.id, &agent("a")).unwrap().unwrap();
        assert_eq!(ballot.choice, Choice::For);
        assert_eq!(ballot.cast_at, 2 * SEC);
        assert_eq!(engine.ballots(p.id).unwrap().len(), 1);
        assert_eq!(engine.ballot_of(p.id, &agent("b")).unwrap(), None);

        let done = engine.close_due(60 * SEC);
        assert_eq!(done[0].proposal.status, ProposalStatus::Passed);
    }

    #[test]
    fn ballots_after_close_rejected() {
        let mut engine = ConsensusEngine::new();
        let p = engine.open(draft(0.5), electorate(&[("a", 10)]), 0).unwrap();

        // At closes_at the window is shut even before close_due runs.
        let err = engine.cast_ballot(p.id, agent("a"), Choice::For, 60 * SEC).unwrap_err();
        assert_eq!(err, ConsensusError::ProposalClosed(p.id));

        engine.close_due(60 * SEC);
        let err = engine.cast_ballot(p.id, agent("a"), Choice::For, SEC).unwrap_err();
        assert_eq!(err, ConsensusError::ProposalClosed(p.id));
    }

    #[test]
    fn final_tally_frozen_after_close() {
        let mut engine = ConsensusEngine::new();
        let p = engine.open(draft(0.5), electorate(&[("a", 10)]), 0).unwrap();
        engine.cast_ballot(p.id, agent("a"), Choice::For, SEC).unwrap();
        let done = engine.close_due(60 * SEC);

        assert_eq!(engine.preview(p.id).unwrap(), done[0].tally);
        assert!(engine.close_due(120 * SEC).is_empty());
    }

    #[test]
    fn unknown_proposal() {
        let mut engine = ConsensusEngine::new();
        let id = ProposalId::new(42);
        assert_eq!(
            engine.cast_ballot(id, agent("a"), Choice::For, 0).unwrap_err(),
            ConsensusError::UnknownProposal(id)
        );
        assert!(engine.preview(id).is_err());
        assert!(engine.close_early(id, 0).is_err());
    }

    #[test]
    fn late_joiner_votes_with_zero_weight() {
        let mut engine = ConsensusEngine::new();
        let p = engine.open(draft(0.5), electorate(&[("a", 10)]), 0).unwrap();

        let ballot = engine.cast_ballot(p.id, agent("late"), Choice::Against, SEC).unwrap();
        assert_eq!(ballot.weight, Weight::ZERO);

        engine.cast_ballot(p.id, agent("a"), Choice::For, SEC).unwrap();
        let tally = engine.preview(p.id).unwrap();
        assert_eq!(tally.ballots, 2);
        assert_eq!(tally.electorate_weight, Weight::new(10));
        assert_eq!(tally.outcome(p.quorum), ProposalStatus::Passed);
    }

    #[test]
    fn early_close_only_when_decided() {
        let mut engine = ConsensusEngine::new();
        let p = engine
            .open(draft(0.5), electorate(&[("a", 30), ("b", 30), ("c", 40)]), 0)
            .unwrap();

        engine.cast_ballot(p.id, agent("c"), Choice::For, SEC).unwrap();
        assert_eq!(engine.close_early(p.id, 2 * SEC).unwrap(), None);

        engine.cast_ballot(p.id, agent("a"), Choice::For, 3 * SEC).unwrap();
        let done = engine.close_early(p.id, 4 * SEC).unwrap().unwrap();
        assert_eq!(done.proposal.status, ProposalStatus::Passed);
        assert_eq!(done.proposal.closed_at, Some(4 * SEC));

        assert_eq!(
            engine.cast_ballot(p.id, agent("b"), Choice::Against, 5 * SEC).unwrap_err(),
            ConsensusError::ProposalClosed(p.id)
        );
        assert_eq!(
            engine.close_early(p.id, 6 * SEC).unwrap_err(),
            ConsensusError::ProposalClosed(p.id)
        );
    }

    #[test]
    fn stats_by_status() {
        let mut engine = ConsensusEngine::new();
        let passed = engine.open(draft(0.5), electorate(&[("a", 10)]), 0).unwrap();
        engine.open(draft(0.5), electorate(&[("a", 10)]), 0).unwrap();
        let _open = engine.open(draft(0.5).with_description("later"), electorate(&[("a", 10)]), 100 * SEC).unwrap();

        engine.cast_ballot(passed.id, agent("a"), Choice::For, SEC).unwrap();
        assert_eq!(engine.next_deadline(), Some(60 * SEC));
        engine.close_due(60 * SEC);

        let stats = engine.stats();
        assert_eq!(stats.passed, 1);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.open, 1);
        assert_eq!(stats.ballots, 1);
        assert_eq!(stats.total(), 3);
        assert_eq!(engine.next_deadline(), Some(160 * SEC));
    }

    #[test]
    fn electorate_snapshot_immutable() {
        let mut engine = ConsensusEngine::new();
        let p = engine.open(draft(0.5), electorate(&[("a", 10), ("b", 10)]), 0).unwrap();
        for (i, voter) in ["a", "b", "c", "d"].iter().enumerate() {
            engine.cast_ballot(p.id, agent(voter), Choice::For, i as u64).unwrap();
        }
        assert_eq!(engine.proposal(p.id).unwrap().electorate_weight, Weight::new(20));
        assert_eq!(engine.electorate(p.id).unwrap().total(), Weight::new(20));
        assert_eq!(engine.preview(p.id).unwrap().cast_weight, Weight::new(20));
    }
}
