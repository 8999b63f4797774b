//! Per-agent facade over a [`HiveNode`].
//!
//! A `HiveClient` is what an agent process holds: its identity, its stake,
//! and a handle on the node. It validates input and delegates.

use crate::error::{HiveError, Result};
use crate::node::{AgentStatus, EmitReport, HiveNode};
use crate::retry::RetryPolicy;
use ed25519_dalek::VerifyingKey;
use hive_consensus::{Ballot, Choice, Proposal, ProposalDraft, ProposalId, Quorum, Tally};
use hive_membership::{Admission, AgentId, MembershipRecord, Weight};
use hive_pheromone::{BucketPattern, BucketedMetrics, PheromoneTrail};
use hive_topology::HexCoord;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Result of `activate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub admission: Admission,
    pub neighbors: Vec<MembershipRecord>,
}

impl Activation {
    pub fn coord(&self) -> HexCoord {
        self.admission.record().coord
    }
}

/// One agent's handle on the mesh.
#[derive(Debug, Clone)]
pub struct HiveClient {
    node: Arc<HiveNode>,
    agent: AgentId,
    weight: Weight,
    hint: Option<HexCoord>,
    retry: RetryPolicy,
}

impl HiveClient {
    pub fn new(node: Arc<HiveNode>, agent: AgentId, weight: Weight) -> Self {
        let retry = node.config().retry;
        Self {
            node,
            agent,
            weight,
            hint: None,
            retry,
        }
    }

    /// Client whose identity is derived from an ed25519 public key.
    pub fn for_key(node: Arc<HiveNode>, key: &VerifyingKey, weight: Weight) -> Self {
        Self::new(node, AgentId::from_public_key(key), weight)
    }

    /// Parse and validate a textual identity.
    pub fn parse(node: Arc<HiveNode>, agent: &str, weight: Weight) -> Result<Self> {
        let agent = agent
            .parse::<AgentId>()
            .map_err(|e| HiveError::InvalidInput(e.to_string()))?;
        Ok(Self::new(node, agent, weight))
    }

    /// Prefer this cell if it is vacant at activation.
    pub fn with_hint(mut self, hint: HexCoord) -> Self {
        self.hint = Some(hint);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn agent(&self) -> &AgentId {
        &self.agent
    }

    pub fn weight(&self) -> Weight {
        self.weight
    }

    /// Register (idempotently) and resolve neighbors.
    pub async fn activate(&self) -> Result<Activation> {
        let admission = self.node.register(self.agent.clone(), self.weight, self.hint).await?;
        let neighbors = self.node.resolve_neighbors(&self.agent).await?;
        debug!(agent = %self.agent, coord = %admission.record().coord, neighbors = neighbors.len(), "activated");
        Ok(Activation { admission, neighbors })
    }

    pub async fn heartbeat(&self) -> Result<()> {
        self.node.heartbeat(&self.agent).await
    }

    pub async fn withdraw(&self) -> Result<()> {
        self.node.withdraw(&self.agent).await
    }

    /// Emit a pheromone to the Active neighbors.
    ///
    /// `ttl` of `None` uses the node default; a ttl under one millisecond
    /// is rejected.
    pub async fn share_state(&self, metrics: BucketedMetrics, ttl: Option<Duration>) -> Result<EmitReport> {
        if ttl.is_some_and(|t| t.as_millis() == 0) {
            return Err(HiveError::InvalidInput("ttl must be at least 1ms".into()));
        }
        self.node.emit(&self.agent, metrics, ttl).await
    }

    pub async fn similar(&self, pattern: &BucketPattern) -> Result<Vec<PheromoneTrail>> {
        self.node.similar(&self.agent, pattern).await
    }

    /// Open a proposal as this agent. `None` fields take node defaults.
    pub async fn open_proposal(
        &self,
        topic: &str,
        description: &str,
        quorum: Option<Quorum>,
        window: Option<Duration>,
    ) -> Result<Proposal> {
        let config = self.node.config();
        let draft = ProposalDraft::new(
            topic,
            quorum.unwrap_or(config.default_quorum),
            window.unwrap_or(config.proposal_window),
        )
        .proposed_by(self.agent.clone())
        .with_description(description);
        self.node.open_proposal(draft).await
    }

    pub async fn vote(&self, proposal: ProposalId, choice: Choice) -> Result<Ballot> {
        self.node.cast_ballot(proposal, &self.agent, choice).await
    }

    /// `vote`, retrying retryable failures with backoff.
    ///
    /// An `UnknownAgent` failure (for example after a sweep marked this agent
    /// Departed) re-activates before the next attempt. Terminal errors are
    /// returned unchanged.
    pub async fn vote_with_retry(&self, proposal: ProposalId, choice: Choice) -> Result<Ballot> {
        let mut attempt = 1;
        loop {
            match self.vote(proposal, choice).await {
                Ok(ballot) => return Ok(ballot),
                Err(e) if e.is_retryable() && self.retry.allows_retry_after(attempt) => {
                    let delay = self.retry.delay_for(attempt - 1);
                    warn!(agent = %self.agent, %proposal, attempt, error = %e, delay_ms = delay.as_millis() as u64, "vote failed, retrying");
                    tokio::time::sleep(delay).await;
                    if matches!(e, HiveError::UnknownAgent(_)) {
                        self.activate().await?;
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Close `proposal` now if the uncast weight can no longer change the
    /// outcome.
    ///
    /// Ballots already cast are counted as they stand: closing freezes them,
    /// so a voter loses the chance to revise a ballot it would otherwise
    /// have been able to change until `closes_at`.
    pub async fn close_early(&self, proposal: ProposalId) -> Result<Option<Proposal>> {
        self.node.close_early(proposal).await
    }

    /// Current record and neighbor snapshot.
    pub async fn status(&self) -> Result<AgentStatus> {
        self.node.status(&self.agent).await
    }

    /// A proposal with its current (or final) tally.
    pub async fn proposal(&self, id: ProposalId) -> Result<(Proposal, Tally)> {
        let proposal = self.node.proposal(id).await?;
        let tally = self.node.preview(id).await?;
        Ok((proposal, tally))
    }

    /// Change stake for future proposals and future re-activations.
    pub async fn update_voting_weight(&mut self, weight: Weight) -> Result<MembershipRecord> {
        let record = self.node.update_voting_weight(&self.agent, weight).await?;
        self.weight = weight;
        Ok(record)
    }
}
