//! Proposals and their electorate snapshot.

use crate::error::{ConsensusError, Result};
use crate::Quorum;
use hive_membership::{AgentId, Weight};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Maximum topic length in bytes.
pub const MAX_TOPIC_LEN: usize = 128;

/// Maximum description length in bytes.
pub const MAX_DESCRIPTION_LEN: usize = 4096;

/// Engine-assigned proposal identifier, rendered `prop-<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProposalId(u64);

impl ProposalId {
    pub const fn new(n: u64) -> Self {
        Self(n)
    }

    pub const fn sequence(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ProposalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "prop-{}", self.0)
    }
}

impl std::str::FromStr for ProposalId {
    type Err = ConsensusError;

    fn from_str(s: &str) -> Result<Self> {
        s.strip_prefix("prop-")
            .and_then(|n| n.parse().ok())
            .map(Self)
            .ok_or_else(|| ConsensusError::InvalidInput(format!("malformed proposal id: {:?}", s)))
    }
}

impl TryFrom<String> for ProposalId {
    type Error = ConsensusError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ProposalId> for String {
    fn from(id: ProposalId) -> Self {
        id.to_string()
    }
}

/// Proposal lifecycle. `Open` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Open,
    Passed,
    Rejected,
    /// Quorum was never reached.
    Expired,
}

impl ProposalStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Open)
    }
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Open => "open",
            Self::Passed => "passed",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        })
    }
}

/// Voting weights of the Active members at the moment a proposal opened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Electorate {
    weights: BTreeMap<AgentId, Weight>,
    total: Weight,
}

impl Electorate {
    pub fn new(weights: BTreeMap<AgentId, Weight>) -> Self {
        let total = weights.values().copied().sum();
        Self { weights, total }
    }

    /// Snapshot weight of `agent`; zero for anyone outside the snapshot.
    pub fn weight_of(&self, agent: &AgentId) -> Weight {
        self.weights.get(agent).copied().unwrap_or(Weight::ZERO)
    }

    pub fn contains(&self, agent: &AgentId) -> bool {
        self.weights.contains_key(agent)
    }

    pub fn total(&self) -> Weight {
        self.total
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

impl FromIterator<(AgentId, Weight)> for Electorate {
    fn from_iter<I: IntoIterator<Item = (AgentId, Weight)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// What a caller supplies to open a proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalDraft {
    /// `None` when the node opens the proposal on the mesh's behalf.
    pub proposer: Option<AgentId>,
    pub topic: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quorum: Quorum,
    /// Voting window, from open to `closes_at`.
    pub window: Duration,
}

impl ProposalDraft {
    pub fn new(topic: impl Into<String>, quorum: Quorum, window: Duration) -> Self {
        Self {
            proposer: None,
            topic: topic.into(),
            description: String::new(),
            quorum,
            window,
        }
    }

    pub fn proposed_by(mut self, agent: AgentId) -> Self {
        self.proposer = Some(agent);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(ConsensusError::InvalidInput("topic must not be empty".into()));
        }
        if self.topic.len() > MAX_TOPIC_LEN {
            return Err(ConsensusError::InvalidInput(format!(
                "topic exceeds {} bytes",
                MAX_TOPIC_LEN
            )));
        }
        if self.description.len() > MAX_DESCRIPTION_LEN {
            return Err(ConsensusError::InvalidInput(format!(
                "description exceeds {} bytes",
                MAX_DESCRIPTION_LEN
            )));
        }
        // Windows are kept in whole milliseconds.
        if self.window.as_millis() == 0 {
            return Err(ConsensusError::InvalidInput("voting window must be at least 1ms".into()));
        }
        Ok(())
    }
}

/// A proposal as seen by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub proposer: Option<AgentId>,
    pub topic: String,
    pub description: String,
    pub opened_at: u64,
    pub closes_at: u64,
    pub quorum: Quorum,
    /// Total Active weight when the proposal opened. Never recomputed.
    pub electorate_weight: Weight,
    pub status: ProposalStatus,
    /// When the proposal reached a terminal status.
    pub closed_at: Option<u64>,
}

impl Proposal {
    pub fn is_open(&self) -> bool {
        self.status == ProposalStatus::Open
    }

    /// Whether ballots are still accepted at `now`.
    pub fn accepts_ballots(&self, now: u64) -> bool {
        self.is_open() && now < self.closes_at
    }

    pub fn is_due(&self, now: u64) -> bool {
        self.is_open() && now >= self.closes_at
    }
}
