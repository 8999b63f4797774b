//! Error types for the Hive node.

use crate::config::ConfigError;
use hive_consensus::{ConsensusError, ProposalId};
use hive_membership::{AgentId, MembershipError};
use hive_pheromone::PheromoneError;
use hive_topology::TopologyError;
use thiserror::Error;

/// Result type for node and client operations.
pub type Result<T> = std::result::Result<T, HiveError>;

/// Errors surfaced to callers of the node.
#[derive(Debug, Error)]
pub enum HiveError {
    /// No Active record for this agent. Re-register and retry.
    #[error("unknown agent: {0}")]
    UnknownAgent(AgentId),

    /// Cell capacity reached.
    #[error("grid exhausted: all {capacity} cells are held")]
    GridExhausted { capacity: u64 },

    /// The proposal no longer accepts ballots.
    #[error("proposal {0} is closed")]
    ProposalClosed(ProposalId),

    #[error("unknown proposal: {0}")]
    UnknownProposal(ProposalId),

    /// Rejected before anything was applied.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HiveError {
    /// Whether the caller may retry, possibly after re-registering.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UnknownAgent(_) | Self::Io(_))
    }

    /// Short machine-readable name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownAgent(_) => "unknown_agent",
            Self::GridExhausted { .. } => "grid_exhausted",
            Self::ProposalClosed(_) => "proposal_closed",
            Self::UnknownProposal(_) => "unknown_proposal",
            Self::InvalidInput(_) => "invalid_input",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
        }
    }
}

impl From<TopologyError> for HiveError {
    fn from(e: TopologyError) -> Self {
        match e {
            TopologyError::GridExhausted { capacity } => HiveError::GridExhausted { capacity },
            e @ TopologyError::OutOfRange { .. } => HiveError::InvalidInput(e.to_string()),
        }
    }
}

impl From<MembershipError> for HiveError {
    fn from(e: MembershipError) -> Self {
        match e {
            MembershipError::UnknownAgent(agent) => HiveError::UnknownAgent(agent),
            MembershipError::Grid(grid) => grid.into(),
            MembershipError::InvalidInput(msg) => HiveError::InvalidInput(msg),
        }
    }
}

impl From<PheromoneError> for HiveError {
    fn from(e: PheromoneError) -> Self {
        match e {
            PheromoneError::InvalidInput(msg) => HiveError::InvalidInput(msg),
        }
    }
}

impl From<ConsensusError> for HiveError {
    fn from(e: ConsensusError) -> Self {
        match e {
            ConsensusError::UnknownProposal(id) => HiveError::UnknownProposal(id),
            ConsensusError::ProposalClosed(id) => HiveError::ProposalClosed(id),
            ConsensusError::InvalidInput(msg) => HiveError::InvalidInput(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_classification() {
        let agent = AgentId::new("a").unwrap();
        assert!(HiveError::UnknownAgent(agent).is_retryable());
        assert!(HiveError::Io(std::io::Error::other("reset")).is_retryable());
        assert!(!HiveError::GridExhausted { capacity: 7 }.is_retryable());
        assert!(!HiveError::InvalidInput("ttl".into()).is_retryable());
        assert!(!HiveError::ProposalClosed(ProposalId::new(1)).is_retryable());
    }

    #[test]
    fn lower_errors_map_to_taxonomy() {
        let e: HiveError = MembershipError::Grid(TopologyError::GridExhausted { capacity: 7 }).into();
        assert!(matches!(e, HiveError::GridExhausted { capacity: 7 }));

        let far = hive_topology::HexCoord::new(i64::MAX, 0);
        let e: HiveError = MembershipError::Grid(TopologyError::OutOfRange { coord: far }).into();
        assert_eq!(e.kind(), "invalid_input");
        assert!(!e.is_retryable());

        let e: HiveError = ConsensusError::ProposalClosed(ProposalId::new(3)).into();
        assert_eq!(e.kind(), "proposal_closed");
        assert_eq!(e.to_string(), "proposal prop-3 is closed");
    }
}
