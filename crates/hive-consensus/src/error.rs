//! Error types for hive-consensus.

use crate::ProposalId;
use thiserror::Error;

/// Result type for consensus operations.
pub type Result<T> = std::result::Result<T, ConsensusError>;

/// Errors returned by the voting engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsensusError {
    /// No proposal with this id.
    #[error("unknown proposal: {0}")]
    UnknownProposal(ProposalId),

    /// The proposal no longer accepts ballots.
    #[error("proposal {0} is closed")]
    ProposalClosed(ProposalId),

    /// Malformed topic, description, quorum or window.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
