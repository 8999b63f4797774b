//! Error types for hive-membership.

use crate::AgentId;
use hive_topology::TopologyError;
use thiserror::Error;

/// Result type for directory operations.
pub type Result<T> = std::result::Result<T, MembershipError>;

/// Errors returned by the membership directory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MembershipError {
    /// The agent has no Active record and must register again.
    #[error("unknown agent: {0}")]
    UnknownAgent(AgentId),

    /// No cell could be allocated.
    #[error(transparent)]
    Grid(#[from] TopologyError),

    /// Malformed identity or weight.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
