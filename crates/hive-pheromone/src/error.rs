//! Error types for hive-pheromone.

use thiserror::Error;

/// Result type for pheromone operations.
pub type Result<T> = std::result::Result<T, PheromoneError>;

/// Errors raised while building trails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PheromoneError {
    /// Malformed metrics, pattern or ttl.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
