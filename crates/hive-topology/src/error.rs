//! Error types for hive-topology.

use crate::HexCoord;
use thiserror::Error;

/// Result type for topology operations.
pub type Result<T> = std::result::Result<T, TopologyError>;

/// Errors that can occur while addressing cells.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// Every cell allowed by the configured cap is occupied.
    #[error("grid exhausted: all {capacity} cells are occupied")]
    GridExhausted { capacity: u64 },

    /// A requested cell lies outside the addressable range.
    #[error("cell {coord} is out of range (|q|, |r|, |s| must not exceed {})", HexCoord::MAX_AXIS)]
    OutOfRange { coord: HexCoord },
}
