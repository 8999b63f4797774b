//! Deterministic cell allocation.
//!
//! A new member gets the first vacant cell in ring order (see [`Rings`]).
//! Filling the innermost rings first keeps the mesh compact without piling
//! everyone onto the origin, and the fixed tie-break makes allocation a pure
//! function of the occupancy snapshot.

use crate::error::{Result, TopologyError};
use crate::{HexCoord, Rings};

/// Allocates cells against an occupancy snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridAllocator {
    /// Hard cap on occupied cells (`None` = unbounded).
    capacity: Option<u64>,
}

impl GridAllocator {
    /// Allocator with no cell cap.
    pub const fn unbounded() -> Self {
        Self { capacity: None }
    }

    /// Allocator refusing to go beyond `capacity` occupied cells.
    pub const fn with_capacity(capacity: u64) -> Self {
        Self {
            capacity: Some(capacity),
        }
    }

    /// The configured cap, if any.
    pub const fn capacity(&self) -> Option<u64> {
        self.capacity
    }

    /// Pick a cell for a new occupant.
    ///
    /// `occupied` is the number of cells currently held and `is_occupied`
    /// answers for a single cell. A vacant `hint` is honoured as-is; otherwise
    /// the first vacant cell in ring order is returned. A hint that is not
    /// [addressable](HexCoord::is_addressable) is rejected outright.
    pub fn allocate<F>(&self, hint: Option<HexCoord>, occupied: u64, is_occupied: F) -> Result<HexCoord>
    where
        F: Fn(HexCoord) -> bool,
    {
        if let Some(coord) = hint.filter(|h| !h.is_addressable()) {
            return Err(TopologyError::OutOfRange { coord });
        }

        if let Some(capacity) = self.capacity {
            if occupied >= capacity {
                return Err(TopologyError::GridExhausted { capacity });
            }
        }

        if let Some(hint) = hint {
            if !is_occupied(hint) {
                return Ok(hint);
            }
        }

        // Occupancy is finite and the walk is not, so `find` always succeeds.
        Rings::new()
            .find(|&coord| !is_occupied(coord))
            .ok_or(TopologyError::GridExhausted {
                capacity: self.capacity.unwrap_or(u64::MAX),
            })
    }
}
