//! Hive Mesh Topology
//!
//! Every agent in the Hive occupies one cell of an infinite hexagonal tiling
//! addressed by axial coordinates (q, r). Each cell has exactly six
//! neighbors, computed from fixed offsets rather than stored.
//!
//! # Allocation
//!
//! New members receive the vacant cell with the smallest ring radius, ties
//! broken by ascending q and then ascending r. Allocation is a pure function
//! of the occupancy snapshot, which keeps it reproducible and testable.

mod allocator;
mod error;
mod hex;
mod neighbors;
mod ring;

pub use allocator::GridAllocator;
pub use error::{Result, TopologyError};
pub use hex::HexCoord;
pub use neighbors::{are_neighbors, count_present_neighbors, direction_between, neighbors_of, opposite_direction};
pub use ring::{cells_in_ring, ring_cells, total_cells_through, Rings};

/// Number of neighbors per cell (invariant: always 6).
pub const NEIGHBOR_COUNT: usize = 6;

const _: () = assert!(HexCoord::DIRECTIONS.len() == NEIGHBOR_COUNT);
