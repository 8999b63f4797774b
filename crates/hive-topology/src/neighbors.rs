//! Six-neighbor adjacency.
//!
//! Adjacency is derived from the six fixed axial offsets and never stored.
//! Direction `i` and direction `(i + 3) % 6` are opposite, which is what makes
//! the relation symmetric.

use crate::{HexCoord, NEIGHBOR_COUNT};

/// The six neighbor coordinates of a cell, in direction order.
///
/// Pure: performs no lookups and never fails.
pub fn neighbors_of(coord: HexCoord) -> [HexCoord; NEIGHBOR_COUNT] {
    coord.neighbors()
}

/// Index of the direction pointing back along direction `dir`.
pub const fn opposite_direction(dir: usize) -> usize {
    (dir + NEIGHBOR_COUNT / 2) % NEIGHBOR_COUNT
}

/// Direction index from `from` to `to`, if they are adjacent.
pub fn direction_between(from: HexCoord, to: HexCoord) -> Option<usize> {
    let diff = to - from;
    HexCoord::DIRECTIONS.iter().position(|d| *d == diff)
}

/// Check if two coordinates are adjacent cells.
pub fn are_neighbors(a: HexCoord, b: HexCoord) -> bool {
    direction_between(a, b).is_some()
}

/// Count how many of a cell's six neighbors satisfy `is_present`.
pub fn count_present_neighbors<F>(coord: HexCoord, is_present: F) -> usize
where
    F: Fn(HexCoord) -> bool,
{
    neighbors_of(coord)
        .iter()
        .filter(|&&n| is_present(n))
        .count()
}
