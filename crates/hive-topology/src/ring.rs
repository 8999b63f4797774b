//! Ring enumeration in allocation order.
//!
//! Cells are grouped into concentric rings around the origin. Allocation
//! walks rings outward and, within a ring, visits cells by ascending q and
//! then ascending r. The order depends only on geometry, so two directories
//! with the same occupancy always pick the same cell.
//!
//! - Ring 0: just the origin (1 cell)
//! - Ring n > 0: 6n cells, 1 + 3n(n+1) cells through ring n

use crate::HexCoord;

/// Number of cells in ring n.
#[inline]
pub const fn cells_in_ring(ring: u64) -> u64 {
    if ring == 0 {
        1
    } else {
        6 * ring
    }
}

/// Total cells through ring n (inclusive).
///
/// Formula: 1 + 3n(n+1)
#[inline]
pub const fn total_cells_through(ring: u64) -> u64 {
    1 + 3 * ring * (ring + 1)
}

/// All cells of ring n, sorted ascending by (q, r).
pub fn ring_cells(ring: u64) -> Vec<HexCoord> {
    if ring == 0 {
        return vec![HexCoord::ORIGIN];
    }

    let n = ring as i64;

    // Walk the six edges counter-clockwise from the east corner.
    let corners = [
        HexCoord::new(n, 0),
        HexCoord::new(0, n),
        HexCoord::new(-n, n),
        HexCoord::new(-n, 0),
        HexCoord::new(0, -n),
        HexCoord::new(n, -n),
    ];
    let directions = [
        HexCoord::new(-1, 1),
        HexCoord::new(-1, 0),
        HexCoord::new(0, -1),
        HexCoord::new(1, -1),
        HexCoord::new(1, 0),
        HexCoord::new(0, 1),
    ];

    let mut cells = Vec::with_capacity(cells_in_ring(ring) as usize);
    for (corner, dir) in corners.iter().zip(directions.iter()) {
        for step in 0..n {
            cells.push(HexCoord::new(corner.q + dir.q * step, corner.r + dir.r * step));
        }
    }

    cells.sort_unstable();
    cells
}

/// Iterator over cells in allocation order, ring by ring.
pub struct Rings {
    ring: u64,
    last_ring: Option<u64>,
    buffer: Vec<HexCoord>,
    pos: usize,
}

impl Rings {
    /// Infinite walk starting at the origin.
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Infinite walk starting at ring `start`.
    pub fn starting_at(start: u64) -> Self {
        Self {
            ring: start,
            last_ring: None,
            buffer: ring_cells(start),
            pos: 0,
        }
    }

    /// Walk rings `start..=end` only.
    pub fn through(start: u64, end: u64) -> Self {
        let mut rings = Self::starting_at(start);
        rings.last_ring = Some(end);
        if end < start {
            rings.buffer.clear();
        }
        rings
    }

    /// Ring currently being walked.
    pub fn current_ring(&self) -> u64 {
        self.ring
    }
}

impl Default for Rings {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for Rings {
    type Item = HexCoord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.buffer.len() {
            if self.buffer.is_empty() {
                return None;
            }
            let next_ring = self.ring + 1;
            if matches!(self.last_ring, Some(last) if next_ring > last) {
                self.buffer.clear();
                return None;
            }
            self.ring = next_ring;
            self.buffer = ring_cells(next_ring);
            self.pos = 0;
        }

        let coord = self.buffer[self.pos];
        self.pos += 1;
        Some(coord)
    }
}
