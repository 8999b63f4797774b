//! Hexagonal coordinate system using axial coordinates.
//!
//! Axial coordinates use two axes (q, r) at 60 degrees, with an implicit
//! third axis s = -q - r. Every Hive cell is addressed this way; the tiling
//! is infinite and flat.

use std::ops::{Add, Neg, Sub};

/// A cell in the infinite hexagonal tiling.
///
/// The implicit third axis is s = -q - r.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HexCoord {
    /// First axial coordinate
    pub q: i64,
    /// Second axial coordinate
    pub r: i64,
}

impl HexCoord {
    /// Origin of the coordinate system.
    pub const ORIGIN: Self = Self { q: 0, r: 0 };

    /// Largest magnitude any axis of an addressable cell may have.
    ///
    /// Neighbor offsets and distances between addressable cells stay
    /// inside `i64` arithmetic.
    pub const MAX_AXIS: i64 = i64::MAX / 4;

    /// Create a new coordinate.
    pub const fn new(q: i64, r: i64) -> Self {
        Self { q, r }
    }

    /// Compute the implicit third axis: s = -q - r.
    pub const fn s(&self) -> i64 {
        -self.q - self.r
    }

    /// Whether `q`, `r` and `s` all lie within [`Self::MAX_AXIS`].
    pub const fn is_addressable(&self) -> bool {
        let bound = Self::MAX_AXIS.unsigned_abs();
        // s is only computed once q and r are known to be small enough.
        self.q.unsigned_abs() <= bound
            && self.r.unsigned_abs() <= bound
            && self.s().unsigned_abs() <= bound
    }

    /// Hexagonal distance between two cells.
    ///
    /// max(|dq|, |dr|, |ds|) where ds = -dq - dr
    pub fn hex_distance(&self, other: &Self) -> u64 {
        let dq = (self.q - other.q).unsigned_abs();
        let dr = (self.r - other.r).unsigned_abs();
        let ds = ((self.q - other.q) + (self.r - other.r)).unsigned_abs();
        dq.max(dr).max(ds)
    }

    /// Ring number around the origin (0 = origin, 1 = first ring, etc.)
    pub fn ring(&self) -> u64 {
        self.hex_distance(&Self::ORIGIN)
    }

    /// The six axial unit vectors.
    pub const DIRECTIONS: [Self; 6] = [
        Self { q: 1, r: 0 },  // East
        Self { q: 1, r: -1 }, // Northeast
        Self { q: 0, r: -1 }, // Northwest
        Self { q: -1, r: 0 }, // West
        Self { q: -1, r: 1 }, // Southwest
        Self { q: 0, r: 1 },  // Southeast
    ];

    /// Get all six neighbors.
    pub fn neighbors(&self) -> [Self; 6] {
        Self::DIRECTIONS.map(|d| *self + d)
    }
}

impl Add for HexCoord {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self {
            q: self.q + other.q,
            r: self.r + other.r,
        }
    }
}

impl Sub for HexCoord {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self {
            q: self.q - other.q,
            r: self.r - other.r,
        }
    }
}

impl Neg for HexCoord {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self {
            q: -self.q,
            r: -self.r,
        }
    }
}

impl std::fmt::Display for HexCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}
