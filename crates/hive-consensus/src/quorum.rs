//! Quorum thresholds.
//!
//! A quorum is a fraction of the electorate's weight, stored in parts per
//! million so that threshold checks are exact integer arithmetic:
//!
//! ```text
//! required(total) = ceil(total × ppm / 1_000_000)
//! ```

use crate::error::{ConsensusError, Result};
use serde::{Deserialize, Serialize};

/// Parts-per-million denominator.
pub const PPM: u64 = 1_000_000;

/// Fraction of electorate weight that must take part, in `(0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Quorum {
    ppm: u32,
}

impl Quorum {
    /// Simple majority of the electorate.
    pub const HALF: Self = Self { ppm: 500_000 };

    /// Validate a fraction. Rounded to the nearest part per million.
    pub fn new(fraction: f64) -> Result<Self> {
        if !fraction.is_finite() || fraction <= 0.0 || fraction > 1.0 {
            return Err(ConsensusError::InvalidInput(format!(
                "quorum must be in (0, 1], got {}",
                fraction
            )));
        }
        let ppm = (fraction * PPM as f64).round().max(1.0) as u32;
        Ok(Self { ppm })
    }

    pub const fn ppm(&self) -> u32 {
        self.ppm
    }

    pub fn fraction(&self) -> f64 {
        self.ppm as f64 / PPM as f64
    }

    /// Minimum participating weight for an electorate of `total`.
    pub const fn required_weight(&self, total: u64) -> u64 {
        let product = total as u128 * self.ppm as u128;
        ((product + PPM as u128 - 1) / PPM as u128) as u64
    }

    /// Whether `cast` out of `total` meets the quorum.
    ///
    /// An empty electorate never meets a quorum.
    pub const fn is_met(&self, cast: u64, total: u64) -> bool {
        total > 0 && cast >= self.required_weight(total)
    }
}

impl Default for Quorum {
    fn default() -> Self {
        Self::HALF
    }
}

impl TryFrom<f64> for Quorum {
    type Error = ConsensusError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Quorum> for f64 {
    fn from(q: Quorum) -> Self {
        q.fraction()
    }
}

impl std::fmt::Display for Quorum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.fraction())
    }
}
