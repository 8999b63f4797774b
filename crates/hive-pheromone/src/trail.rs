//! Pheromone trails.

use crate::error::{PheromoneError, Result};
use crate::{BucketedMetrics, Fingerprint};
use hive_topology::HexCoord;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// An anonymized, expiring state snapshot.
///
/// Immutable once built: a trail is only ever stored, overwritten by a newer
/// trail from the same origin, or dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PheromoneTrail {
    fingerprint: Fingerprint,
    metrics: BucketedMetrics,
    origin: HexCoord,
    /// Unix millis.
    emitted_at: u64,
    ttl_ms: u64,
}

impl PheromoneTrail {
    /// Build a trail. A ttl under one millisecond is rejected.
    pub fn new(
        fingerprint: Fingerprint,
        metrics: BucketedMetrics,
        origin: HexCoord,
        emitted_at: u64,
        ttl: Duration,
    ) -> Result<Self> {
        let ttl_ms = ttl.as_millis() as u64;
        if ttl_ms == 0 {
            return Err(PheromoneError::InvalidInput("ttl must be at least 1ms".into()));
        }
        Ok(Self {
            fingerprint,
            metrics,
            origin,
            emitted_at,
            ttl_ms,
        })
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn metrics(&self) -> &BucketedMetrics {
        &self.metrics
    }

    pub fn origin(&self) -> HexCoord {
        self.origin
    }

    pub fn emitted_at(&self) -> u64 {
        self.emitted_at
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Last instant (unix millis) at which the trail is live.
    pub fn expires_at(&self) -> u64 {
        self.emitted_at.saturating_add(self.ttl_ms)
    }

    /// Expired iff `now > emitted_at + ttl`.
    pub fn is_expired(&self, now: u64) -> bool {
        now > self.expires_at()
    }
}
