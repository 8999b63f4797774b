//! Per-cell trail storage.
//!
//! Each cell has an inbox holding at most one trail per origin cell; a newer
//! trail from the same origin overwrites the older one. Inboxes are capped at
//! six origins, which is all a cell can hear from while neighbors stay put.
//! Delivery is at-most-once: a trail that finds no room is dropped, never
//! retried.

use crate::PheromoneTrail;
use crate::BucketPattern;
use hive_topology::{HexCoord, NEIGHBOR_COUNT};
use std::collections::HashMap;
use tracing::debug;

/// What happened to a delivered trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Stored for a new origin.
    Stored,
    /// Overwrote an older trail from the same origin.
    Replaced,
    /// Older than the trail already held for that origin; ignored.
    Stale,
    /// Already expired on arrival; ignored.
    Expired,
    /// Inbox full of live trails from other origins; dropped.
    Dropped,
}

impl Delivery {
    /// Whether the trail is now held by the recipient.
    pub fn is_stored(self) -> bool {
        matches!(self, Self::Stored | Self::Replaced)
    }
}

/// Trails received by every cell on this node.
#[derive(Debug)]
pub struct PheromoneField {
    inboxes: HashMap<HexCoord, HashMap<HexCoord, PheromoneTrail>>,
    inbox_capacity: usize,
}

impl Default for PheromoneField {
    fn default() -> Self {
        Self::new()
    }
}

impl PheromoneField {
    pub fn new() -> Self {
        Self::with_inbox_capacity(NEIGHBOR_COUNT)
    }

    pub fn with_inbox_capacity(inbox_capacity: usize) -> Self {
        Self {
            inboxes: HashMap::new(),
            inbox_capacity: inbox_capacity.max(1),
        }
    }

    /// Deliver `trail` to the inbox of `recipient`.
    pub fn deliver(&mut self, recipient: HexCoord, trail: PheromoneTrail, now: u64) -> Delivery {
        if trail.is_expired(now) {
            return Delivery::Expired;
        }

        let inbox = self.inboxes.entry(recipient).or_default();
        let origin = trail.origin();

        if let Some(existing) = inbox.get_mut(&origin) {
            // Later emission wins; same-millisecond emissions resolve to the later arrival.
            if trail.emitted_at() >= existing.emitted_at() {
                *existing = trail;
                return Delivery::Replaced;
            }
            return Delivery::Stale;
        }

        if inbox.len() >= self.inbox_capacity {
            inbox.retain(|_, t| !t.is_expired(now));
        }
        if inbox.len() >= self.inbox_capacity {
            debug!(%recipient, %origin, "inbox full, trail dropped");
            return Delivery::Dropped;
        }

        inbox.insert(origin, trail);
        Delivery::Stored
    }

    /// Live trails held by `recipient` whose buckets match `pattern`,
    /// ordered by origin.
    pub fn similar_to(&self, recipient: HexCoord, pattern: &BucketPattern, now: u64) -> Vec<&PheromoneTrail> {
        let mut matches: Vec<_> = self
            .inboxes
            .get(&recipient)
            .into_iter()
            .flat_map(|inbox| inbox.values())
            .filter(|t| !t.is_expired(now) && t.metrics().matches(pattern))
            .collect();
        matches.sort_by_key(|t| t.origin());
        matches
    }

    /// Every live trail held by `recipient`, ordered by origin.
    pub fn trails_at(&self, recipient: HexCoord, now: u64) -> Vec<&PheromoneTrail> {
        self.similar_to(recipient, &BucketPattern::any(), now)
    }

    /// Drop every expired trail. Returns how many went.
    pub fn evict_expired(&mut self, now: u64) -> usize {
        let mut evicted = 0;
        for inbox in self.inboxes.values_mut() {
            let before = inbox.len();
            inbox.retain(|_, t| !t.is_expired(now));
            evicted += before - inbox.len();
        }
        self.inboxes.retain(|_, inbox| !inbox.is_empty());
        evicted
    }

    /// Forget everything delivered to `coord` (its occupant left).
    pub fn clear_cell(&mut self, coord: HexCoord) -> usize {
        self.inboxes.remove(&coord).map(|inbox| inbox.len()).unwrap_or(0)
    }

    /// Total trails held, expired or not.
    pub fn len(&self) -> usize {
        self.inboxes.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
