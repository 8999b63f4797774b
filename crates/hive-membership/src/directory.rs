//! The membership directory.
//!
//! Authoritative mapping of cell → agent for one mesh node. The directory
//! owns every [`MembershipRecord`] and every cell assignment; nothing else
//! writes to either.
//!
//! Records are soft state: silent members slide to Unreachable, then to
//! Departed (which frees their cell), and Departed records are eventually
//! garbage-collected.

use crate::error::{MembershipError, Result};
use crate::record::{MemberStatus, MembershipChange, MembershipRecord, Weight};
use crate::AgentId;
use hive_topology::{neighbors_of, GridAllocator, HexCoord};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, info};

/// Directory settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryConfig {
    /// Hard cap on held cells (`None` = unbounded).
    pub max_cells: Option<u64>,
    /// Extra silence tolerated after the heartbeat timeout before an
    /// Unreachable member is marked Departed.
    pub departure_grace: Duration,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            max_cells: None,
            departure_grace: Duration::from_secs(120),
        }
    }
}

/// Outcome of a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// New member, or a Departed member re-admitted at a fresh cell.
    Admitted(MembershipRecord),
    /// An Unreachable member came back; it keeps its cell.
    Revived(MembershipRecord),
    /// The agent was already Active. Nothing changed.
    AlreadyRegistered(MembershipRecord),
}

impl Admission {
    pub fn record(&self) -> &MembershipRecord {
        match self {
            Self::Admitted(r) | Self::Revived(r) | Self::AlreadyRegistered(r) => r,
        }
    }

    pub fn into_record(self) -> MembershipRecord {
        match self {
            Self::Admitted(r) | Self::Revived(r) | Self::AlreadyRegistered(r) => r,
        }
    }

    /// Whether the directory changed.
    pub fn is_new_state(&self) -> bool {
        !matches!(self, Self::AlreadyRegistered(_))
    }
}

/// Number of records per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MembershipCounts {
    pub active: usize,
    pub unreachable: usize,
    pub departed: usize,
}

/// Membership directory state.
#[derive(Debug, Default)]
pub struct MembershipDirectory {
    records: HashMap<AgentId, MembershipRecord>,
    /// Cells held by Active or Unreachable members.
    cells: HashMap<HexCoord, AgentId>,
    allocator: GridAllocator,
    departure_grace_ms: u64,
}

impl MembershipDirectory {
    /// Create an empty directory.
    pub fn new(config: DirectoryConfig) -> Self {
        let allocator = match config.max_cells {
            Some(cap) => GridAllocator::with_capacity(cap),
            None => GridAllocator::unbounded(),
        };
        Self {
            records: HashMap::new(),
            cells: HashMap::new(),
            allocator,
            departure_grace_ms: config.departure_grace.as_millis() as u64,
        }
    }

    /// Register an agent, allocating a cell if needed.
    ///
    /// Idempotent for Active agents: the existing record is returned untouched.
    pub fn register(
        &mut self,
        agent: AgentId,
        weight: Weight,
        hint: Option<HexCoord>,
        now: u64,
    ) -> Result<Admission> {
        if let Some(existing) = self.records.get_mut(&agent) {
            match existing.status {
                MemberStatus::Active => {
                    debug!(%agent, coord = %existing.coord, "already registered");
                    return Ok(Admission::AlreadyRegistered(existing.clone()));
                }
                MemberStatus::Unreachable => {
                    existing.transition(MemberStatus::Active, now);
                    existing.last_heartbeat = now;
                    existing.weight = weight;
                    info!(%agent, coord = %existing.coord, "revived unreachable member");
                    return Ok(Admission::Revived(existing.clone()));
                }
                MemberStatus::Departed => {}
            }
        }

        let coord = self.allocate(hint)?;
        self.cells.insert(coord, agent.clone());

        let record = match self.records.get_mut(&agent) {
            Some(departed) => {
                departed.coord = coord;
                departed.weight = weight;
                departed.last_heartbeat = now;
                departed.transition(MemberStatus::Active, now);
                departed.clone()
            }
            None => {
                let record = MembershipRecord::new(agent.clone(), coord, weight, now);
                self.records.insert(agent.clone(), record.clone());
                record
            }
        };

        info!(%agent, %coord, weight = %weight, "admitted member");
        Ok(Admission::Admitted(record))
    }

    fn allocate(&self, hint: Option<HexCoord>) -> Result<HexCoord> {
        let held = self.cells.len() as u64;
        let coord = self
            .allocator
            .allocate(hint, held, |c| self.cells.contains_key(&c))?;
        Ok(coord)
    }

    /// Refresh an agent's liveness.
    ///
    /// Returns the status change when an Unreachable agent comes back.
    pub fn heartbeat(&mut self, agent: &AgentId, now: u64) -> Result<Option<MembershipChange>> {
        let record = self
            .records
            .get_mut(agent)
            .filter(|r| r.status.holds_cell())
            .ok_or_else(|| MembershipError::UnknownAgent(agent.clone()))?;

        record.last_heartbeat = now;
        if record.status == MemberStatus::Unreachable {
            info!(%agent, coord = %record.coord, "heartbeat resumed");
            return Ok(Some(record.transition(MemberStatus::Active, now)));
        }
        Ok(None)
    }

    /// Explicit departure. Frees the agent's cell immediately.
    pub fn withdraw(&mut self, agent: &AgentId, now: u64) -> Result<MembershipChange> {
        let record = self
            .records
            .get_mut(agent)
            .filter(|r| r.status.holds_cell())
            .ok_or_else(|| MembershipError::UnknownAgent(agent.clone()))?;

        let change = record.transition(MemberStatus::Departed, now);
        self.cells.remove(&change.coord);
        info!(%agent, coord = %change.coord, "member withdrew");
        Ok(change)
    }

    /// Apply heartbeat timeouts.
    ///
    /// Active members silent for longer than `timeout` become Unreachable.
    /// Unreachable members silent for longer than `timeout` plus the
    /// departure grace become Departed and release their cell. A member that
    /// has been silent past both windows goes through both transitions in one
    /// sweep. Changes are returned ordered by agent.
    pub fn sweep(&mut self, now: u64, timeout: Duration) -> Vec<MembershipChange> {
        let timeout_ms = timeout.as_millis() as u64;
        let departure_ms = timeout_ms.saturating_add(self.departure_grace_ms);

        let mut changes = Vec::new();
        for record in self.records.values_mut() {
            let silence = record.silence(now);

            if record.status == MemberStatus::Active && silence > timeout_ms {
                changes.push(record.transition(MemberStatus::Unreachable, now));
            }
            if record.status == MemberStatus::Unreachable && silence > departure_ms {
                changes.push(record.transition(MemberStatus::Departed, now));
                self.cells.remove(&record.coord);
            }
        }

        changes.sort_by(|a, b| a.agent.cmp(&b.agent));
        for change in &changes {
            info!(agent = %change.agent, coord = %change.coord, from = %change.from, to = %change.to, "sweep transition");
        }
        changes
    }

    /// Drop Departed records older than `retention`. Returns how many went.
    pub fn collect_garbage(&mut self, now: u64, retention: Duration) -> usize {
        let retention_ms = retention.as_millis() as u64;
        let before = self.records.len();
        self.records.retain(|_, r| {
            r.status != MemberStatus::Departed || now.saturating_sub(r.status_changed_at) <= retention_ms
        });
        let removed = before - self.records.len();
        if removed > 0 {
            debug!(removed, "collected departed records");
        }
        removed
    }

    /// Active members in the six cells around `agent`'s cell.
    ///
    /// Vacant or Unreachable neighbors are absent, so the result holds
    /// between zero and six records, in direction order.
    pub fn resolve_neighbors(&self, agent: &AgentId) -> Result<Vec<MembershipRecord>> {
        let record = self.active_record(agent)?;
        Ok(self.active_neighbors_of(record.coord).into_iter().cloned().collect())
    }

    /// Active members adjacent to `coord`.
    pub fn active_neighbors_of(&self, coord: HexCoord) -> Vec<&MembershipRecord> {
        neighbors_of(coord)
            .iter()
            .filter_map(|c| self.occupant(*c))
            .filter(|r| r.is_active())
            .collect()
    }

    /// Change an Active member's weight. Affects proposals opened afterwards.
    pub fn update_voting_weight(&mut self, agent: &AgentId, weight: Weight) -> Result<MembershipRecord> {
        let record = self
            .records
            .get_mut(agent)
            .filter(|r| r.is_active())
            .ok_or_else(|| MembershipError::UnknownAgent(agent.clone()))?;

        debug!(%agent, old = %record.weight, new = %weight, "voting weight updated");
        record.weight = weight;
        Ok(record.clone())
    }

    /// Any record for `agent`, whatever its status.
    pub fn record(&self, agent: &AgentId) -> Option<&MembershipRecord> {
        self.records.get(agent)
    }

    /// The agent's record, provided it is Active.
    pub fn active_record(&self, agent: &AgentId) -> Result<&MembershipRecord> {
        self.records
            .get(agent)
            .filter(|r| r.is_active())
            .ok_or_else(|| MembershipError::UnknownAgent(agent.clone()))
    }

    /// The member holding `coord` (Active or Unreachable).
    pub fn occupant(&self, coord: HexCoord) -> Option<&MembershipRecord> {
        self.cells.get(&coord).and_then(|agent| self.records.get(agent))
    }

    /// Weight of every Active member, keyed by agent.
    pub fn active_weights(&self) -> BTreeMap<AgentId, Weight> {
        self.records
            .values()
            .filter(|r| r.is_active())
            .map(|r| (r.agent.clone(), r.weight))
            .collect()
    }

    /// Sum of Active members' weight.
    pub fn total_active_weight(&self) -> Weight {
        self.records.values().filter(|r| r.is_active()).map(|r| r.weight).sum()
    }

    pub fn counts(&self) -> MembershipCounts {
        let mut counts = MembershipCounts::default();
        for r in self.records.values() {
            match r.status {
                MemberStatus::Active => counts.active += 1,
                MemberStatus::Unreachable => counts.unreachable += 1,
                MemberStatus::Departed => counts.departed += 1,
            }
        }
        counts
    }

    /// Number of cells currently held.
    pub fn held_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn records(&self) -> impl Iterator<Item = &MembershipRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
