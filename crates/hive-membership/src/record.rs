//! Membership records and their lifecycle.

use crate::AgentId;
use hive_topology::HexCoord;
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::Add;

/// Voting weight in stake units.
///
/// Unsigned, so a negative weight cannot be constructed; inbound payloads
/// with negative numbers fail to deserialize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Weight(pub u64);

impl Weight {
    pub const ZERO: Self = Self(0);

    pub const fn new(units: u64) -> Self {
        Self(units)
    }

    pub const fn units(&self) -> u64 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Add for Weight {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl Sum for Weight {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<u64> for Weight {
    fn from(units: u64) -> Self {
        Self(units)
    }
}

impl std::fmt::Display for Weight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Liveness of a member.
///
/// ```text
/// Active ──(timeout)──▶ Unreachable ──(grace)──▶ Departed
///   ▲                        │
///   └──────(heartbeat)───────┘
/// ```
///
/// Departed is reached directly by an explicit withdrawal. Only Departed
/// releases the member's cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Active,
    Unreachable,
    Departed,
}

impl MemberStatus {
    /// Whether a member in this status still holds its cell.
    pub fn holds_cell(self) -> bool {
        !matches!(self, Self::Departed)
    }
}

impl std::fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Unreachable => write!(f, "unreachable"),
            Self::Departed => write!(f, "departed"),
        }
    }
}

/// One agent's binding to a cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub agent: AgentId,
    /// Cell held (or last held, once Departed).
    pub coord: HexCoord,
    pub weight: Weight,
    /// Unix millis of first registration.
    pub joined_at: u64,
    /// Unix millis of the last heartbeat or registration.
    pub last_heartbeat: u64,
    pub status: MemberStatus,
    /// Unix millis of the last status transition.
    pub status_changed_at: u64,
}

impl MembershipRecord {
    pub(crate) fn new(agent: AgentId, coord: HexCoord, weight: Weight, now: u64) -> Self {
        Self {
            agent,
            coord,
            weight,
            joined_at: now,
            last_heartbeat: now,
            status: MemberStatus::Active,
            status_changed_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }

    /// Milliseconds since the last heartbeat.
    pub fn silence(&self, now: u64) -> u64 {
        now.saturating_sub(self.last_heartbeat)
    }

    pub(crate) fn transition(&mut self, to: MemberStatus, now: u64) -> MembershipChange {
        let change = MembershipChange {
            agent: self.agent.clone(),
            coord: self.coord,
            from: self.status,
            to,
            at: now,
        };
        self.status = to;
        self.status_changed_at = now;
        change
    }
}

/// A status transition, reported to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipChange {
    pub agent: AgentId,
    pub coord: HexCoord,
    pub from: MemberStatus,
    pub to: MemberStatus,
    pub at: u64,
}

impl MembershipChange {
    /// Active → Unreachable: the member stopped heartbeating.
    pub fn is_missed_heartbeat(&self) -> bool {
        self.from == MemberStatus::Active && self.to == MemberStatus::Unreachable
    }
}
