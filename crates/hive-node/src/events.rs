//! Outbound notifications.
//!
//! Every state change the node makes on its own (sweeps, closes) or on a
//! caller's behalf is published on a broadcast channel. Subscribers that fall
//! behind lose the oldest events.

use hive_consensus::{Finalized, Proposal, Tally};
use hive_membership::{AgentId, MemberStatus, MembershipChange};
use hive_topology::HexCoord;
use serde::{Deserialize, Serialize};

/// A notification for token-economics, audit and other observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HiveEvent {
    /// A proposal reached Passed, Rejected or Expired.
    ProposalFinalized { proposal: Proposal, tally: Tally },

    /// An Active member went silent past the heartbeat timeout.
    HeartbeatMissed { agent: AgentId, coord: HexCoord, at: u64 },

    /// A member's status changed.
    MembershipChanged {
        agent: AgentId,
        coord: HexCoord,
        from: Option<MemberStatus>,
        status: MemberStatus,
        at: u64,
    },
}

impl HiveEvent {
    /// Events describing one status change.
    ///
    /// A missed heartbeat yields both `HeartbeatMissed` and
    /// `MembershipChanged`.
    pub fn from_change(change: &MembershipChange) -> Vec<Self> {
        let mut events = Vec::with_capacity(2);
        if change.is_missed_heartbeat() {
            events.push(Self::HeartbeatMissed {
                agent: change.agent.clone(),
                coord: change.coord,
                at: change.at,
            });
        }
        events.push(Self::MembershipChanged {
            agent: change.agent.clone(),
            coord: change.coord,
            from: Some(change.from),
            status: change.to,
            at: change.at,
        });
        events
    }

    /// A member that entered the directory or came back.
    pub fn joined(agent: AgentId, coord: HexCoord, from: Option<MemberStatus>, at: u64) -> Self {
        Self::MembershipChanged {
            agent,
            coord,
            from,
            status: MemberStatus::Active,
            at,
        }
    }

    pub fn finalized(done: Finalized) -> Self {
        Self::ProposalFinalized {
            proposal: done.proposal,
            tally: done.tally,
        }
    }

    /// The agent the event is about, if any.
    pub fn agent(&self) -> Option<&AgentId> {
        match self {
            Self::HeartbeatMissed { agent, .. } | Self::MembershipChanged { agent, .. } => Some(agent),
            Self::ProposalFinalized { .. } => None,
        }
    }
}
