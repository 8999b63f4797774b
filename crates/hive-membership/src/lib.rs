//! Hive Membership Directory
//!
//! Binds each agent to one hex cell, tracks liveness through heartbeats, and
//! answers neighbor queries. Adjacency is derived from the cell coordinates
//! (see `hive-topology`); the directory only stores who holds which cell.
//!
//! The directory is a plain synchronous state machine. Callers pass the
//! current time (unix millis) explicitly and serialize access to it.

mod directory;
mod error;
mod identity;
mod record;

pub use directory::{Admission, DirectoryConfig, MembershipCounts, MembershipDirectory};
pub use error::{MembershipError, Result};
pub use identity::{AgentId, MAX_AGENT_ID_LEN};
pub use record::{MemberStatus, MembershipChange, MembershipRecord, Weight};
