//! Hive Consensus
//!
//! Stake-weighted voting on proposals.
//!
//! # Rules
//!
//! - The electorate (Active members and their weights) is snapshotted when a
//!   proposal opens. Its total is the quorum denominator for the proposal's
//!   whole life.
//! - One ballot per voter; a later ballot replaces the earlier one.
//! - At `closes_at`: turnout below quorum expires the proposal, otherwise
//!   for-weight strictly above against-weight passes it. Ties reject.
//! - A proposal may close early once no uncast weight can change the outcome.

mod ballot;
mod engine;
mod error;
mod proposal;
mod quorum;
mod tally;

pub use ballot::{Ballot, Choice};
pub use engine::{ConsensusEngine, ConsensusStats, Finalized};
pub use error::{ConsensusError, Result};
pub use proposal::{
    Electorate, Proposal, ProposalDraft, ProposalId, ProposalStatus, MAX_DESCRIPTION_LEN,
    MAX_TOPIC_LEN,
};
pub use quorum::{Quorum, PPM};
pub use tally::Tally;
