//! Ballots.

use crate::ProposalId;
use hive_membership::{AgentId, Weight};
use serde::{Deserialize, Serialize};

/// A voter's choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice {
    For,
    Against,
    /// Counts toward turnout, not toward the for/against comparison.
    Abstain,
}

impl std::fmt::Display for Choice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::For => "for",
            Self::Against => "against",
            Self::Abstain => "abstain",
        })
    }
}

/// One voter's ballot on one proposal.
///
/// `weight` is the voter's weight in the proposal's electorate, fixed when the
/// proposal opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub proposal: ProposalId,
    pub voter: AgentId,
    pub choice: Choice,
    pub weight: Weight,
    pub cast_at: u64,
}
