//! Unix socket server for local agents.
//!
//! Newline-delimited JSON: one [`AgentCommand`] per line in, one
//! [`AgentResponse`] per line out. This is the node's inbound boundary for
//! agent processes and for `hive-ctl`.

use crate::error::{HiveError, Result};
use crate::node::{AgentStatus, EmitReport, HiveNode, NodeStats};
use hive_consensus::{Ballot, Choice, Proposal, ProposalDraft, ProposalId, Quorum, Tally};
use hive_membership::{Admission, AgentId, MembershipRecord, Weight};
use hive_pheromone::{BucketPattern, BucketedMetrics, PheromoneTrail};
use hive_topology::HexCoord;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

/// Command sent over the socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum AgentCommand {
    /// Register (idempotent) and resolve neighbors
    Activate {
        agent: AgentId,
        weight: Weight,
        #[serde(default)]
        hint: Option<HexCoord>,
    },
    Heartbeat { agent: AgentId },
    Withdraw { agent: AgentId },
    /// Emit a pheromone trail
    ShareState {
        agent: AgentId,
        metrics: BucketedMetrics,
        #[serde(default)]
        ttl_ms: Option<u64>,
    },
    /// Query trails received at the agent's cell
    Similar {
        agent: AgentId,
        #[serde(default)]
        pattern: BucketPattern,
    },
    OpenProposal {
        #[serde(default)]
        proposer: Option<AgentId>,
        topic: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        quorum: Option<Quorum>,
        #[serde(default)]
        window_secs: Option<u64>,
    },
    Vote {
        agent: AgentId,
        proposal: ProposalId,
        choice: Choice,
    },
    CloseEarly { proposal: ProposalId },
    Status { agent: AgentId },
    Proposal { proposal: ProposalId },
    /// Proposals still accepting ballots
    OpenProposals,
    UpdateWeight { agent: AgentId, weight: Weight },
    Stats,
    /// Ping (health check)
    Ping,
}

/// How a registration was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionKind {
    Admitted,
    Revived,
    AlreadyRegistered,
}

impl From<&Admission> for AdmissionKind {
    fn from(a: &Admission) -> Self {
        match a {
            Admission::Admitted(_) => Self::Admitted,
            Admission::Revived(_) => Self::Revived,
            Admission::AlreadyRegistered(_) => Self::AlreadyRegistered,
        }
    }
}

/// Response to a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AgentResponse {
    Ok { message: String },
    Error {
        kind: String,
        error: String,
        retryable: bool,
    },
    Activated {
        admission: AdmissionKind,
        record: MembershipRecord,
        neighbors: Vec<MembershipRecord>,
    },
    Member { record: MembershipRecord },
    Agent(AgentStatus),
    Emitted(EmitReport),
    Trails { trails: Vec<PheromoneTrail> },
    Ballot { ballot: Ballot },
    Proposal { proposal: Proposal, tally: Tally },
    Proposals { proposals: Vec<Proposal> },
    EarlyClose { closed: Option<Proposal> },
    Stats(NodeStats),
    Pong,
}

impl From<HiveError> for AgentResponse {
    fn from(e: HiveError) -> Self {
        AgentResponse::Error {
            kind: e.kind().to_string(),
            retryable: e.is_retryable(),
            error: e.to_string(),
        }
    }
}

/// Agent socket server.
pub struct AgentSocket {
    node: Arc<HiveNode>,
    socket_path: PathBuf,
}

impl AgentSocket {
    pub fn new(node: Arc<HiveNode>, socket_path: impl Into<PathBuf>) -> Self {
        Self {
            node,
            socket_path: socket_path.into(),
        }
    }

    /// Bind the socket and serve connections until the task is dropped.
    pub async fn run(&self) -> Result<()> {
        // Stale socket from a previous run.
        let _ = std::fs::remove_file(&self.socket_path);
        if let Some(dir) = self.socket_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;
        tracing::info!("Agent socket listening on {}", self.socket_path.display());

        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let node = Arc::clone(&self.node);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, node).await {
                            tracing::error!("Agent connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept agent connection: {}", e);
                }
            }
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

async fn handle_connection(stream: UnixStream, node: Arc<HiveNode>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        if !line.trim().is_empty() {
            let response = match serde_json::from_str::<AgentCommand>(&line) {
                Ok(cmd) => execute_command(cmd, &node).await,
                Err(e) => AgentResponse::Error {
                    kind: "invalid_input".to_string(),
                    error: format!("Invalid command: {}", e),
                    retryable: false,
                },
            };

            let response_json = serde_json::to_string(&response)? + "\n";
            writer.write_all(response_json.as_bytes()).await?;
        }
        line.clear();
    }

    Ok(())
}

/// Run one command against the node.
pub async fn execute_command(cmd: AgentCommand, node: &HiveNode) -> AgentResponse {
    match run_command(cmd, node).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(kind = e.kind(), "agent command failed: {}", e);
            e.into()
        }
    }
}

async fn run_command(cmd: AgentCommand, node: &HiveNode) -> Result<AgentResponse> {
    let response = match cmd {
        AgentCommand::Activate { agent, weight, hint } => {
            let admission = node.register(agent, weight, hint).await?;
            let neighbors = node.resolve_neighbors(&admission.record().agent).await?;
            AgentResponse::Activated {
                admission: AdmissionKind::from(&admission),
                record: admission.into_record(),
                neighbors,
            }
        }

        AgentCommand::Heartbeat { agent } => {
            node.heartbeat(&agent).await?;
            AgentResponse::Ok {
                message: format!("heartbeat from {}", agent),
            }
        }

        AgentCommand::Withdraw { agent } => {
            node.withdraw(&agent).await?;
            AgentResponse::Ok {
                message: format!("{} withdrew", agent),
            }
        }

        AgentCommand::ShareState { agent, metrics, ttl_ms } => {
            let ttl = match ttl_ms {
                Some(0) => return Err(HiveError::InvalidInput("ttl must be at least 1ms".into())),
                Some(ms) => Some(Duration::from_millis(ms)),
                None => None,
            };
            AgentResponse::Emitted(node.emit(&agent, metrics, ttl).await?)
        }

        AgentCommand::Similar { agent, pattern } => AgentResponse::Trails {
            trails: node.similar(&agent, &pattern).await?,
        },

        AgentCommand::OpenProposal {
            proposer,
            topic,
            description,
            quorum,
            window_secs,
        } => {
            let config = node.config();
            let window = match window_secs {
                Some(0) => return Err(HiveError::InvalidInput("voting window must be at least 1ms".into())),
                Some(secs) => Duration::from_secs(secs),
                None => config.proposal_window,
            };
            let mut draft = ProposalDraft::new(topic, quorum.unwrap_or(config.default_quorum), window)
                .with_description(description);
            draft.proposer = proposer;
            let proposal = node.open_proposal(draft).await?;
            let tally = node.preview(proposal.id).await?;
            AgentResponse::Proposal { proposal, tally }
        }

        AgentCommand::Vote { agent, proposal, choice } => AgentResponse::Ballot {
            ballot: node.cast_ballot(proposal, &agent, choice).await?,
        },

        AgentCommand::CloseEarly { proposal } => AgentResponse::EarlyClose {
            closed: node.close_early(proposal).await?,
        },

        AgentCommand::Status { agent } => AgentResponse::Agent(node.status(&agent).await?),

        AgentCommand::Proposal { proposal } => AgentResponse::Proposal {
            proposal: node.proposal(proposal).await?,
            tally: node.preview(proposal).await?,
        },

        AgentCommand::OpenProposals => AgentResponse::Proposals {
            proposals: node.open_proposals().await,
        },

        AgentCommand::UpdateWeight { agent, weight } => AgentResponse::Member {
            record: node.update_voting_weight(&agent, weight).await?,
        },

        AgentCommand::Stats => AgentResponse::Stats(node.stats().await),

        AgentCommand::Ping => AgentResponse::Pong,
    };
    Ok(response)
}

/// Default socket path.
pub fn default_socket_path() -> PathBuf {
    std::env::var("HIVE_AGENT_SOCKET")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./hive-data/agent.sock"))
}
