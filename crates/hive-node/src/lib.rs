//! Hive Node - membership, pheromones and voting behind one service
//!
//! Composes the state crates into a concurrent service and exposes it to
//! agents.
//!
//! # Architecture
//!
//! - **Node**: owns the membership directory, consensus engine and pheromone
//!   field, each behind its own lock, plus the event channel
//! - **Client**: per-agent facade (activate, share state, vote, status)
//! - **Agent Socket**: Unix socket for local agents (hive-ctl CLI)
//! - **Events**: proposal finalization, missed heartbeats, membership changes
//!
//! # Example
//!
//! ```no_run
//! use hive_node::{HiveClient, HiveConfig, HiveNode};
//! use hive_membership::{AgentId, Weight};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let node = Arc::new(HiveNode::new(HiveConfig::from_env()?));
//!     let client = HiveClient::new(node, AgentId::new("agent-a")?, Weight::new(10));
//!     let activation = client.activate().await?;
//!     println!("holding {}", activation.coord());
//!     Ok(())
//! }
//! ```

pub mod agent_socket;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod node;
pub mod retry;

pub use agent_socket::{AdmissionKind, AgentCommand, AgentResponse, AgentSocket};
pub use client::{Activation, HiveClient};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, HiveConfig};
pub use error::{HiveError, Result};
pub use events::HiveEvent;
pub use node::{AgentStatus, DeliveryCounts, EmitReport, HiveNode, NodeStats, TickReport};
pub use retry::RetryPolicy;
