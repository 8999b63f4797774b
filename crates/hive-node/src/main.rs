//! Hive Node binary
//!
//! Runs one mesh node: the agent socket plus the maintenance loop.

use hive_node::{AgentSocket, HiveConfig, HiveNode};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hive_node=info,hive=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = HiveConfig::from_env()?;
    tracing::info!("Starting Hive node");
    tracing::info!("  Agent socket: {}", config.agent_socket.display());
    tracing::info!("  Heartbeat timeout: {:?}", config.heartbeat_timeout);
    tracing::info!("  Max cells: {:?}", config.max_cells);

    let node = Arc::new(HiveNode::new(config));

    let socket = AgentSocket::new(Arc::clone(&node), node.config().agent_socket.clone());
    tokio::spawn(async move {
        if let Err(e) = socket.run().await {
            tracing::error!("Agent socket error: {}", e);
        }
    });

    // Audit trail of every event
    let mut events = node.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => tracing::info!(target: "hive::events", "{}", json),
                    Err(e) => tracing::warn!("Unserializable event: {}", e),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Event log lagged, {} events skipped", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };
    node.run(shutdown).await?;

    tracing::info!("Hive node stopped");
    Ok(())
}
