//! bivvy agent entry point.
//!
//! Boots the resource-caching agent on a JSON-lines stdio transport: the
//! hosting runtime writes lifecycle events to stdin, the agent writes
//! replies and host directives to stdout. Logging goes to stderr to avoid
//! interfering with the protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use bivvy_client::{HttpClient, NetworkConfig};
use bivvy_core::{AgentConfig, CacheDb};

mod agent;
mod events;
mod generations;
mod host;
mod notify;
mod offline;
mod preload;
mod resolve;
mod sync;
#[cfg(test)]
mod testutil;

use agent::Agent;
use events::StdioHost;
use sync::NoopSyncQueue;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AgentConfig::load()?;
    tracing::info!(
        "starting bivvy agent, generation {} for origin {}",
        config.version,
        config.origin
    );

    let storage = CacheDb::open(&config.db_path).await?;

    let mut network_config = NetworkConfig::new(config.origin_url()?);
    network_config.user_agent = config.user_agent.clone();
    network_config.timeout = config.timeout();
    network_config.max_bytes = config.max_bytes;
    let network = HttpClient::new(network_config)?;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let agent = Arc::new(Agent::new(
        config,
        Arc::new(storage),
        Arc::new(network),
        Arc::new(StdioHost::new(tx.clone())),
        Arc::new(NoopSyncQueue),
    )?);

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = rx.recv().await {
            if stdout.write_all(line.as_bytes()).await.is_err() || stdout.write_all(b"\n").await.is_err() {
                break;
            }
            let _ = stdout.flush().await;
        }
    });

    // each event is dispatched on its own task: fetches are highly
    // concurrent and must not queue behind one another
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let agent = agent.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let reply = events::dispatch(&agent, &line).await;
            match serde_json::to_string(&reply) {
                Ok(json) => {
                    let _ = tx.send(json);
                }
                Err(err) => tracing::error!("failed to encode reply: {err}"),
            }
        });
    }

    // the agent's StdioHost holds a sender clone; both must drop before
    // the writer sees the channel close
    drop(tx);
    drop(agent);
    writer.await?;

    Ok(())
}
