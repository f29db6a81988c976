use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use paxos_chain::{client::Client, config::Config, network::{node::Node, relay::Relay}};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Replicated ledger node and message relay
#[derive(Parser, Debug)]
#[command(name = "paxos-chain")]
#[command(version, about, long_about = None)]
struct Args {
    /// Node table and relay settings
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    role: Role,
}

#[derive(Subcommand, Debug)]
enum Role {
    /// Run a ledger node with the interactive menu
    Node {
        /// Identifier of this node in the node table
        id: String,
    },
    /// Run the delaying relay every node sends through
    Relay,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    match args.role {
        Role::Node { id } => {
            let node = Node::new(id.clone(), config.clone()).context("starting node")?;
            let handle = node.start().await.context("starting node")?;

            let client = Client::new(id, config.peers(), handle.event_tx.clone());
            client.run().await.context("client menu")?;
            info!("Bye!");
        }
        Role::Relay => {
            let relay = Relay::new(config);
            let listener = relay.bind().await.context("binding relay")?;
            relay.run(listener).await;
        }
    }
    Ok(())
}
