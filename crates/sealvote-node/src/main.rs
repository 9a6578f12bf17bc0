//! SealVote Node - operator binary for the encrypted voting ledger.
//!
//! Opens (or creates) the commit log in the data directory, runs the
//! decryption oracle worker and serves JSON-lines commands on stdin.
//! Responses and ledger events are written to stdout; logs go to stderr.

pub mod command;
pub mod config;
pub mod node;
pub mod oracle;
pub mod telemetry;

use clap::{Parser, Subcommand};
use sealvote_ledger::{RevealPolicy, WeightPolicy};
use sealvote_types::Address;
use std::path::PathBuf;
use tracing::{error, info};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "sealvote-node")]
#[command(about = "SealVote Node - private ballots, public tallies")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Config file path
    #[arg(short, long, value_name = "FILE", env = "SEALVOTE_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long)]
    log_level: Option<String>,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,

    /// Genesis admin for a fresh data directory (seal1... or 0x...)
    #[arg(long)]
    admin: Option<Address>,

    /// Treat min_votes_for_reveal as informational only
    #[arg(long)]
    advisory_threshold: bool,

    /// Count every ballot as one vote regardless of weight
    #[arg(long)]
    flat_votes: bool,

    #[command(subcommand)]
    command: Option<NodeCommand>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum NodeCommand {
    /// Serve commands on stdin (default)
    Serve,
    /// Write the effective configuration to a file
    Init {
        /// Output path
        #[arg(default_value = "sealvote.toml")]
        out: PathBuf,
    },
    /// Print a summary of the ledger and exit
    Status,
}

impl Args {
    /// Load the config file (or defaults) and apply CLI overrides.
    fn node_config(&self) -> anyhow::Result<config::NodeConfig> {
        let mut config = match &self.config {
            Some(path) => config::NodeConfig::from_file(path)?,
            None => config::NodeConfig::default(),
        };

        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.json_logs {
            config.logging.format = "json".to_string();
        }
        if let Some(admin) = self.admin {
            config.ledger.genesis_admin = admin;
        }
        if self.advisory_threshold {
            config.ledger.reveal_policy = RevealPolicy::Advisory;
        }
        if self.flat_votes {
            config.ledger.weight_policy = WeightPolicy::Flat;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = args.node_config()?;

    telemetry::init(&config.logging)?;

    match args.command.unwrap_or(NodeCommand::Serve) {
        NodeCommand::Init { out } => {
            config.to_file(&out)?;
            info!("Configuration written to {:?}", out);
        }
        NodeCommand::Status => {
            let node = node::VotingNode::new(config)?;
            let store = node.store();
            let status = serde_json::json!({
                "admin": store.admin(),
                "paused": store.is_paused(),
                "registered_users": store.registered_count(),
                "commits": store.commit_count(),
                "summary": store.summary(),
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        NodeCommand::Serve => {
            info!("Configuration:");
            info!("  Name: {}", config.name);
            info!("  Data dir: {:?}", config.data_dir);
            info!("  Genesis admin: {}", config.ledger.genesis_admin);
            info!("  Reveal policy: {:?}", config.ledger.reveal_policy);
            info!("  Weight policy: {:?}", config.ledger.weight_policy);

            let node = node::VotingNode::new(config)?;
            if let Err(e) = node.run().await {
                error!("Node error: {}", e);
                return Err(e);
            }
        }
    }

    Ok(())
}
