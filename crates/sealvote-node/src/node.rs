//! Node runtime: store, oracle worker, event feed and command loop.

use crate::command::{execute_line, Response};
use crate::config::NodeConfig;
use crate::oracle::{spawn_worker, ChannelOracle};
use sealvote_crypto::{MockDecryptor, MockEngine};
use sealvote_ledger::VotingStore;
use sealvote_types::SystemClock;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Output line written to stdout.
#[derive(Debug)]
enum Output {
    Response(Response),
    Event(String),
}

pub struct VotingNode {
    config: NodeConfig,
    store: Arc<VotingStore>,
    engine: Arc<MockEngine>,
    worker: JoinHandle<()>,
}

impl VotingNode {
    /// Open the store, start the oracle worker and resubmit pending reveals.
    /// Must run inside a tokio runtime.
    pub fn new(config: NodeConfig) -> anyhow::Result<Self> {
        let engine = Arc::new(MockEngine::from_seed(&config.oracle.engine_seed));
        let decryptor = Arc::new(MockDecryptor::new(engine.clone(), &config.oracle.attestation_seed));
        let (oracle, requests) = ChannelOracle::new(decryptor.clone());

        let store = Arc::new(VotingStore::open(
            &config.data_dir,
            config.ledger.clone(),
            engine.clone(),
            Arc::new(oracle),
            Arc::new(SystemClock),
        )?);

        let delay = Duration::from_millis(config.oracle.delivery_delay_ms);
        let worker = spawn_worker(store.clone(), decryptor, requests, delay);

        // The previous run's oracle queue died with it.
        let resubmitted = store.resubmit_pending_reveals()?;
        if resubmitted > 0 {
            info!(resubmitted, "Pending reveals handed to the oracle");
        }

        Ok(Self { config, store, engine, worker })
    }

    pub fn store(&self) -> &Arc<VotingStore> {
        &self.store
    }

    /// Serve JSON-lines commands from stdin until EOF or Ctrl-C.
    pub async fn run(self) -> anyhow::Result<()> {
        info!(name = %self.config.name, admin = %self.store.admin(), "Node ready for commands");

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Output>();

        let writer = tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();
            while let Some(output) = out_rx.recv().await {
                let line = match output {
                    Output::Response(response) => serde_json::to_string(&response).unwrap_or_default(),
                    Output::Event(line) => line,
                };
                if stdout.write_all(format!("{}\n", line).as_bytes()).await.is_err() {
                    break;
                }
                let _ = stdout.flush().await;
            }
        });

        let mut events = self.store.subscribe();
        let event_tx = out_tx.clone();
        let feed = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let line = serde_json::to_string(&event).unwrap_or_default();
                        if event_tx.send(Output::Event(line)).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event feed lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        info!("Input closed");
                        break;
                    };
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    let response = execute_line(&self.store, &self.engine, line);
                    if out_tx.send(Output::Response(response)).is_err() {
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, shutting down...");
                    break;
                }
            }
        }

        feed.abort();
        drop(out_tx);
        let _ = writer.await;

        info!(commits = self.store.commit_count(), "Node stopped");
        Ok(())
    }
}

impl Drop for VotingNode {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealvote_crypto::QueuedOracle;
    use sealvote_types::{Address, Clock, ManualClock};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_node_creation() {
        let temp_dir = TempDir::new().unwrap();
        let config = NodeConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..NodeConfig::default()
        };

        let node = VotingNode::new(config.clone()).unwrap();
        assert_eq!(node.store().admin(), config.ledger.genesis_admin);
        assert_eq!(node.store().commit_count(), 1);
        drop(node);

        // Reopening replays genesis instead of writing it again.
        let node = VotingNode::new(config).unwrap();
        assert_eq!(node.store().commit_count(), 1);
    }

    #[tokio::test]
    async fn test_restart_resubmits_pending_reveal() {
        let temp_dir = TempDir::new().unwrap();
        let config = NodeConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..NodeConfig::default()
        };
        let alice = Address::from_label("alice");

        // A previous run requested a reveal that its oracle never answered.
        let id = {
            let engine = Arc::new(MockEngine::from_seed(&config.oracle.engine_seed));
            let oracle = Arc::new(QueuedOracle::new(engine.clone(), &config.oracle.attestation_seed));
            let clock = Arc::new(ManualClock::new(SystemClock.now() - 100));
            let store = VotingStore::open(
                &config.data_dir,
                config.ledger.clone(),
                engine.clone(),
                oracle.clone(),
                clock.clone(),
            )
            .unwrap();

            store.register_user(alice).unwrap();
            let id = store
                .create_proposal(alice, "t", "d", vec!["a".into(), "b".into()], 10, 1)
                .unwrap();
            let (ct, proof) = engine.encrypt_input(1, &config.ledger.contract_address, &alice);
            store.cast_vote(alice, id, 1, &ct, &proof).unwrap();
            clock.advance(11);
            assert!(store.reveal_results(alice, id).unwrap().is_pending());
            assert_eq!(oracle.pending(), 1);
            id
        };

        let node = VotingNode::new(config).unwrap();
        let store = node.store().clone();
        tokio::time::timeout(Duration::from_secs(5), async {
            while store.decrypted_results(id).is_err() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(store.decrypted_results(id).unwrap(), vec![0, 1]);
        assert!(store.pending_reveal_requests().is_empty());
    }
}
