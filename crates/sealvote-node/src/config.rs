//! Node configuration.
//!
//! Handles loading and validation of node configuration from
//! config files and command-line arguments.

use sealvote_ledger::LedgerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Node name
    pub name: String,
    /// Data directory holding the commit log
    pub data_dir: PathBuf,
    /// Ledger policies and genesis admin
    pub ledger: LedgerConfig,
    /// Decryption oracle configuration
    pub oracle: OracleConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: "sealvote-node".to_string(),
            data_dir: PathBuf::from("./data"),
            ledger: LedgerConfig::default(),
            oracle: OracleConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from file.
    /// Path is validated to prevent directory traversal attacks.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        if path.to_string_lossy().contains("..") {
            anyhow::bail!("Invalid path: directory traversal detected");
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: NodeConfig = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn to_file(&self, path: &Path) -> anyhow::Result<()> {
        if path.to_string_lossy().contains("..") {
            anyhow::bail!("Invalid path: directory traversal detected");
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .map_err(|e| anyhow::anyhow!("Failed to write config file '{}': {}", path.display(), e))?;
        Ok(())
    }

    /// Validate configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.ledger.validate().map_err(|e| anyhow::anyhow!("Invalid ledger config: {}", e))?;

        if self.oracle.engine_seed.is_empty() {
            anyhow::bail!("oracle.engine_seed cannot be empty");
        }
        if self.oracle.attestation_seed.is_empty() {
            anyhow::bail!("oracle.attestation_seed cannot be empty");
        }
        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            anyhow::bail!("logging.format must be 'json' or 'pretty'");
        }
        Ok(())
    }
}

/// Decryption oracle configuration.
///
/// Both seeds must stay fixed for the lifetime of a data directory: the
/// engine seed decrypts persisted accumulators and the attestation seed
/// signs deliveries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Seed of the encryption key shared by engine and oracle
    pub engine_seed: String,
    /// Seed of the oracle's attestation key
    pub attestation_seed: String,
    /// Artificial delay before answering a request (milliseconds)
    pub delivery_delay_ms: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            engine_seed: "sealvote-devnet".to_string(),
            attestation_seed: "sealvote-devnet-oracle".to_string(),
            delivery_delay_ms: 0,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log to file
    pub log_file: Option<PathBuf>,
    /// Log format (json|pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_file: None,
            format: "pretty".to_string(),
        }
    }
}
