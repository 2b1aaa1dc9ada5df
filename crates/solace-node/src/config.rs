//! Node configuration for the Solace ledger node.
//!
//! Provides [`NodeConfig`] with defaults for the data directory, RPC binding,
//! and logging. [`NodeConfig::load`] layers an optional TOML file and
//! `SOLACE_*` environment variables over those defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use solace_core::constants::DEFAULT_RPC_PORT;

use crate::confirmations::DEFAULT_MAX_CONFIRMATIONS;

/// Configuration for a node instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Root directory for all persistent data.
    pub data_dir: PathBuf,
    /// IP address for the JSON-RPC server to bind to.
    pub rpc_bind: String,
    /// Port for the JSON-RPC server.
    pub rpc_port: u16,
    /// Log level filter string (e.g. "info", "debug", "solace_core=trace").
    pub log_level: String,
    /// Log output format: "text" or "json".
    pub log_format: String,
    /// How many submission outcomes the node keeps for lookup.
    pub max_confirmations: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("solace");

        Self {
            data_dir,
            rpc_bind: "127.0.0.1".to_string(),
            rpc_port: DEFAULT_RPC_PORT,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            max_confirmations: DEFAULT_MAX_CONFIRMATIONS,
        }
    }
}

impl NodeConfig {
    /// Load configuration from `path` (if given and present) and the
    /// environment. Environment variables win over the file, e.g.
    /// `SOLACE_RPC_PORT=9000`.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder
            .add_source(config::Environment::with_prefix("SOLACE").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Path to the RocksDB account data directory.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("accounts")
    }

    /// Socket address string for the RPC server.
    pub fn rpc_addr(&self) -> String {
        format!("{}:{}", self.rpc_bind, self.rpc_port)
    }
}
