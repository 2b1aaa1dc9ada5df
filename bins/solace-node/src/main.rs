//! Solace ledger node binary.
//!
//! Opens RocksDB account storage and serves the recovery protocol over
//! JSON-RPC until interrupted.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use solace_node_lib::{start_rpc_server, Node, NodeConfig};
use tracing::info;

/// Solace ledger node.
#[derive(Parser, Debug)]
#[command(
    name = "solace-node",
    version,
    about = "Solace recovery-wallet ledger with RocksDB storage and JSON-RPC server"
)]
struct Args {
    /// Optional TOML config file; SOLACE_* environment variables override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Data directory for account storage
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// RPC server bind address
    #[arg(long)]
    rpc_bind: Option<String>,

    /// RPC server port
    #[arg(long)]
    rpc_port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format ("text" or "json")
    #[arg(long)]
    log_format: Option<String>,
}

impl Args {
    /// Load the layered config and apply CLI overrides on top.
    fn into_config(self) -> Result<NodeConfig> {
        let mut config = NodeConfig::load(self.config.as_deref())
            .context("failed to load node configuration")?;
        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        if let Some(rpc_bind) = self.rpc_bind {
            config.rpc_bind = rpc_bind;
        }
        if let Some(rpc_port) = self.rpc_port {
            config.rpc_port = rpc_port;
        }
        if let Some(log_level) = self.log_level {
            config.log_level = log_level;
        }
        if let Some(log_format) = self.log_format {
            config.log_format = log_format;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Args::parse().into_config()?;
    init_logging(&config.log_level, &config.log_format);

    info!("Solace Node v{}", env!("CARGO_PKG_VERSION"));
    info!("data_dir: {:?}", config.data_dir);
    info!("rpc_addr: {}", config.rpc_addr());

    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("failed to create data_dir {:?}", config.data_dir))?;

    let node = Node::open(config.clone()).context("failed to open account storage")?;
    let rpc_handle = start_rpc_server(&config.rpc_addr(), node)
        .await
        .context("failed to start RPC server")?;
    info!("RPC server listening on {}", config.rpc_addr());
    info!("Solace node running (Ctrl+C to stop)");

    tokio::signal::ctrl_c()
        .await
        .context("failed to install Ctrl+C handler")?;
    info!("received Ctrl+C, shutting down...");

    rpc_handle.stop().ok();
    rpc_handle.stopped().await;
    info!("Solace node shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Pass `format = "json"` for structured JSON output. Any other value
/// defaults to human-readable text.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}
