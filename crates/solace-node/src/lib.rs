//! # solace-node
//!
//! Reference ledger node backed by RocksDB and served over JSON-RPC.
//!
//! - [`storage::RocksStore`]: persistent account storage backed by RocksDB
//! - [`node::Node`]: verifies and applies signed operations, implements `Ledger`
//! - [`rpc`]: JSON-RPC server for external access
//! - [`confirmations::ConfirmationLog`]: bounded record of submission outcomes
//! - [`config::NodeConfig`]: node configuration

pub mod config;
pub mod confirmations;
pub mod node;
pub mod rpc;
pub mod storage;

pub use config::NodeConfig;
pub use node::Node;
pub use rpc::start_rpc_server;
pub use storage::RocksStore;
