//! JSON-RPC server for the Solace node.
//!
//! Uses jsonrpsee 0.24 to expose operation submission, confirmation lookup,
//! and read access to wallet, recovery-attempt, and balance records.

use std::sync::Arc;

use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObjectOwned;
use serde::{Deserialize, Serialize};

use solace_core::account::WalletAccount;
use solace_core::attempt::{RecoveryAttempt, RecoveryStatus};
use solace_core::derive::recovery_address;
use solace_core::error::SolaceError;
use solace_core::operation::SignedOperation;
use solace_core::traits::{Confirmation, ConfirmationHandle};
use solace_core::types::{Address, Hash256, Identity};

use crate::node::Node;

/// JSON representation of a wallet account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletJson {
    pub address: String,
    pub owner: String,
    /// Guardian identities, base58.
    pub guardians: Vec<String>,
    pub threshold: u64,
    pub recovery_mode: bool,
    pub recovery_sequence: u64,
    /// Nonce the next owner-signed operation must carry.
    pub nonce: u64,
}

impl From<&WalletAccount> for WalletJson {
    fn from(w: &WalletAccount) -> Self {
        Self {
            address: w.address().encode(),
            owner: w.owner().encode(),
            guardians: w.guardians().guardians().iter().map(|g| g.encode()).collect(),
            threshold: w.guardians().threshold(),
            recovery_mode: w.recovery_mode(),
            recovery_sequence: w.recovery_sequence(),
            nonce: w.nonce(),
        }
    }
}

/// JSON representation of a recovery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptJson {
    pub address: String,
    pub wallet: String,
    pub sequence: u64,
    pub proposer: String,
    pub proposed_owner: String,
    pub approvals: Vec<String>,
    pub status: RecoveryStatus,
}

impl From<&RecoveryAttempt> for AttemptJson {
    fn from(a: &RecoveryAttempt) -> Self {
        Self {
            address: a.address().encode(),
            wallet: a.wallet().encode(),
            sequence: a.sequence(),
            proposer: a.proposer().encode(),
            proposed_owner: a.proposed_owner().encode(),
            approvals: a.approvals().iter().map(|g| g.encode()).collect(),
            status: a.status(),
        }
    }
}

/// Parse a 64-character hex string into a Hash256.
pub fn parse_hash(hex_str: &str) -> Result<Hash256, ErrorObjectOwned> {
    if hex_str.len() != 64 {
        return Err(rpc_error(-1, "hash must be 64 hex characters"));
    }
    let bytes = hex::decode(hex_str).map_err(|_| rpc_error(-1, "invalid hex in hash"))?;
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| rpc_error(-1, "hash must be 32 bytes"))?;
    Ok(Hash256(arr))
}

/// Parse a base58 account address.
pub fn parse_address(s: &str) -> Result<Address, ErrorObjectOwned> {
    s.parse::<Address>()
        .map_err(|e| rpc_error(-5, &format!("invalid address: {e}")))
}

/// Parse a base58 participant identity.
pub fn parse_identity(s: &str) -> Result<Identity, ErrorObjectOwned> {
    s.parse::<Identity>()
        .map_err(|e| rpc_error(-5, &format!("invalid identity: {e}")))
}

/// Create a JSON-RPC error.
fn rpc_error(code: i32, msg: &str) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(code, msg.to_string(), None::<()>)
}

fn internal(e: SolaceError) -> ErrorObjectOwned {
    rpc_error(-1, &e.to_string())
}

/// The Solace JSON-RPC interface.
#[rpc(server)]
pub trait SolaceRpc {
    /// Submits a signed operation (hex-encoded bincode). Returns the
    /// confirmation handle as hex.
    #[method(name = "submitoperation")]
    async fn submit_operation(&self, hex_data: String) -> Result<String, ErrorObjectOwned>;

    /// Returns the confirmation for a handle returned by `submitoperation`.
    #[method(name = "getconfirmation")]
    async fn get_confirmation(&self, handle: String) -> Result<Confirmation, ErrorObjectOwned>;

    /// Returns a wallet account by address.
    #[method(name = "getwallet")]
    async fn get_wallet(&self, address: String) -> Result<WalletJson, ErrorObjectOwned>;

    /// Returns a recovery attempt by its derived address.
    #[method(name = "getattempt")]
    async fn get_attempt(&self, address: String) -> Result<AttemptJson, ErrorObjectOwned>;

    /// Returns the open attempt for a wallet, or null when not in recovery.
    #[method(name = "getactiveattempt")]
    async fn get_active_attempt(
        &self,
        wallet: String,
    ) -> Result<Option<AttemptJson>, ErrorObjectOwned>;

    /// Derives the attempt address for a wallet and sequence.
    #[method(name = "getrecoveryaddress")]
    async fn get_recovery_address(
        &self,
        wallet: String,
        sequence: u64,
    ) -> Result<String, ErrorObjectOwned>;

    /// Returns whether the wallet has an open recovery attempt.
    #[method(name = "isinrecovery")]
    async fn is_in_recovery(&self, wallet: String) -> Result<bool, ErrorObjectOwned>;

    /// Returns the lamport balance of any account.
    #[method(name = "getbalance")]
    async fn get_balance(&self, address: String) -> Result<u64, ErrorObjectOwned>;

    /// Returns the addresses of the wallets an identity guards.
    #[method(name = "getguardedwallets")]
    async fn get_guarded_wallets(
        &self,
        guardian: String,
    ) -> Result<Vec<String>, ErrorObjectOwned>;
}

/// RPC server implementation backed by a [`Node`].
pub struct RpcServerImpl {
    node: Arc<Node>,
}

impl RpcServerImpl {
    pub fn new(node: Arc<Node>) -> Self {
        Self { node }
    }
}

#[async_trait]
impl SolaceRpcServer for RpcServerImpl {
    async fn submit_operation(&self, hex_data: String) -> Result<String, ErrorObjectOwned> {
        let raw = hex::decode(&hex_data).map_err(|_| rpc_error(-22, "invalid hex encoding"))?;
        let signed = SignedOperation::from_bytes(&raw)
            .map_err(|e| rpc_error(-22, &format!("decode error: {e}")))?;
        let handle = self.node.submit(signed).map_err(internal)?;
        Ok(hex::encode(handle.0.as_bytes()))
    }

    async fn get_confirmation(&self, handle: String) -> Result<Confirmation, ErrorObjectOwned> {
        let hash = parse_hash(&handle)?;
        self.node
            .confirmation(&ConfirmationHandle(hash))
            .ok_or_else(|| rpc_error(-5, "confirmation not found"))
    }

    async fn get_wallet(&self, address: String) -> Result<WalletJson, ErrorObjectOwned> {
        let address = parse_address(&address)?;
        let wallet = self
            .node
            .get_wallet(&address)
            .map_err(internal)?
            .ok_or_else(|| rpc_error(-5, "wallet not found"))?;
        Ok(WalletJson::from(&wallet))
    }

    async fn get_attempt(&self, address: String) -> Result<AttemptJson, ErrorObjectOwned> {
        let address = parse_address(&address)?;
        let attempt = self
            .node
            .get_attempt(&address)
            .map_err(internal)?
            .ok_or_else(|| rpc_error(-5, "recovery attempt not found"))?;
        Ok(AttemptJson::from(&attempt))
    }

    async fn get_active_attempt(
        &self,
        wallet: String,
    ) -> Result<Option<AttemptJson>, ErrorObjectOwned> {
        let wallet = parse_address(&wallet)?;
        let attempt = self.node.active_attempt(&wallet).map_err(internal)?;
        Ok(attempt.as_ref().map(AttemptJson::from))
    }

    async fn get_recovery_address(
        &self,
        wallet: String,
        sequence: u64,
    ) -> Result<String, ErrorObjectOwned> {
        let wallet = parse_address(&wallet)?;
        Ok(recovery_address(&wallet, sequence).encode())
    }

    async fn is_in_recovery(&self, wallet: String) -> Result<bool, ErrorObjectOwned> {
        let wallet = parse_address(&wallet)?;
        self.node.is_in_recovery(&wallet).map_err(internal)
    }

    async fn get_balance(&self, address: String) -> Result<u64, ErrorObjectOwned> {
        let address = parse_address(&address)?;
        self.node.balance(&address).map_err(internal)
    }

    async fn get_guarded_wallets(
        &self,
        guardian: String,
    ) -> Result<Vec<String>, ErrorObjectOwned> {
        let guardian = parse_identity(&guardian)?;
        let wallets = self.node.guarded_wallets(&guardian).map_err(internal)?;
        Ok(wallets.iter().map(|w| w.encode()).collect())
    }
}

/// Start the JSON-RPC server on the given address.
///
/// Returns a handle that can be used to stop the server.
pub async fn start_rpc_server(addr: &str, node: Arc<Node>) -> Result<ServerHandle, SolaceError> {
    let server = Server::builder()
        .build(addr)
        .await
        .map_err(|e| SolaceError::Transport(format!("RPC server error: {e}")))?;

    let rpc_impl = RpcServerImpl::new(node);
    let handle = server.start(rpc_impl.into_rpc());

    Ok(handle)
}
