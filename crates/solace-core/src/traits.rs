//! Trait interfaces for the collaborators around the recovery core.
//!
//! - [`Ledger`]: submits signed operations and reads account state (solace-node implements)
//! - [`NameDirectory`]: human-readable names for wallet addresses
//! - [`Faucet`]: funds identities and wallets
//!
//! The SDK consumes all three as trait objects.

use serde::{Deserialize, Serialize};

use crate::account::WalletAccount;
use crate::attempt::RecoveryAttempt;
use crate::error::{CryptoError, RecoveryError, SolaceError};
use crate::operation::{OperationOutcome, SignedOperation};
use crate::types::{Address, Hash256, Identity};

/// Opaque reference to a submitted operation, redeemable for its [`Confirmation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfirmationHandle(pub Hash256);

/// Why a submitted operation was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "error", rename_all = "snake_case")]
pub enum Rejection {
    /// A protocol precondition failed.
    Protocol(RecoveryError),
    /// The envelope signature did not verify.
    Signature(CryptoError),
    /// Storage or encoding failure on the ledger side.
    Internal(String),
}

impl From<SolaceError> for Rejection {
    fn from(e: SolaceError) -> Self {
        match e {
            SolaceError::Recovery(e) => Rejection::Protocol(e),
            SolaceError::Crypto(e) => Rejection::Signature(e),
            other => Rejection::Internal(other.to_string()),
        }
    }
}

/// Final state of a submitted operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum Confirmation {
    Applied(OperationOutcome),
    Rejected(Rejection),
}

/// The transaction-executing backend holding wallet and attempt records.
pub trait Ledger: Send + Sync {
    /// Submit a signed operation. Returns a handle even when the operation
    /// is later rejected; only transport failures error here.
    fn submit_operation(
        &self,
        operation: SignedOperation,
    ) -> Result<ConfirmationHandle, SolaceError>;

    /// Wait for the outcome of a previously submitted operation.
    fn await_confirmation(&self, handle: &ConfirmationHandle) -> Result<Confirmation, SolaceError>;

    /// Load a wallet by address. Returns `None` if unknown.
    fn fetch_wallet(&self, address: &Address) -> Result<Option<WalletAccount>, SolaceError>;

    /// Load a recovery attempt by address. Returns `None` if unknown.
    fn fetch_attempt(&self, address: &Address) -> Result<Option<RecoveryAttempt>, SolaceError>;

    /// Lamport balance of any account.
    fn fetch_balance(&self, account: &Address) -> Result<u64, SolaceError>;

    /// Wallets that list `guardian` among their guardians.
    fn wallets_guarded_by(&self, guardian: &Identity) -> Result<Vec<Address>, SolaceError>;
}

/// Maps wallet addresses to display names and back.
pub trait NameDirectory: Send + Sync {
    fn set_name(&self, name: &str, wallet: &Address) -> Result<(), SolaceError>;

    fn name_of(&self, wallet: &Address) -> Result<Option<String>, SolaceError>;

    fn address_of(&self, name: &str) -> Result<Option<Address>, SolaceError>;
}

/// Source of test funds. An identity is funded at its own account address.
pub trait Faucet: Send + Sync {
    /// Request `amount` lamports for `recipient`.
    fn request_airdrop(&self, recipient: &Address, amount: u64) -> Result<(), SolaceError>;
}
