//! SDK error types.

use solace_core::error::{RecoveryError, SolaceError};
use solace_core::types::Address;
use thiserror::Error;

/// Errors returned by [`SolaceSdk`](crate::SolaceSdk) calls.
#[derive(Error, Debug)]
pub enum SdkError {
    /// Local failure: encoding, signing, or transport to the ledger.
    #[error(transparent)]
    Solace(#[from] SolaceError),

    /// The ledger applied the protocol rules and refused the operation.
    #[error("rejected by ledger: {0}")]
    Rejected(RecoveryError),

    /// The call needs a wallet, but none was created or loaded.
    #[error("no wallet loaded")]
    WalletNotLoaded,

    /// Name directory failure.
    #[error("name directory: {0}")]
    Directory(String),

    /// The wallet was created on the ledger but its name was not registered.
    /// The SDK keeps the wallet attached; retry the name separately.
    #[error("wallet {wallet} created but name not registered: {reason}")]
    NameNotRegistered { wallet: Address, reason: String },

    /// Faucet failure.
    #[error("faucet: {0}")]
    Faucet(String),
}

impl SdkError {
    /// The protocol error behind a rejection, if this is one.
    pub fn rejection(&self) -> Option<&RecoveryError> {
        match self {
            SdkError::Rejected(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_accessor() {
        let e = SdkError::Rejected(RecoveryError::NotAGuardian("x".into()));
        assert!(matches!(e.rejection(), Some(RecoveryError::NotAGuardian(_))));
        assert!(SdkError::WalletNotLoaded.rejection().is_none());
    }

    #[test]
    fn name_failure_carries_wallet() {
        let wallet = Address::from_bytes([1; 32]).unwrap();
        let e = SdkError::NameNotRegistered { wallet, reason: "taken".into() };
        assert!(e.to_string().contains(&wallet.encode()));
    }

    #[test]
    fn display_rejected() {
        let e = SdkError::Rejected(RecoveryError::RecoveryNotApproved);
        assert_eq!(e.to_string(), "rejected by ledger: recovery not approved");
    }
}
