//! Error types for the Solace recovery protocol.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Precondition failures raised by the recovery protocol.
///
/// Every coordinator operation returns one of these synchronously when a
/// precondition is violated; none are retried or swallowed internally.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryError {
    #[error("unauthorized")] Unauthorized,
    #[error("invalid threshold: {threshold} with {guardians} guardians")] InvalidThreshold { threshold: u64, guardians: u64 },
    #[error("duplicate guardian: {0}")] DuplicateGuardian(String),
    #[error("guardian not found: {0}")] GuardianNotFound(String),
    #[error("threshold violation: {remaining} guardians left, threshold {threshold}")] ThresholdViolation { remaining: u64, threshold: u64 },
    #[error("recovery already in progress")] RecoveryAlreadyInProgress,
    #[error("recovery attempt not found: {0}")] AttemptNotFound(String),
    #[error("not a guardian: {0}")] NotAGuardian(String),
    #[error("recovery not approved")] RecoveryNotApproved,
    #[error("invalid identity: {0}")] InvalidIdentity(String),
    #[error("wallet not found: {0}")] WalletNotFound(String),
    #[error("wallet already exists: {0}")] WalletAlreadyExists(String),
    #[error("stale nonce: expected {expected}, got {got}")] StaleNonce { expected: u64, got: u64 },
    #[error("insufficient funds: have {have}, need {need}")] InsufficientFunds { have: u64, need: u64 },
    #[error("invalid amount: {0}")] InvalidAmount(u64),
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CryptoError {
    #[error("invalid public key bytes")] InvalidPublicKey,
    #[error("invalid signature bytes")] InvalidSignature,
    #[error("signature verification failed")] VerificationFailed,
}

#[derive(Error, Debug)]
pub enum SolaceError {
    #[error(transparent)] Recovery(#[from] RecoveryError),
    #[error(transparent)] Crypto(#[from] CryptoError),
    #[error("storage: {0}")] Storage(String),
    #[error("serialization: {0}")] Serialization(String),
    #[error("transport: {0}")] Transport(String),
}

impl SolaceError {
    /// The protocol error carried by this error, if any.
    pub fn as_recovery(&self) -> Option<&RecoveryError> {
        match self {
            SolaceError::Recovery(e) => Some(e),
            _ => None,
        }
    }
}
