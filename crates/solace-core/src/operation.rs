//! Typed protocol operations and their signed envelope.
//!
//! Every state change the protocol supports is one [`Operation`] variant
//! carrying exactly the fields it needs. Operations are validated
//! structurally before dispatch and signed by the identity they name as
//! the acting party.
//!
//! A signature must not be reusable once the state it was made against has
//! moved on. Owner operations carry the wallet's nonce; recovery operations
//! name an attempt address, which is bound to the wallet's recovery sequence.

use serde::{Deserialize, Serialize};

use crate::attempt::RecoveryStatus;
use crate::crypto::{self, KeyPair};
use crate::error::{RecoveryError, SolaceError};
use crate::types::{Address, Hash256, Identity};

/// A state-changing protocol operation.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub enum Operation {
    /// Create a wallet owned by `owner` at the address derived from `base`.
    CreateWallet { owner: Identity, base: Identity },
    AddGuardians {
        wallet: Address,
        requested_by: Identity,
        guardians: Vec<Identity>,
        threshold: u64,
        nonce: u64,
    },
    RemoveGuardians {
        wallet: Address,
        requested_by: Identity,
        guardians: Vec<Identity>,
        nonce: u64,
    },
    SetThreshold {
        wallet: Address,
        requested_by: Identity,
        threshold: u64,
        nonce: u64,
    },
    /// Move lamports out of the wallet. Owner only, outside recovery.
    SendFunds {
        wallet: Address,
        requested_by: Identity,
        to: Address,
        lamports: u64,
        nonce: u64,
    },
    InitiateRecovery {
        wallet: Address,
        proposer: Identity,
        proposed_owner: Identity,
    },
    ApproveRecovery { attempt: Address, approver: Identity },
    FinalizeRecovery { attempt: Address },
    CancelRecovery { attempt: Address, requested_by: Identity },
}

impl Operation {
    /// Short name used in logs and RPC responses.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::CreateWallet { .. } => "create_wallet",
            Operation::AddGuardians { .. } => "add_guardians",
            Operation::RemoveGuardians { .. } => "remove_guardians",
            Operation::SetThreshold { .. } => "set_threshold",
            Operation::SendFunds { .. } => "send_funds",
            Operation::InitiateRecovery { .. } => "initiate_recovery",
            Operation::ApproveRecovery { .. } => "approve_recovery",
            Operation::FinalizeRecovery { .. } => "finalize_recovery",
            Operation::CancelRecovery { .. } => "cancel_recovery",
        }
    }

    /// The identity that must sign this operation, if any.
    ///
    /// Finalizing an approved attempt needs no particular signer: the
    /// guardian quorum already authorized it.
    pub fn required_signer(&self) -> Option<&Identity> {
        match self {
            Operation::CreateWallet { owner, .. } => Some(owner),
            Operation::AddGuardians { requested_by, .. }
            | Operation::RemoveGuardians { requested_by, .. }
            | Operation::SetThreshold { requested_by, .. }
            | Operation::SendFunds { requested_by, .. }
            | Operation::CancelRecovery { requested_by, .. } => Some(requested_by),
            Operation::InitiateRecovery { proposer, .. } => Some(proposer),
            Operation::ApproveRecovery { approver, .. } => Some(approver),
            Operation::FinalizeRecovery { .. } => None,
        }
    }

    /// Structural checks that need no account state.
    ///
    /// An `AddGuardians` with an empty list is allowed: it only changes the
    /// threshold.
    pub fn validate(&self) -> Result<(), RecoveryError> {
        match self {
            Operation::RemoveGuardians { guardians, .. } if guardians.is_empty() => Err(
                RecoveryError::GuardianNotFound("empty guardian list".to_string()),
            ),
            Operation::SetThreshold { threshold: 0, .. } => {
                Err(RecoveryError::InvalidThreshold { threshold: 0, guardians: 0 })
            }
            Operation::SendFunds { lamports: 0, .. } => Err(RecoveryError::InvalidAmount(0)),
            _ => Ok(()),
        }
    }

    /// Canonical bytes covered by the signature.
    pub fn signing_bytes(&self) -> Result<Vec<u8>, SolaceError> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| SolaceError::Serialization(e.to_string()))
    }
}

/// An operation plus the ed25519 signature of whoever submitted it.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct SignedOperation {
    pub operation: Operation,
    pub signer: Identity,
    /// Ed25519 signature (64 bytes) over [`Operation::signing_bytes`].
    pub signature: Vec<u8>,
}

impl SignedOperation {
    pub fn sign(operation: Operation, keypair: &KeyPair) -> Result<Self, SolaceError> {
        let signature = keypair.sign(&operation.signing_bytes()?).to_vec();
        Ok(Self {
            operation,
            signer: keypair.identity(),
            signature,
        })
    }

    /// Check the signature and that the signer is the operation's acting party.
    ///
    /// # Errors
    ///
    /// - [`RecoveryError::Unauthorized`] if the signer is not the required signer
    /// - a [`CryptoError`](crate::error::CryptoError) if the signature is invalid
    pub fn verify(&self) -> Result<(), SolaceError> {
        if let Some(required) = self.operation.required_signer() {
            if *required != self.signer {
                return Err(RecoveryError::Unauthorized.into());
            }
        }
        crypto::verify(&self.signer, &self.operation.signing_bytes()?, &self.signature)?;
        Ok(())
    }

    /// Encode for transport (bincode, standard config).
    pub fn to_bytes(&self) -> Result<Vec<u8>, SolaceError> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| SolaceError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SolaceError> {
        let (op, _): (Self, usize) = bincode::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| SolaceError::Serialization(e.to_string()))?;
        Ok(op)
    }

    /// Content hash identifying this submission.
    pub fn hash(&self) -> Result<Hash256, SolaceError> {
        Ok(Hash256(blake3::hash(&self.to_bytes()?).into()))
    }
}

/// Typed result of an applied operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationOutcome {
    WalletCreated { wallet: Address },
    GuardiansUpdated { wallet: Address, guardians: u64, threshold: u64 },
    RecoveryInitiated { wallet: Address, attempt: Address, sequence: u64 },
    RecoveryApproved { attempt: Address, approvals: u64, status: RecoveryStatus },
    RecoveryFinalized { wallet: Address, new_owner: Identity, sequence: u64 },
    RecoveryCancelled { wallet: Address, attempt: Address, sequence: u64 },
    FundsSent { wallet: Address, to: Address, lamports: u64, balance: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(seed: u8) -> Identity {
        Identity::from_bytes([seed; 32]).unwrap()
    }

    fn addr(seed: u8) -> Address {
        Address::from_bytes([seed; 32]).unwrap()
    }

    #[test]
    fn finalize_has_no_required_signer() {
        let op = Operation::FinalizeRecovery { attempt: addr(1) };
        assert!(op.required_signer().is_none());
    }

    #[test]
    fn approve_requires_approver() {
        let op = Operation::ApproveRecovery { attempt: addr(1), approver: id(2) };
        assert_eq!(op.required_signer(), Some(&id(2)));
    }

    #[test]
    fn validate_allows_threshold_only_add() {
        let add = Operation::AddGuardians {
            wallet: addr(1),
            requested_by: id(1),
            guardians: vec![],
            threshold: 1,
            nonce: 0,
        };
        assert!(add.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_removal() {
        let remove = Operation::RemoveGuardians {
            wallet: addr(1),
            requested_by: id(1),
            guardians: vec![],
            nonce: 0,
        };
        assert!(matches!(remove.validate(), Err(RecoveryError::GuardianNotFound(_))));
    }

    #[test]
    fn signed_operation_verifies() {
        let kp = KeyPair::generate();
        let op = Operation::ApproveRecovery { attempt: addr(1), approver: kp.identity() };
        let signed = SignedOperation::sign(op, &kp).unwrap();
        assert!(signed.verify().is_ok());
    }

    #[test]
    fn signed_by_wrong_party_is_unauthorized() {
        let kp = KeyPair::generate();
        let op = Operation::ApproveRecovery { attempt: addr(1), approver: id(9) };
        let signed = SignedOperation::sign(op, &kp).unwrap();
        assert!(matches!(
            signed.verify(),
            Err(SolaceError::Recovery(RecoveryError::Unauthorized))
        ));
    }

    #[test]
    fn tampered_operation_fails_verification() {
        let kp = KeyPair::generate();
        let op = Operation::CancelRecovery {
            attempt: addr(1),
            requested_by: kp.identity(),
        };
        let mut signed = SignedOperation::sign(op, &kp).unwrap();
        signed.operation = Operation::CancelRecovery {
            attempt: addr(2),
            requested_by: kp.identity(),
        };
        assert!(matches!(signed.verify(), Err(SolaceError::Crypto(_))));
    }

    #[test]
    fn nonce_is_covered_by_signature() {
        let kp = KeyPair::generate();
        let op = Operation::SetThreshold {
            wallet: addr(1),
            requested_by: kp.identity(),
            threshold: 1,
            nonce: 0,
        };
        let mut signed = SignedOperation::sign(op, &kp).unwrap();
        if let Operation::SetThreshold { nonce, .. } = &mut signed.operation {
            *nonce = 5;
        }
        assert!(matches!(signed.verify(), Err(SolaceError::Crypto(_))));
    }

    #[test]
    fn finalize_accepts_any_signer() {
        let kp = KeyPair::generate();
        let signed =
            SignedOperation::sign(Operation::FinalizeRecovery { attempt: addr(1) }, &kp).unwrap();
        assert!(signed.verify().is_ok());
    }

    #[test]
    fn bytes_roundtrip() {
        let kp = KeyPair::generate();
        let signed =
            SignedOperation::sign(Operation::FinalizeRecovery { attempt: addr(1) }, &kp).unwrap();
        let decoded = SignedOperation::from_bytes(&signed.to_bytes().unwrap()).unwrap();
        assert_eq!(signed, decoded);
    }

    #[test]
    fn zero_guardian_key_fails_to_decode() {
        let owner = KeyPair::generate();
        let op = Operation::AddGuardians {
            wallet: addr(1),
            requested_by: owner.identity(),
            guardians: vec![id(0x11)],
            threshold: 1,
            nonce: 0,
        };
        let mut bytes = SignedOperation::sign(op, &owner).unwrap().to_bytes().unwrap();
        let start = bytes.windows(32).position(|w| w == [0x11; 32]).unwrap();
        bytes[start..start + 32].fill(0);

        assert!(matches!(
            SignedOperation::from_bytes(&bytes),
            Err(SolaceError::Serialization(_))
        ));
    }

    #[test]
    fn validate_rejects_empty_transfer() {
        let op = Operation::SendFunds {
            wallet: addr(1),
            requested_by: id(1),
            to: addr(2),
            lamports: 0,
            nonce: 0,
        };
        assert_eq!(op.validate(), Err(RecoveryError::InvalidAmount(0)));
    }

    #[test]
    fn outcome_serializes_with_kind_tag() {
        let outcome = OperationOutcome::WalletCreated { wallet: addr(1) };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"kind\":\"wallet_created\""));
    }
}
