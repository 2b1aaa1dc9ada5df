//! Shared test helpers for scenario and adversarial tests.

use solace_core::crypto::KeyPair;
use solace_core::derive::wallet_address;
use solace_core::error::RecoveryError;
use solace_core::operation::{Operation, OperationOutcome, SignedOperation};
use solace_core::traits::{Confirmation, Ledger, Rejection};
use solace_core::types::{Address, Identity};
use solace_node_lib::Node;

/// Deterministic keypair from a seed byte.
pub fn keypair(seed: u8) -> KeyPair {
    KeyPair::from_secret_bytes([seed; 32])
}

/// Identity with raw bytes `[seed; 32]`. Not backed by a keypair, so only
/// usable with the coordinator directly. `seed` must be non-zero.
pub fn id(seed: u8) -> Identity {
    Identity::from_bytes([seed; 32]).unwrap()
}

/// Sign and submit one operation, returning its confirmation.
pub fn submit(node: &Node, op: Operation, signer: &KeyPair) -> Confirmation {
    submit_signed(node, SignedOperation::sign(op, signer).unwrap())
}

/// Submit an already signed operation, returning its confirmation.
pub fn submit_signed(node: &Node, signed: SignedOperation) -> Confirmation {
    let handle = node.submit_operation(signed).unwrap();
    node.await_confirmation(&handle).unwrap()
}

/// Submit and require the operation to be applied.
pub fn apply(node: &Node, op: Operation, signer: &KeyPair) -> OperationOutcome {
    let name = op.name();
    match submit(node, op, signer) {
        Confirmation::Applied(outcome) => outcome,
        Confirmation::Rejected(r) => panic!("{name} rejected: {r:?}"),
    }
}

/// Submit and require a protocol rejection, returning its kind.
pub fn reject(node: &Node, op: Operation, signer: &KeyPair) -> RecoveryError {
    let name = op.name();
    match submit(node, op, signer) {
        Confirmation::Rejected(Rejection::Protocol(e)) => e,
        other => panic!("{name}: expected protocol rejection, got {other:?}"),
    }
}

/// Create a wallet for `owner` (seeded by its own identity) and register
/// `guardians` with `threshold`. With guardians the wallet nonce ends at 1.
pub fn wallet_with_guardians(
    node: &Node,
    owner: &KeyPair,
    guardians: &[&KeyPair],
    threshold: u64,
) -> Address {
    apply(
        node,
        Operation::CreateWallet {
            owner: owner.identity(),
            base: owner.identity(),
        },
        owner,
    );
    let wallet = wallet_address(&owner.identity());
    if !guardians.is_empty() {
        apply(
            node,
            Operation::AddGuardians {
                wallet,
                requested_by: owner.identity(),
                guardians: guardians.iter().map(|g| g.identity()).collect(),
                threshold,
                nonce: 0,
            },
            owner,
        );
    }
    wallet
}

/// Open a recovery of `wallet` proposing `proposer` as the new owner.
/// Returns the attempt address.
pub fn initiate(node: &Node, wallet: Address, proposer: &KeyPair) -> Address {
    let outcome = apply(
        node,
        Operation::InitiateRecovery {
            wallet,
            proposer: proposer.identity(),
            proposed_owner: proposer.identity(),
        },
        proposer,
    );
    match outcome {
        OperationOutcome::RecoveryInitiated { attempt, .. } => attempt,
        other => panic!("unexpected outcome: {other:?}"),
    }
}

/// Approve `attempt` as `guardian`.
pub fn approve(node: &Node, attempt: Address, guardian: &KeyPair) -> OperationOutcome {
    apply(
        node,
        Operation::ApproveRecovery {
            attempt,
            approver: guardian.identity(),
        },
        guardian,
    )
}
