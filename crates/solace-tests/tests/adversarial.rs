//! Adversarial property-based tests for the recovery protocol.
//!
//! These tests attempt to break protocol invariants under randomized inputs,
//! driving the coordinator directly over an in-memory store.
//!
//! Attack vectors tested:
//! - Attempt address collisions across wallets and sequences
//! - Opening a second attempt while one is live
//! - Replayed and duplicated guardian approvals
//! - Finalizing below quorum
//! - Replaying finalize and cancel after the cycle has closed
//! - Replaying captured owner operations after newer ones applied

use std::collections::BTreeSet;

use proptest::prelude::*;
use solace_core::attempt::RecoveryStatus;
use solace_core::coordinator::RecoveryCoordinator;
use solace_core::derive::recovery_address;
use solace_core::error::{RecoveryError, SolaceError};
use solace_core::operation::{Operation, SignedOperation};
use solace_core::store::MemoryStore;
use solace_core::traits::{Confirmation, Ledger, Rejection};
use solace_core::types::{Address, Identity};
use solace_node_lib::Node;
use solace_tests::helpers::{apply, id, keypair, submit_signed, wallet_with_guardians};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const OWNER: u8 = 0xEE;

fn recovery_err<T: std::fmt::Debug>(r: Result<T, SolaceError>) -> RecoveryError {
    match r.unwrap_err() {
        SolaceError::Recovery(e) => e,
        other => panic!("expected recovery error, got {other:?}"),
    }
}

/// Guardians are seeds 1..=n.
fn guardians(n: u8) -> Vec<Identity> {
    (1..=n).map(id).collect()
}

fn setup(n: u8, threshold: u64) -> (RecoveryCoordinator<MemoryStore>, Address) {
    let mut c = RecoveryCoordinator::new(MemoryStore::new());
    let wallet = c.create_wallet(id(OWNER), id(0xEF)).unwrap();
    c.add_guardians(&wallet, &id(OWNER), &guardians(n), threshold, 0).unwrap();
    (c, wallet)
}

/// Guardian count and a threshold valid for it.
fn registry_shape() -> impl Strategy<Value = (u8, u64)> {
    (1u8..=8).prop_flat_map(|n| (Just(n), 1u64..=n as u64))
}

// ---------------------------------------------------------------------------
// Address derivation
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn distinct_sequences_never_collide(
        wallet in prop::array::uniform32(1u8..=255),
        s1 in any::<u64>(),
        s2 in any::<u64>(),
    ) {
        prop_assume!(s1 != s2);
        let w = Address::from_bytes(wallet).unwrap();
        prop_assert_ne!(recovery_address(&w, s1), recovery_address(&w, s2));
    }

    #[test]
    fn distinct_wallets_never_collide(
        w1 in prop::array::uniform32(1u8..=255),
        w2 in prop::array::uniform32(1u8..=255),
        seq in any::<u64>(),
    ) {
        prop_assume!(w1 != w2);
        let a = Address::from_bytes(w1).unwrap();
        let b = Address::from_bytes(w2).unwrap();
        prop_assert_ne!(recovery_address(&a, seq), recovery_address(&b, seq));
    }
}

// ---------------------------------------------------------------------------
// Approvals and quorum
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Status is Approved exactly when the distinct approval count has
    /// reached the threshold, whatever order and repetition guardians use.
    #[test]
    fn quorum_tracks_distinct_approvals(
        (n, threshold) in registry_shape(),
        picks in prop::collection::vec(0usize..8, 1..24),
    ) {
        let (mut c, wallet) = setup(n, threshold);
        let attempt = c.initiate_recovery(&wallet, &id(0xB0), &id(0xB0)).unwrap();
        let gs = guardians(n);
        let mut seen = BTreeSet::new();

        for pick in picks {
            let g = gs[pick % gs.len()];
            seen.insert(g);
            let record = c.approve_recovery(attempt.address(), &g).unwrap();
            prop_assert_eq!(record.approvals().len(), seen.len());
            let expected = if seen.len() as u64 >= threshold {
                RecoveryStatus::Approved
            } else {
                RecoveryStatus::Pending
            };
            prop_assert_eq!(record.status(), expected);
        }
    }

    #[test]
    fn repeated_approval_changes_nothing(
        (n, threshold) in registry_shape(),
        guardian in 0usize..8,
        repeats in 1usize..6,
    ) {
        let (mut c, wallet) = setup(n, threshold);
        let attempt = c.initiate_recovery(&wallet, &id(0xB0), &id(0xB0)).unwrap();
        let g = guardians(n)[guardian % n as usize];

        let first = c.approve_recovery(attempt.address(), &g).unwrap();
        for _ in 0..repeats {
            let again = c.approve_recovery(attempt.address(), &g).unwrap();
            prop_assert_eq!(&again, &first);
        }
    }

    #[test]
    fn outsiders_never_count(
        (n, threshold) in registry_shape(),
        outsider in 0x40u8..0x80,
    ) {
        let (mut c, wallet) = setup(n, threshold);
        let attempt = c.initiate_recovery(&wallet, &id(0xB0), &id(0xB0)).unwrap();
        let err = recovery_err(c.approve_recovery(attempt.address(), &id(outsider)));
        prop_assert!(matches!(err, RecoveryError::NotAGuardian(_)));
        let record = c.attempt(attempt.address()).unwrap().unwrap();
        prop_assert!(record.approvals().is_empty());
    }
}

// ---------------------------------------------------------------------------
// Finalize fail-closed
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn finalize_below_quorum_fails_and_preserves_wallet(
        (n, threshold) in registry_shape(),
        approvals in 0u64..8,
    ) {
        let (mut c, wallet) = setup(n, threshold);
        let attempt = c.initiate_recovery(&wallet, &id(0xB0), &id(0xB0)).unwrap();
        let below = approvals.min(threshold - 1);
        for g in guardians(n).iter().take(below as usize) {
            c.approve_recovery(attempt.address(), g).unwrap();
        }

        let before = c.wallet(&wallet).unwrap();
        let err = recovery_err(c.finalize_recovery(attempt.address()));
        prop_assert_eq!(err, RecoveryError::RecoveryNotApproved);
        prop_assert_eq!(c.wallet(&wallet).unwrap(), before);
    }

    #[test]
    fn finalize_replay_fails_closed(
        (n, threshold) in registry_shape(),
    ) {
        let (mut c, wallet) = setup(n, threshold);
        let attempt = c.initiate_recovery(&wallet, &id(0xB0), &id(0xB0)).unwrap();
        for g in guardians(n).iter().take(threshold as usize) {
            c.approve_recovery(attempt.address(), g).unwrap();
        }
        let after = c.finalize_recovery(attempt.address()).unwrap();
        prop_assert_eq!(after.recovery_sequence(), 1);

        let err = recovery_err(c.finalize_recovery(attempt.address()));
        prop_assert!(matches!(err, RecoveryError::AttemptNotFound(_)));
        let err = recovery_err(c.cancel_recovery(attempt.address(), &id(0xB0)));
        prop_assert!(matches!(err, RecoveryError::AttemptNotFound(_)));
        prop_assert_eq!(c.wallet(&wallet).unwrap().unwrap().recovery_sequence(), 1);
    }
}

// ---------------------------------------------------------------------------
// Single live attempt under random operation sequences
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Action {
    Initiate(u8),
    Approve(usize),
    Finalize,
    Cancel,
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0xB0u8..0xB4).prop_map(Action::Initiate),
        (0usize..8).prop_map(Action::Approve),
        Just(Action::Finalize),
        Just(Action::Cancel),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Whatever happens, `recovery_mode` is true exactly when the attempt at
    /// the current sequence is live, no earlier attempt is live, and the
    /// sequence only ever grows by one per closed cycle.
    #[test]
    fn at_most_one_live_attempt(
        (n, threshold) in registry_shape(),
        actions in prop::collection::vec(action(), 1..40),
    ) {
        let (mut c, wallet) = setup(n, threshold);
        let gs = guardians(n);
        let mut closed_cycles = 0u64;

        for act in actions {
            let account = c.wallet(&wallet).unwrap().unwrap();
            let current = recovery_address(&wallet, account.recovery_sequence());
            // Actions target the current attempt address; owner seeds may
            // have rotated, so cancel uses whoever owns the wallet now.
            let result = match act {
                Action::Initiate(p) => c.initiate_recovery(&wallet, &id(p), &id(p)).map(|_| ()),
                Action::Approve(i) => c.approve_recovery(&current, &gs[i % gs.len()]).map(|_| ()),
                Action::Finalize => c.finalize_recovery(&current).map(|_| ()),
                Action::Cancel => c.cancel_recovery(&current, account.owner()).map(|_| ()),
            };
            if result.is_ok() && matches!(act, Action::Finalize | Action::Cancel) {
                closed_cycles += 1;
            }

            let account = c.wallet(&wallet).unwrap().unwrap();
            prop_assert_eq!(account.recovery_sequence(), closed_cycles);

            let live = |addr: &Address| {
                c.attempt(addr)
                    .unwrap()
                    .is_some_and(|a| a.status() != RecoveryStatus::Cancelled)
            };
            let now = recovery_address(&wallet, account.recovery_sequence());
            prop_assert_eq!(account.recovery_mode(), live(&now));
            for earlier in 0..account.recovery_sequence() {
                prop_assert!(!live(&recovery_address(&wallet, earlier)));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Owner operation replay
// ---------------------------------------------------------------------------

fn stale(expected: u64, got: u64) -> Confirmation {
    Confirmation::Rejected(Rejection::Protocol(RecoveryError::StaleNonce { expected, got }))
}

/// A removed guardian cannot be restored by resubmitting the owner's earlier
/// signed addition.
#[test]
fn replayed_add_cannot_restore_removed_guardian() {
    let node = Node::in_memory();
    let (owner, g1, mallory) = (keypair(0x01), keypair(0x11), keypair(0x66));
    let wallet = wallet_with_guardians(&node, &owner, &[&g1], 1);

    let add = Operation::AddGuardians {
        wallet,
        requested_by: owner.identity(),
        guardians: vec![mallory.identity()],
        threshold: 1,
        nonce: 1,
    };
    let signed = SignedOperation::sign(add, &owner).unwrap();
    let captured = signed.to_bytes().unwrap();
    assert!(matches!(submit_signed(&node, signed), Confirmation::Applied(_)));

    let remove = Operation::RemoveGuardians {
        wallet,
        requested_by: owner.identity(),
        guardians: vec![mallory.identity()],
        nonce: 2,
    };
    apply(&node, remove, &owner);

    let replay = SignedOperation::from_bytes(&captured).unwrap();
    assert!(replay.verify().is_ok());
    assert_eq!(submit_signed(&node, replay), stale(3, 1));

    let account = node.fetch_wallet(&wallet).unwrap().unwrap();
    assert!(!account.guardians().contains(&mallory.identity()));
    assert_eq!(account.nonce(), 3);
}

/// Resubmitting an old threshold change cannot lower the current threshold.
#[test]
fn replayed_threshold_change_cannot_lower_quorum() {
    let node = Node::in_memory();
    let owner = keypair(0x01);
    let (g1, g2, g3) = (keypair(0x11), keypair(0x12), keypair(0x13));
    let wallet = wallet_with_guardians(&node, &owner, &[&g1, &g2, &g3], 2);

    let set = |threshold, nonce| {
        let op = Operation::SetThreshold {
            wallet,
            requested_by: owner.identity(),
            threshold,
            nonce,
        };
        SignedOperation::sign(op, &owner).unwrap()
    };
    let lower = set(1, 1);
    assert!(matches!(submit_signed(&node, lower.clone()), Confirmation::Applied(_)));
    assert!(matches!(submit_signed(&node, set(3, 2)), Confirmation::Applied(_)));

    assert_eq!(submit_signed(&node, lower), stale(3, 1));
    let account = node.fetch_wallet(&wallet).unwrap().unwrap();
    assert_eq!(account.guardians().threshold(), 3);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// After any run of threshold changes, replaying any of them is refused
    /// and leaves the wallet untouched.
    #[test]
    fn replayed_owner_operations_are_stale(
        (n, threshold) in registry_shape(),
        changes in prop::collection::vec(1u64..=8, 1..8),
        pick in any::<prop::sample::Index>(),
    ) {
        let (mut c, wallet) = setup(n, threshold);
        let mut applied = Vec::new();
        for t in changes {
            let account = c.wallet(&wallet).unwrap().unwrap();
            let op = Operation::SetThreshold {
                wallet,
                requested_by: id(OWNER),
                threshold: t.min(n as u64),
                nonce: account.nonce(),
            };
            c.apply(&op).unwrap();
            applied.push(op);
        }

        let before = c.wallet(&wallet).unwrap().unwrap();
        prop_assert_eq!(before.nonce(), 1 + applied.len() as u64);
        let replay = pick.get(&applied);
        let err = recovery_err(c.apply(replay));
        prop_assert!(
            matches!(err, RecoveryError::StaleNonce { .. }),
            "expected StaleNonce, got {:?}",
            err
        );
        prop_assert_eq!(c.wallet(&wallet).unwrap().unwrap(), before);
    }
}
