//! Persistence tests: state written through a RocksDB-backed node survives
//! a reopen, including mid-recovery state.

use solace_core::attempt::RecoveryStatus;
use solace_core::crypto::KeyPair;
use solace_core::derive::{recovery_address, wallet_address};
use solace_core::operation::{Operation, SignedOperation};
use solace_core::store::{AccountStore, StateChange};
use solace_core::traits::{Confirmation, Ledger};
use solace_core::types::Address;
use solace_node_lib::{Node, NodeConfig, RocksStore};

fn config_in(dir: &tempfile::TempDir) -> NodeConfig {
    NodeConfig {
        data_dir: dir.path().to_path_buf(),
        ..NodeConfig::default()
    }
}

fn submit(node: &Node, op: Operation, signer: &KeyPair) -> Confirmation {
    let handle = node
        .submit_operation(SignedOperation::sign(op, signer).unwrap())
        .unwrap();
    node.await_confirmation(&handle).unwrap()
}

#[test]
fn wallet_and_attempt_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let owner = KeyPair::generate();
    let guardian = KeyPair::generate();
    let rescuer = KeyPair::generate();
    let wallet = wallet_address(&owner.identity());

    {
        let node = Node::open(config_in(&dir)).unwrap();
        let create = Operation::CreateWallet {
            owner: owner.identity(),
            base: owner.identity(),
        };
        assert!(matches!(submit(&node, create, &owner), Confirmation::Applied(_)));

        let add = Operation::AddGuardians {
            wallet,
            requested_by: owner.identity(),
            guardians: vec![guardian.identity()],
            threshold: 1,
            nonce: 0,
        };
        assert!(matches!(submit(&node, add, &owner), Confirmation::Applied(_)));

        let initiate = Operation::InitiateRecovery {
            wallet,
            proposer: rescuer.identity(),
            proposed_owner: rescuer.identity(),
        };
        assert!(matches!(submit(&node, initiate, &rescuer), Confirmation::Applied(_)));
    }

    let node = Node::open(config_in(&dir)).unwrap();
    let account = node.fetch_wallet(&wallet).unwrap().unwrap();
    assert!(account.recovery_mode());
    assert!(account.guardians().contains(&guardian.identity()));

    let attempt = node
        .fetch_attempt(&recovery_address(&wallet, 0))
        .unwrap()
        .unwrap();
    assert_eq!(attempt.status(), RecoveryStatus::Pending);
    assert_eq!(attempt.proposed_owner(), &rescuer.identity());
}

#[test]
fn finalize_deletes_attempt_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let owner = KeyPair::generate();
    let guardian = KeyPair::generate();
    let rescuer = KeyPair::generate();
    let wallet = wallet_address(&owner.identity());
    let attempt = recovery_address(&wallet, 0);

    {
        let node = Node::open(config_in(&dir)).unwrap();
        let ops = [
            (
                Operation::CreateWallet {
                    owner: owner.identity(),
                    base: owner.identity(),
                },
                &owner,
            ),
            (
                Operation::AddGuardians {
                    wallet,
                    requested_by: owner.identity(),
                    guardians: vec![guardian.identity()],
                    threshold: 1,
                    nonce: 0,
                },
                &owner,
            ),
            (
                Operation::InitiateRecovery {
                    wallet,
                    proposer: rescuer.identity(),
                    proposed_owner: rescuer.identity(),
                },
                &rescuer,
            ),
            (
                Operation::ApproveRecovery {
                    attempt,
                    approver: guardian.identity(),
                },
                &guardian,
            ),
            (Operation::FinalizeRecovery { attempt }, &rescuer),
        ];
        for (op, signer) in ops {
            let name = op.name();
            assert!(
                matches!(submit(&node, op, signer), Confirmation::Applied(_)),
                "{name} was not applied"
            );
        }
    }

    let store = RocksStore::open(config_in(&dir).db_path()).unwrap();
    assert!(store.get_attempt(&attempt).unwrap().is_none());
    let account = store.get_wallet(&wallet).unwrap().unwrap();
    assert_eq!(account.owner(), &rescuer.identity());
    assert_eq!(account.recovery_sequence(), 1);
    assert_eq!(store.commit_count().unwrap(), 5);
}

#[test]
fn balances_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let owner = KeyPair::generate();
    let wallet = wallet_address(&owner.identity());
    let payee = Address::from(KeyPair::generate().identity());

    {
        let node = Node::open(config_in(&dir)).unwrap();
        let create = Operation::CreateWallet {
            owner: owner.identity(),
            base: owner.identity(),
        };
        assert!(matches!(submit(&node, create, &owner), Confirmation::Applied(_)));
        node.airdrop(&wallet, 1_000).unwrap();
        let send = Operation::SendFunds {
            wallet,
            requested_by: owner.identity(),
            to: payee,
            lamports: 400,
            nonce: 0,
        };
        assert!(matches!(submit(&node, send, &owner), Confirmation::Applied(_)));
    }

    let node = Node::open(config_in(&dir)).unwrap();
    assert_eq!(node.fetch_balance(&wallet).unwrap(), 600);
    assert_eq!(node.fetch_balance(&payee).unwrap(), 400);
    assert_eq!(node.fetch_wallet(&wallet).unwrap().unwrap().nonce(), 1);
}

#[test]
fn empty_commit_only_bumps_counter() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = RocksStore::open(dir.path()).unwrap();
    store.commit(Vec::<StateChange>::new()).unwrap();
    assert_eq!(store.commit_count().unwrap(), 1);
    assert_eq!(store.wallet_count().unwrap(), 0);
}
