//! Ledger node composition.
//!
//! The [`Node`] owns a [`RecoveryCoordinator`] over a boxed
//! [`AccountStore`] (RocksDB in production, in-memory for tests) and applies
//! signed operations one at a time under a write lock. Every submission gets
//! a [`ConfirmationHandle`] whose [`Confirmation`] is recorded before
//! `submit` returns; the node keeps the most recent
//! [`NodeConfig::max_confirmations`] of them.
//!
//! The node is also the faucet: airdrops credit lamports directly to any
//! account.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use solace_core::account::WalletAccount;
use solace_core::attempt::RecoveryAttempt;
use solace_core::coordinator::RecoveryCoordinator;
use solace_core::error::SolaceError;
use solace_core::operation::SignedOperation;
use solace_core::store::{AccountStore, MemoryStore};
use solace_core::traits::{Confirmation, ConfirmationHandle, Faucet, Ledger, Rejection};
use solace_core::types::{Address, Hash256, Identity};

use crate::config::NodeConfig;
use crate::confirmations::ConfirmationLog;
use crate::storage::RocksStore;

/// The ledger node: account storage plus the recovery state machine.
pub struct Node {
    coordinator: RwLock<RecoveryCoordinator<Box<dyn AccountStore>>>,
    /// Outcomes of recent submissions, keyed by handle.
    confirmations: Mutex<ConfirmationLog>,
    /// Mixed into handles so resubmitting identical bytes gets a fresh handle.
    submissions: AtomicU64,
    config: NodeConfig,
}

impl Node {
    /// Open a node backed by RocksDB at `config.db_path()`.
    pub fn open(config: NodeConfig) -> Result<Arc<Self>, SolaceError> {
        let store = RocksStore::open(config.db_path())?;
        info!(path = %config.db_path().display(), "account storage opened");
        Ok(Arc::new(Self::with_store(Box::new(store), config)))
    }

    /// A node over an in-memory store with default configuration.
    pub fn in_memory() -> Arc<Self> {
        Arc::new(Self::with_store(
            Box::new(MemoryStore::new()),
            NodeConfig::default(),
        ))
    }

    pub fn with_store(store: Box<dyn AccountStore>, config: NodeConfig) -> Self {
        Self {
            coordinator: RwLock::new(RecoveryCoordinator::new(store)),
            confirmations: Mutex::new(ConfirmationLog::new(config.max_confirmations)),
            submissions: AtomicU64::new(0),
            config,
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Verify and apply a signed operation, recording its confirmation.
    ///
    /// Only encoding failures error here; protocol and signature failures
    /// are recorded as [`Confirmation::Rejected`].
    pub fn submit(&self, signed: SignedOperation) -> Result<ConfirmationHandle, SolaceError> {
        let handle = self.next_handle(&signed)?;
        let op = signed.operation.name();

        let confirmation = match signed.verify() {
            Err(e) => {
                warn!(op, signer = %signed.signer, error = %e, "signature check failed");
                Confirmation::Rejected(Rejection::from(e))
            }
            Ok(()) => match self.coordinator.write().apply(&signed.operation) {
                Ok(outcome) => Confirmation::Applied(outcome),
                Err(e) => Confirmation::Rejected(Rejection::from(e)),
            },
        };

        debug!(op, handle = %handle.0, "operation processed");
        self.confirmations.lock().insert(handle.0, confirmation);
        Ok(handle)
    }

    /// Look up the confirmation for a handle. `None` if unknown or evicted.
    pub fn confirmation(&self, handle: &ConfirmationHandle) -> Option<Confirmation> {
        self.confirmations.lock().get(&handle.0).cloned()
    }

    /// Number of confirmations currently retained.
    pub fn confirmation_count(&self) -> usize {
        self.confirmations.lock().len()
    }

    pub fn get_wallet(&self, address: &Address) -> Result<Option<WalletAccount>, SolaceError> {
        self.coordinator.read().wallet(address)
    }

    pub fn get_attempt(&self, address: &Address) -> Result<Option<RecoveryAttempt>, SolaceError> {
        self.coordinator.read().attempt(address)
    }

    pub fn is_in_recovery(&self, wallet: &Address) -> Result<bool, SolaceError> {
        self.coordinator.read().is_in_recovery(wallet)
    }

    pub fn active_attempt(
        &self,
        wallet: &Address,
    ) -> Result<Option<RecoveryAttempt>, SolaceError> {
        self.coordinator.read().active_attempt(wallet)
    }

    pub fn balance(&self, account: &Address) -> Result<u64, SolaceError> {
        self.coordinator.read().balance(account)
    }

    pub fn guarded_wallets(&self, guardian: &Identity) -> Result<Vec<Address>, SolaceError> {
        self.coordinator.read().wallets_guarded_by(guardian)
    }

    /// Credit `lamports` to `account`. Returns the new balance.
    pub fn airdrop(&self, account: &Address, lamports: u64) -> Result<u64, SolaceError> {
        let balance = self.coordinator.write().credit(account, lamports)?;
        info!(account = %account, lamports, balance, "airdrop");
        Ok(balance)
    }

    fn next_handle(&self, signed: &SignedOperation) -> Result<ConfirmationHandle, SolaceError> {
        let n = self.submissions.fetch_add(1, Ordering::Relaxed);
        let mut hasher = blake3::Hasher::new();
        hasher.update(signed.hash()?.as_bytes());
        hasher.update(&n.to_le_bytes());
        Ok(ConfirmationHandle(Hash256(hasher.finalize().into())))
    }
}

impl Ledger for Node {
    fn submit_operation(
        &self,
        operation: SignedOperation,
    ) -> Result<ConfirmationHandle, SolaceError> {
        self.submit(operation)
    }

    fn await_confirmation(
        &self,
        handle: &ConfirmationHandle,
    ) -> Result<Confirmation, SolaceError> {
        self.confirmation(handle).ok_or_else(|| {
            SolaceError::Transport(format!("unknown confirmation handle {}", handle.0))
        })
    }

    fn fetch_wallet(&self, address: &Address) -> Result<Option<WalletAccount>, SolaceError> {
        self.get_wallet(address)
    }

    fn fetch_attempt(&self, address: &Address) -> Result<Option<RecoveryAttempt>, SolaceError> {
        self.get_attempt(address)
    }

    fn fetch_balance(&self, account: &Address) -> Result<u64, SolaceError> {
        self.balance(account)
    }

    fn wallets_guarded_by(&self, guardian: &Identity) -> Result<Vec<Address>, SolaceError> {
        self.guarded_wallets(guardian)
    }
}

impl Faucet for Node {
    fn request_airdrop(&self, recipient: &Address, amount: u64) -> Result<(), SolaceError> {
        self.airdrop(recipient, amount).map(|_| ())
    }
}
