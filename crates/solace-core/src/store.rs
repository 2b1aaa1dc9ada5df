//! Account store interface and in-memory implementation.
//!
//! Wallets, recovery attempts, and lamport balances live in an external
//! keyed store, loaded and written explicitly by the coordinator. The
//! [`MemoryStore`] is suitable for testing; the reference node uses RocksDB
//! (solace-node).
//!
//! Each protocol operation produces a list of [`StateChange`]s that must be
//! applied atomically through [`AccountStore::commit`]: readers never see a
//! wallet updated without its attempt, or the reverse.

use std::collections::HashMap;

use crate::account::WalletAccount;
use crate::attempt::RecoveryAttempt;
use crate::error::SolaceError;
use crate::types::Address;

/// A single write produced by a protocol operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    PutWallet(WalletAccount),
    PutAttempt(RecoveryAttempt),
    DeleteAttempt(Address),
    /// Set the lamport balance of any account: a wallet or an identity.
    PutBalance { account: Address, lamports: u64 },
}

/// Keyed storage for wallet and attempt records.
///
/// Not thread-safe: callers serialize access per account, typically by
/// wrapping the store in a `RwLock`.
pub trait AccountStore: Send + Sync {
    /// Load a wallet by address. Returns `None` if unknown.
    fn get_wallet(&self, address: &Address) -> Result<Option<WalletAccount>, SolaceError>;

    /// Load a recovery attempt by its derived address. Returns `None` if unknown.
    fn get_attempt(&self, address: &Address) -> Result<Option<RecoveryAttempt>, SolaceError>;

    /// Lamport balance of `account`. Unknown accounts hold zero.
    fn get_balance(&self, account: &Address) -> Result<u64, SolaceError>;

    /// Every wallet record. Walks the whole store.
    fn wallets(&self) -> Result<Vec<WalletAccount>, SolaceError>;

    /// Apply all changes atomically: either every change is visible afterwards
    /// or none is.
    fn commit(&mut self, changes: Vec<StateChange>) -> Result<(), SolaceError>;

    /// Whether a wallet exists at `address`.
    ///
    /// Default implementation delegates to [`get_wallet`](Self::get_wallet).
    fn contains_wallet(&self, address: &Address) -> Result<bool, SolaceError> {
        Ok(self.get_wallet(address)?.is_some())
    }
}

impl<S: AccountStore + ?Sized> AccountStore for Box<S> {
    fn get_wallet(&self, address: &Address) -> Result<Option<WalletAccount>, SolaceError> {
        (**self).get_wallet(address)
    }

    fn get_attempt(&self, address: &Address) -> Result<Option<RecoveryAttempt>, SolaceError> {
        (**self).get_attempt(address)
    }

    fn get_balance(&self, account: &Address) -> Result<u64, SolaceError> {
        (**self).get_balance(account)
    }

    fn wallets(&self) -> Result<Vec<WalletAccount>, SolaceError> {
        (**self).wallets()
    }

    fn commit(&mut self, changes: Vec<StateChange>) -> Result<(), SolaceError> {
        (**self).commit(changes)
    }
}

/// In-memory account store for testing.
///
/// Stores everything in `HashMap`s with no persistence.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    wallets: HashMap<Address, WalletAccount>,
    attempts: HashMap<Address, RecoveryAttempt>,
    balances: HashMap<Address, u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wallet_count(&self) -> usize {
        self.wallets.len()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }
}

impl AccountStore for MemoryStore {
    fn get_wallet(&self, address: &Address) -> Result<Option<WalletAccount>, SolaceError> {
        Ok(self.wallets.get(address).cloned())
    }

    fn get_attempt(&self, address: &Address) -> Result<Option<RecoveryAttempt>, SolaceError> {
        Ok(self.attempts.get(address).cloned())
    }

    fn get_balance(&self, account: &Address) -> Result<u64, SolaceError> {
        Ok(self.balances.get(account).copied().unwrap_or(0))
    }

    fn wallets(&self) -> Result<Vec<WalletAccount>, SolaceError> {
        Ok(self.wallets.values().cloned().collect())
    }

    fn commit(&mut self, changes: Vec<StateChange>) -> Result<(), SolaceError> {
        // HashMap inserts cannot fail, so applying in order is already atomic.
        for change in changes {
            match change {
                StateChange::PutWallet(wallet) => {
                    self.wallets.insert(*wallet.address(), wallet);
                }
                StateChange::PutAttempt(attempt) => {
                    self.attempts.insert(*attempt.address(), attempt);
                }
                StateChange::DeleteAttempt(address) => {
                    self.attempts.remove(&address);
                }
                StateChange::PutBalance { account, lamports } => {
                    self.balances.insert(account, lamports);
                }
            }
        }
        Ok(())
    }
}
