//! The recovery state machine.
//!
//! Per wallet and attempt:
//!
//! ```text
//! NoActiveRecovery --initiate--> Pending --quorum--> Approved --finalize--> NoActiveRecovery
//!                                   |                   |
//!                                   +------cancel-------+--> Cancelled --> NoActiveRecovery
//! ```
//!
//! Leaving a cycle (finalize or cancel) increments the wallet's recovery
//! sequence exactly once. Attempts are addressed by
//! [`recovery_address`](crate::derive::recovery_address) over the sequence
//! they were created at, so advancing it makes every older attempt stale:
//! stale, cancelled, and unknown attempts all resolve to
//! [`RecoveryError::AttemptNotFound`].
//!
//! Each operation loads one wallet and at most one attempt, computes the
//! new records, and writes them with a single [`AccountStore::commit`].
//!
//! Owner operations (guardian changes, threshold changes, fund transfers)
//! must carry the wallet's current nonce and advance it, so replaying a
//! captured owner signature fails with [`RecoveryError::StaleNonce`].

use tracing::{debug, info};

use crate::account::WalletAccount;
use crate::attempt::{ApprovalEffect, RecoveryAttempt, RecoveryStatus};
use crate::derive::{recovery_address, wallet_address};
use crate::error::{RecoveryError, SolaceError};
use crate::operation::{Operation, OperationOutcome};
use crate::store::{AccountStore, StateChange};
use crate::types::{Address, Identity};

/// Applies protocol operations to wallets and attempts held in `S`.
pub struct RecoveryCoordinator<S> {
    store: S,
}

impl<S: AccountStore> RecoveryCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    // --- Queries ---

    pub fn wallet(&self, address: &Address) -> Result<Option<WalletAccount>, SolaceError> {
        self.store.get_wallet(address)
    }

    pub fn attempt(&self, address: &Address) -> Result<Option<RecoveryAttempt>, SolaceError> {
        self.store.get_attempt(address)
    }

    /// Whether `wallet` currently has an open recovery attempt.
    pub fn is_in_recovery(&self, wallet: &Address) -> Result<bool, SolaceError> {
        Ok(self.load_wallet(wallet)?.recovery_mode())
    }

    /// The open attempt for `wallet`, if it is in recovery mode.
    pub fn active_attempt(&self, wallet: &Address) -> Result<Option<RecoveryAttempt>, SolaceError> {
        let account = self.load_wallet(wallet)?;
        if !account.recovery_mode() {
            return Ok(None);
        }
        self.store
            .get_attempt(&recovery_address(wallet, account.recovery_sequence()))
    }

    // --- Wallet and guardian management ---

    /// Create a wallet owned by `owner` at the address derived from `base`.
    pub fn create_wallet(
        &mut self,
        owner: Identity,
        base: Identity,
    ) -> Result<Address, SolaceError> {
        let address = wallet_address(&base);
        if self.store.contains_wallet(&address)? {
            return Err(RecoveryError::WalletAlreadyExists(address.to_string()).into());
        }
        self.store
            .commit(vec![StateChange::PutWallet(WalletAccount::new(address, owner))])?;
        info!(wallet = %address, owner = %owner, "wallet created");
        Ok(address)
    }

    pub fn add_guardians(
        &mut self,
        wallet: &Address,
        requested_by: &Identity,
        guardians: &[Identity],
        threshold: u64,
        nonce: u64,
    ) -> Result<WalletAccount, SolaceError> {
        let mut account = self.load_wallet(wallet)?;
        account.add_guardians(requested_by, guardians, threshold, nonce)?;
        self.store.commit(vec![StateChange::PutWallet(account.clone())])?;
        info!(
            wallet = %wallet,
            added = guardians.len(),
            threshold,
            "guardians added"
        );
        Ok(account)
    }

    pub fn remove_guardians(
        &mut self,
        wallet: &Address,
        requested_by: &Identity,
        guardians: &[Identity],
        nonce: u64,
    ) -> Result<WalletAccount, SolaceError> {
        let mut account = self.load_wallet(wallet)?;
        account.remove_guardians(requested_by, guardians, nonce)?;
        self.store.commit(vec![StateChange::PutWallet(account.clone())])?;
        info!(
            wallet = %wallet,
            remaining = account.guardians().len(),
            "guardians removed"
        );
        Ok(account)
    }

    pub fn set_threshold(
        &mut self,
        wallet: &Address,
        requested_by: &Identity,
        threshold: u64,
        nonce: u64,
    ) -> Result<WalletAccount, SolaceError> {
        let mut account = self.load_wallet(wallet)?;
        account.set_threshold(requested_by, threshold, nonce)?;
        self.store.commit(vec![StateChange::PutWallet(account.clone())])?;
        info!(wallet = %wallet, threshold, "threshold changed");
        Ok(account)
    }

    // --- Funds ---

    pub fn balance(&self, account: &Address) -> Result<u64, SolaceError> {
        self.store.get_balance(account)
    }

    /// Add `lamports` to `account`, returning the new balance.
    ///
    /// This is the only way value enters the ledger; the node exposes it as
    /// its faucet.
    pub fn credit(&mut self, account: &Address, lamports: u64) -> Result<u64, SolaceError> {
        if lamports == 0 {
            return Err(RecoveryError::InvalidAmount(0).into());
        }
        let balance = self
            .store
            .get_balance(account)?
            .checked_add(lamports)
            .ok_or(RecoveryError::InvalidAmount(lamports))?;
        self.store.commit(vec![StateChange::PutBalance {
            account: *account,
            lamports: balance,
        }])?;
        debug!(account = %account, lamports, balance, "account credited");
        Ok(balance)
    }

    /// Move `lamports` from `wallet` to `to` on the owner's authority.
    ///
    /// Returns the wallet's remaining balance.
    ///
    /// # Errors
    ///
    /// - [`RecoveryError::Unauthorized`] if the caller is not the owner or the
    ///   wallet is in recovery mode
    /// - [`RecoveryError::StaleNonce`] if `nonce` is not the wallet's current one
    /// - [`RecoveryError::InsufficientFunds`] if the wallet balance is too low
    pub fn send_funds(
        &mut self,
        wallet: &Address,
        requested_by: &Identity,
        to: &Address,
        lamports: u64,
        nonce: u64,
    ) -> Result<u64, SolaceError> {
        let mut account = self.load_wallet(wallet)?;
        account.authorize_spend(requested_by, nonce)?;

        let have = self.store.get_balance(wallet)?;
        if have < lamports {
            return Err(RecoveryError::InsufficientFunds { have, need: lamports }.into());
        }
        let mut changes = vec![StateChange::PutWallet(account)];
        let remaining = if to == wallet {
            // Sending to itself only consumes the nonce.
            have
        } else {
            let received = self
                .store
                .get_balance(to)?
                .checked_add(lamports)
                .ok_or(RecoveryError::InvalidAmount(lamports))?;
            changes.push(StateChange::PutBalance {
                account: *wallet,
                lamports: have - lamports,
            });
            changes.push(StateChange::PutBalance {
                account: *to,
                lamports: received,
            });
            have - lamports
        };

        self.store.commit(changes)?;
        info!(wallet = %wallet, to = %to, lamports, balance = remaining, "funds sent");
        Ok(remaining)
    }

    // --- Guardian lookups ---

    /// Addresses of every wallet that lists `guardian`.
    pub fn wallets_guarded_by(&self, guardian: &Identity) -> Result<Vec<Address>, SolaceError> {
        let mut wallets: Vec<Address> = self
            .store
            .wallets()?
            .into_iter()
            .filter(|w| w.guardians().contains(guardian))
            .map(|w| *w.address())
            .collect();
        wallets.sort();
        Ok(wallets)
    }

    // --- Recovery lifecycle ---

    /// Open a recovery attempt proposing `proposed_owner` for `wallet`.
    ///
    /// Anyone may propose; only guardians may approve.
    ///
    /// # Errors
    ///
    /// - [`RecoveryError::WalletNotFound`] if the wallet does not exist
    /// - [`RecoveryError::RecoveryAlreadyInProgress`] if an attempt is open
    /// - [`RecoveryError::InvalidThreshold`] if the guardian quorum cannot be met
    pub fn initiate_recovery(
        &mut self,
        wallet: &Address,
        proposer: &Identity,
        proposed_owner: &Identity,
    ) -> Result<RecoveryAttempt, SolaceError> {
        let mut account = self.load_wallet(wallet)?;
        if account.recovery_mode() {
            return Err(RecoveryError::RecoveryAlreadyInProgress.into());
        }
        let registry = account.guardians();
        if !registry.is_quorum_reachable() {
            return Err(RecoveryError::InvalidThreshold {
                threshold: registry.threshold(),
                guardians: registry.len(),
            }
            .into());
        }

        let sequence = account.recovery_sequence();
        let address = recovery_address(wallet, sequence);
        let attempt = RecoveryAttempt::new(address, *wallet, sequence, *proposer, *proposed_owner);
        account.enter_recovery();

        self.store.commit(vec![
            StateChange::PutWallet(account),
            StateChange::PutAttempt(attempt.clone()),
        ])?;
        info!(
            wallet = %wallet,
            attempt = %address,
            sequence,
            proposer = %proposer,
            "recovery initiated"
        );
        Ok(attempt)
    }

    /// Record a guardian's approval of the attempt at `attempt`.
    ///
    /// A repeated approval by the same guardian succeeds without changing
    /// anything, so resubmitting after a transport failure is safe.
    ///
    /// # Errors
    ///
    /// - [`RecoveryError::AttemptNotFound`] if no live attempt exists at that address
    /// - [`RecoveryError::NotAGuardian`] if `approver` is not a listed guardian
    pub fn approve_recovery(
        &mut self,
        attempt: &Address,
        approver: &Identity,
    ) -> Result<RecoveryAttempt, SolaceError> {
        let (mut record, account) = self.load_live_attempt(attempt)?;
        if !account.guardians().contains(approver) {
            return Err(RecoveryError::NotAGuardian(approver.to_string()).into());
        }

        match record.approve(*approver, account.guardians().threshold()) {
            ApprovalEffect::AlreadyApproved => {
                debug!(attempt = %attempt, approver = %approver, "approval already recorded");
                return Ok(record);
            }
            ApprovalEffect::QuorumReached => {
                let approvals = record.approvals().len();
                info!(attempt = %attempt, approvals, "recovery approved");
            }
            ApprovalEffect::Recorded => {
                let approvals = record.approvals().len();
                info!(attempt = %attempt, approvals, "approval recorded");
            }
        }

        self.store.commit(vec![StateChange::PutAttempt(record.clone())])?;
        Ok(record)
    }

    /// Transfer ownership to the approved attempt's proposed owner.
    ///
    /// # Errors
    ///
    /// - [`RecoveryError::AttemptNotFound`] if no live attempt exists at that
    ///   address, including replays after the sequence has advanced
    /// - [`RecoveryError::RecoveryNotApproved`] if the quorum was not reached
    pub fn finalize_recovery(&mut self, attempt: &Address) -> Result<WalletAccount, SolaceError> {
        let (record, mut account) = self.load_live_attempt(attempt)?;
        if record.status() != RecoveryStatus::Approved {
            return Err(RecoveryError::RecoveryNotApproved.into());
        }

        account.transfer_ownership(*record.proposed_owner());
        account.close_recovery_cycle();

        self.store.commit(vec![
            StateChange::PutWallet(account.clone()),
            StateChange::DeleteAttempt(*attempt),
        ])?;
        info!(
            wallet = %account.address(),
            new_owner = %account.owner(),
            sequence = account.recovery_sequence(),
            "recovery finalized"
        );
        Ok(account)
    }

    /// Cancel an open attempt. Only the current owner may do this.
    ///
    /// The attempt is kept as a `Cancelled` record and the sequence advances,
    /// so its address is never reused.
    pub fn cancel_recovery(
        &mut self,
        attempt: &Address,
        requested_by: &Identity,
    ) -> Result<WalletAccount, SolaceError> {
        let (mut record, mut account) = self.load_live_attempt(attempt)?;
        if requested_by != account.owner() {
            return Err(RecoveryError::Unauthorized.into());
        }

        record.cancel();
        account.close_recovery_cycle();

        self.store.commit(vec![
            StateChange::PutWallet(account.clone()),
            StateChange::PutAttempt(record),
        ])?;
        info!(
            wallet = %account.address(),
            attempt = %attempt,
            sequence = account.recovery_sequence(),
            "recovery cancelled"
        );
        Ok(account)
    }

    // --- Dispatch ---

    /// Validate and apply one operation.
    pub fn apply(&mut self, operation: &Operation) -> Result<OperationOutcome, SolaceError> {
        operation.validate()?;
        let result = self.dispatch(operation);
        if let Err(e) = &result {
            debug!(op = operation.name(), error = %e, "operation rejected");
        }
        result
    }

    fn dispatch(&mut self, operation: &Operation) -> Result<OperationOutcome, SolaceError> {
        match operation {
            Operation::CreateWallet { owner, base } => {
                let wallet = self.create_wallet(*owner, *base)?;
                Ok(OperationOutcome::WalletCreated { wallet })
            }
            Operation::AddGuardians { wallet, requested_by, guardians, threshold, nonce } => {
                let account =
                    self.add_guardians(wallet, requested_by, guardians, *threshold, *nonce)?;
                Ok(guardians_updated(&account))
            }
            Operation::RemoveGuardians { wallet, requested_by, guardians, nonce } => {
                let account = self.remove_guardians(wallet, requested_by, guardians, *nonce)?;
                Ok(guardians_updated(&account))
            }
            Operation::SetThreshold { wallet, requested_by, threshold, nonce } => {
                let account = self.set_threshold(wallet, requested_by, *threshold, *nonce)?;
                Ok(guardians_updated(&account))
            }
            Operation::SendFunds { wallet, requested_by, to, lamports, nonce } => {
                let balance = self.send_funds(wallet, requested_by, to, *lamports, *nonce)?;
                Ok(OperationOutcome::FundsSent {
                    wallet: *wallet,
                    to: *to,
                    lamports: *lamports,
                    balance,
                })
            }
            Operation::InitiateRecovery { wallet, proposer, proposed_owner } => {
                let attempt = self.initiate_recovery(wallet, proposer, proposed_owner)?;
                Ok(OperationOutcome::RecoveryInitiated {
                    wallet: *wallet,
                    attempt: *attempt.address(),
                    sequence: attempt.sequence(),
                })
            }
            Operation::ApproveRecovery { attempt, approver } => {
                let record = self.approve_recovery(attempt, approver)?;
                Ok(OperationOutcome::RecoveryApproved {
                    attempt: *attempt,
                    approvals: record.approvals().len() as u64,
                    status: record.status(),
                })
            }
            Operation::FinalizeRecovery { attempt } => {
                let account = self.finalize_recovery(attempt)?;
                Ok(OperationOutcome::RecoveryFinalized {
                    wallet: *account.address(),
                    new_owner: *account.owner(),
                    sequence: account.recovery_sequence(),
                })
            }
            Operation::CancelRecovery { attempt, requested_by } => {
                let account = self.cancel_recovery(attempt, requested_by)?;
                Ok(OperationOutcome::RecoveryCancelled {
                    wallet: *account.address(),
                    attempt: *attempt,
                    sequence: account.recovery_sequence(),
                })
            }
        }
    }

    // --- Loading ---

    fn load_wallet(&self, address: &Address) -> Result<WalletAccount, SolaceError> {
        self.store
            .get_wallet(address)?
            .ok_or_else(|| RecoveryError::WalletNotFound(address.to_string()).into())
    }

    /// Load a non-cancelled attempt bound to its wallet's current sequence,
    /// together with that wallet.
    fn load_live_attempt(
        &self,
        address: &Address,
    ) -> Result<(RecoveryAttempt, WalletAccount), SolaceError> {
        let not_found = || SolaceError::from(RecoveryError::AttemptNotFound(address.to_string()));

        let attempt = self.store.get_attempt(address)?.ok_or_else(not_found)?;
        if attempt.status() == RecoveryStatus::Cancelled {
            return Err(not_found());
        }
        let account = self.store.get_wallet(attempt.wallet())?.ok_or_else(not_found)?;
        let current = recovery_address(account.address(), account.recovery_sequence());
        if !account.recovery_mode() || current != *address {
            return Err(not_found());
        }
        Ok((attempt, account))
    }
}

fn guardians_updated(account: &WalletAccount) -> OperationOutcome {
    OperationOutcome::GuardiansUpdated {
        wallet: *account.address(),
        guardians: account.guardians().len(),
        threshold: account.guardians().threshold(),
    }
}
