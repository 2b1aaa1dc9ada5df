//! The wallet account protected by social recovery.

use serde::{Deserialize, Serialize};

use crate::error::RecoveryError;
use crate::guardian::GuardianRegistry;
use crate::types::{Address, Identity};

/// Persistent state of one protected wallet.
///
/// Stored in the external account store keyed by `address`. The owner
/// controls guardian changes and fund movement only while `recovery_mode` is
/// false; while a recovery attempt is open, owner authority is limited to
/// cancelling it.
///
/// Every owner-signed operation names the wallet's current `nonce` and
/// consumes it on success, so a captured signature cannot be applied twice.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct WalletAccount {
    address: Address,
    owner: Identity,
    guardians: GuardianRegistry,
    recovery_mode: bool,
    recovery_sequence: u64,
    nonce: u64,
}

impl WalletAccount {
    /// A fresh wallet: no guardians, threshold 0, sequence 0.
    pub fn new(address: Address, owner: Identity) -> Self {
        Self {
            address,
            owner,
            guardians: GuardianRegistry::new(),
            recovery_mode: false,
            recovery_sequence: 0,
            nonce: 0,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn owner(&self) -> &Identity {
        &self.owner
    }

    pub fn guardians(&self) -> &GuardianRegistry {
        &self.guardians
    }

    pub fn recovery_mode(&self) -> bool {
        self.recovery_mode
    }

    pub fn recovery_sequence(&self) -> u64 {
        self.recovery_sequence
    }

    /// The nonce the next owner-signed operation must carry.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Check that `requested_by` may exercise owner authority right now with
    /// an operation signed at `nonce`.
    ///
    /// # Errors
    ///
    /// - [`RecoveryError::Unauthorized`] if the caller is not the owner or the
    ///   wallet is in recovery mode
    /// - [`RecoveryError::StaleNonce`] if `nonce` is not the current one
    pub fn authorize_owner(
        &self,
        requested_by: &Identity,
        nonce: u64,
    ) -> Result<(), RecoveryError> {
        if *requested_by != self.owner || self.recovery_mode {
            return Err(RecoveryError::Unauthorized);
        }
        if nonce != self.nonce {
            return Err(RecoveryError::StaleNonce {
                expected: self.nonce,
                got: nonce,
            });
        }
        Ok(())
    }

    pub fn add_guardians(
        &mut self,
        requested_by: &Identity,
        new_guardians: &[Identity],
        new_threshold: u64,
        nonce: u64,
    ) -> Result<(), RecoveryError> {
        self.authorize_owner(requested_by, nonce)?;
        self.guardians.add(&self.owner, new_guardians, new_threshold)?;
        self.nonce += 1;
        Ok(())
    }

    pub fn remove_guardians(
        &mut self,
        requested_by: &Identity,
        to_remove: &[Identity],
        nonce: u64,
    ) -> Result<(), RecoveryError> {
        self.authorize_owner(requested_by, nonce)?;
        self.guardians.remove(to_remove)?;
        self.nonce += 1;
        Ok(())
    }

    pub fn set_threshold(
        &mut self,
        requested_by: &Identity,
        new_threshold: u64,
        nonce: u64,
    ) -> Result<(), RecoveryError> {
        self.authorize_owner(requested_by, nonce)?;
        self.guardians.set_threshold(new_threshold)?;
        self.nonce += 1;
        Ok(())
    }

    /// Authorize an owner fund transfer, consuming the nonce.
    pub fn authorize_spend(
        &mut self,
        requested_by: &Identity,
        nonce: u64,
    ) -> Result<(), RecoveryError> {
        self.authorize_owner(requested_by, nonce)?;
        self.nonce += 1;
        Ok(())
    }

    pub(crate) fn enter_recovery(&mut self) {
        self.recovery_mode = true;
    }

    /// Close the current recovery cycle: leave recovery mode and advance the
    /// sequence so every attempt bound to the old value becomes stale.
    pub(crate) fn close_recovery_cycle(&mut self) {
        self.recovery_mode = false;
        self.recovery_sequence += 1;
    }

    /// Hand ownership to `new_owner`, evicting it from the guardian set.
    pub(crate) fn transfer_ownership(&mut self, new_owner: Identity) {
        self.guardians.evict(&new_owner);
        self.owner = new_owner;
    }
}
