//! Guardian registry: the set of identities allowed to approve a recovery,
//! and how many of them must agree.
//!
//! The registry is embedded in a [`WalletAccount`](crate::account::WalletAccount),
//! which performs the owner-authority check before delegating here. Every
//! mutation validates first and only then writes, so a failed call leaves
//! the registry untouched.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::RecoveryError;
use crate::types::Identity;

/// Guardian identities plus the number of approvals required for recovery.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct GuardianRegistry {
    guardians: BTreeSet<Identity>,
    threshold: u64,
}

impl GuardianRegistry {
    /// An empty registry with threshold 0, as created with a new wallet.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guardians(&self) -> &BTreeSet<Identity> {
        &self.guardians
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn len(&self) -> u64 {
        self.guardians.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.guardians.is_empty()
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.guardians.contains(identity)
    }

    /// Whether the threshold can currently be met: `1 <= threshold <= |guardians|`.
    pub fn is_quorum_reachable(&self) -> bool {
        self.threshold >= 1 && self.threshold <= self.len()
    }

    /// Union `new_guardians` into the registry and set the threshold.
    ///
    /// # Errors
    ///
    /// - [`RecoveryError::DuplicateGuardian`] if an entry is already listed,
    ///   appears twice in `new_guardians`, or equals `owner`
    /// - [`RecoveryError::InvalidThreshold`] unless `1 <= new_threshold <= |union|`
    pub fn add(
        &mut self,
        owner: &Identity,
        new_guardians: &[Identity],
        new_threshold: u64,
    ) -> Result<(), RecoveryError> {
        let mut added = BTreeSet::new();
        for guardian in new_guardians {
            if guardian == owner || self.guardians.contains(guardian) || !added.insert(*guardian) {
                return Err(RecoveryError::DuplicateGuardian(guardian.to_string()));
            }
        }

        let total = self.len() + added.len() as u64;
        check_threshold(new_threshold, total)?;

        self.guardians.extend(added);
        self.threshold = new_threshold;
        Ok(())
    }

    /// Remove every identity in `to_remove`. Repeated entries count once.
    ///
    /// # Errors
    ///
    /// - [`RecoveryError::GuardianNotFound`] if any target is not listed
    /// - [`RecoveryError::ThresholdViolation`] if fewer than `threshold`
    ///   guardians would remain
    pub fn remove(&mut self, to_remove: &[Identity]) -> Result<(), RecoveryError> {
        let targets: BTreeSet<Identity> = to_remove.iter().copied().collect();
        if let Some(missing) = targets.iter().find(|g| !self.guardians.contains(g)) {
            return Err(RecoveryError::GuardianNotFound(missing.to_string()));
        }

        let remaining = self.len() - targets.len() as u64;
        if remaining < self.threshold {
            return Err(RecoveryError::ThresholdViolation {
                remaining,
                threshold: self.threshold,
            });
        }

        self.guardians.retain(|g| !targets.contains(g));
        Ok(())
    }

    /// Replace the threshold without touching the guardian set.
    pub fn set_threshold(&mut self, new_threshold: u64) -> Result<(), RecoveryError> {
        check_threshold(new_threshold, self.len())?;
        self.threshold = new_threshold;
        Ok(())
    }

    /// Drop `identity` if listed, clamping the threshold to what remains.
    ///
    /// Used when a guardian becomes the owner through recovery: the owner
    /// may never also be a guardian.
    pub(crate) fn evict(&mut self, identity: &Identity) {
        if self.guardians.remove(identity) {
            self.threshold = self.threshold.min(self.len());
        }
    }
}

fn check_threshold(threshold: u64, guardians: u64) -> Result<(), RecoveryError> {
    if threshold < 1 || threshold > guardians {
        return Err(RecoveryError::InvalidThreshold { threshold, guardians });
    }
    Ok(())
}
