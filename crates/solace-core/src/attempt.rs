//! Recovery attempt records.
//!
//! An attempt is created at the address derived from its wallet and the
//! wallet's recovery sequence at creation time. It carries a back-reference
//! to the wallet (not ownership) and is stored separately from it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{Address, Identity};

/// Lifecycle status of a recovery attempt.
///
/// `Pending` is initial and `Cancelled` is terminal. An `Approved` attempt
/// is either finalized (and deleted) or cancelled.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
    bincode::Encode, bincode::Decode,
)]
pub enum RecoveryStatus {
    Pending,
    Approved,
    Cancelled,
}

/// Effect of recording one guardian approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalEffect {
    /// A new approval was added; status unchanged.
    Recorded,
    /// A new approval was added and it crossed the threshold.
    QuorumReached,
    /// The guardian had already approved; nothing changed.
    AlreadyApproved,
}

/// One in-progress proposal to transfer ownership of a wallet.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct RecoveryAttempt {
    address: Address,
    wallet: Address,
    sequence: u64,
    proposer: Identity,
    proposed_owner: Identity,
    approvals: BTreeSet<Identity>,
    status: RecoveryStatus,
}

impl RecoveryAttempt {
    pub fn new(
        address: Address,
        wallet: Address,
        sequence: u64,
        proposer: Identity,
        proposed_owner: Identity,
    ) -> Self {
        Self {
            address,
            wallet,
            sequence,
            proposer,
            proposed_owner,
            approvals: BTreeSet::new(),
            status: RecoveryStatus::Pending,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The wallet this attempt targets.
    pub fn wallet(&self) -> &Address {
        &self.wallet
    }

    /// The wallet recovery sequence this attempt is bound to.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn proposer(&self) -> &Identity {
        &self.proposer
    }

    pub fn proposed_owner(&self) -> &Identity {
        &self.proposed_owner
    }

    pub fn approvals(&self) -> &BTreeSet<Identity> {
        &self.approvals
    }

    pub fn status(&self) -> RecoveryStatus {
        self.status
    }

    /// Record `approver` and promote to `Approved` once `threshold` is met.
    ///
    /// Repeated approvals are no-ops. Approvals arriving after the threshold
    /// are recorded but never move the status away from `Approved`.
    pub fn approve(&mut self, approver: Identity, threshold: u64) -> ApprovalEffect {
        if !self.approvals.insert(approver) {
            return ApprovalEffect::AlreadyApproved;
        }
        if self.status == RecoveryStatus::Pending && self.approvals.len() as u64 >= threshold {
            self.status = RecoveryStatus::Approved;
            return ApprovalEffect::QuorumReached;
        }
        ApprovalEffect::Recorded
    }

    pub(crate) fn cancel(&mut self) {
        self.status = RecoveryStatus::Cancelled;
    }
}
