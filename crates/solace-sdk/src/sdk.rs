//! Client-side driver for the recovery protocol.
//!
//! [`SolaceSdk`] signs operations with the holder's keypair, submits them to
//! a [`Ledger`], and waits for each confirmation. Protocol rejections come
//! back as [`SdkError::Rejected`] with the exact [`RecoveryError`]; nothing
//! is collapsed into a boolean.

use std::sync::Arc;

use tracing::{debug, info};

use solace_core::account::WalletAccount;
use solace_core::constants::DEFAULT_AIRDROP_LAMPORTS;
use solace_core::crypto::KeyPair;
use solace_core::derive::recovery_address;
use solace_core::error::{RecoveryError, SolaceError};
use solace_core::operation::{Operation, OperationOutcome, SignedOperation};
use solace_core::traits::{Confirmation, Faucet, Ledger, NameDirectory, Rejection};
use solace_core::types::{Address, Identity};

use crate::error::SdkError;

/// A wallet holder's handle on the ledger, name directory, and faucet.
pub struct SolaceSdk {
    ledger: Arc<dyn Ledger>,
    directory: Arc<dyn NameDirectory>,
    faucet: Arc<dyn Faucet>,
    owner: KeyPair,
    wallet: Option<Address>,
}

impl SolaceSdk {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        directory: Arc<dyn NameDirectory>,
        faucet: Arc<dyn Faucet>,
        owner: KeyPair,
    ) -> Self {
        Self {
            ledger,
            directory,
            faucet,
            owner,
            wallet: None,
        }
    }

    /// Attach an existing wallet, e.g. after recovering it.
    pub fn with_wallet(mut self, wallet: Address) -> Self {
        self.wallet = Some(wallet);
        self
    }

    pub fn owner(&self) -> &KeyPair {
        &self.owner
    }

    pub fn wallet(&self) -> Option<Address> {
        self.wallet
    }

    fn loaded_wallet(&self) -> Result<Address, SdkError> {
        self.wallet.ok_or(SdkError::WalletNotLoaded)
    }

    // --- Wallet lifecycle ---

    /// Fund the owner, create a wallet at a fresh seed address, and register
    /// `name` for it in the directory.
    ///
    /// If the name cannot be registered the wallet still exists and stays
    /// attached; the error is [`SdkError::NameNotRegistered`] carrying its
    /// address.
    pub fn create_wallet_with_name(&mut self, name: &str) -> Result<Address, SdkError> {
        let seed_base = KeyPair::generate().identity();
        self.airdrop(&Address::from(self.owner.identity()), DEFAULT_AIRDROP_LAMPORTS)?;

        let op = Operation::CreateWallet {
            owner: self.owner.identity(),
            base: seed_base,
        };
        let wallet = match self.execute(op, &self.owner)? {
            OperationOutcome::WalletCreated { wallet } => wallet,
            other => return Err(unexpected(other)),
        };
        self.wallet = Some(wallet);

        self.directory
            .set_name(name, &wallet)
            .map_err(|e| SdkError::NameNotRegistered {
                wallet,
                reason: e.to_string(),
            })?;
        info!(wallet = %wallet, name, "wallet created");
        Ok(wallet)
    }

    /// Load the current record of the attached wallet.
    pub fn fetch_wallet_data(&self) -> Result<WalletAccount, SdkError> {
        self.fetch_data_for_wallet(&self.loaded_wallet()?)
    }

    pub fn fetch_data_for_wallet(&self, wallet: &Address) -> Result<WalletAccount, SdkError> {
        self.ledger
            .fetch_wallet(wallet)?
            .ok_or_else(|| SdkError::Rejected(RecoveryError::WalletNotFound(wallet.to_string())))
    }

    // --- Guardians ---

    /// Add one guardian. The threshold becomes the new guardian count, so
    /// every guardian must approve a recovery.
    pub fn add_guardian(&self, guardian: &Identity) -> Result<WalletAccount, SdkError> {
        let wallet = self.loaded_wallet()?;
        let current = self.fetch_wallet_data()?;
        let op = Operation::AddGuardians {
            wallet,
            requested_by: self.owner.identity(),
            guardians: vec![*guardian],
            threshold: current.guardians().len() + 1,
            nonce: current.nonce(),
        };
        self.execute(op, &self.owner)?;
        self.fetch_wallet_data()
    }

    /// Remove one guardian, first lowering the threshold if the removal
    /// would otherwise leave too few guardians to meet it.
    pub fn remove_guardian(&self, guardian: &Identity) -> Result<WalletAccount, SdkError> {
        let wallet = self.loaded_wallet()?;
        let current = self.fetch_wallet_data()?;
        let registry = current.guardians();

        let mut nonce = current.nonce();

        let remaining = registry.len().saturating_sub(1);
        if registry.contains(guardian) && remaining >= 1 && registry.threshold() > remaining {
            debug!(wallet = %wallet, threshold = remaining, "lowering threshold before removal");
            let op = Operation::SetThreshold {
                wallet,
                requested_by: self.owner.identity(),
                threshold: remaining,
                nonce,
            };
            self.execute(op, &self.owner)?;
            nonce += 1;
        }

        let op = Operation::RemoveGuardians {
            wallet,
            requested_by: self.owner.identity(),
            guardians: vec![*guardian],
            nonce,
        };
        self.execute(op, &self.owner)?;
        self.fetch_wallet_data()
    }

    /// Wallets that list this SDK's keypair as a guardian.
    pub fn guardian_data(&self) -> Result<Vec<Address>, SdkError> {
        Ok(self.ledger.wallets_guarded_by(&self.owner.identity())?)
    }

    // --- Funds ---

    /// Lamport balance of the attached wallet.
    pub fn balance(&self) -> Result<u64, SdkError> {
        Ok(self.ledger.fetch_balance(&self.loaded_wallet()?)?)
    }

    /// Request `lamports` from the faucet into the attached wallet.
    pub fn fund_wallet(&self, lamports: u64) -> Result<(), SdkError> {
        self.airdrop(&self.loaded_wallet()?, lamports)
    }

    /// Send `lamports` from the attached wallet to `to`. Returns the
    /// wallet's remaining balance.
    pub fn send_funds(&self, to: &Address, lamports: u64) -> Result<u64, SdkError> {
        let wallet = self.loaded_wallet()?;
        let current = self.fetch_wallet_data()?;
        let op = Operation::SendFunds {
            wallet,
            requested_by: self.owner.identity(),
            to: *to,
            lamports,
            nonce: current.nonce(),
        };
        match self.execute(op, &self.owner)? {
            OperationOutcome::FundsSent { balance, .. } => Ok(balance),
            other => Err(unexpected(other)),
        }
    }

    // --- Recovery ---

    pub fn is_in_recovery(&self, wallet: &Address) -> Result<bool, SdkError> {
        Ok(self.fetch_data_for_wallet(wallet)?.recovery_mode())
    }

    /// Approve the open recovery of `wallet_to_recover` as a guardian,
    /// using this SDK's keypair. Returns the attempt address.
    pub fn approve_recovery_by_keypair(
        &self,
        wallet_to_recover: &Address,
    ) -> Result<Address, SdkError> {
        let target = self.fetch_data_for_wallet(wallet_to_recover)?;
        let attempt = recovery_address(wallet_to_recover, target.recovery_sequence());
        let op = Operation::ApproveRecovery {
            attempt,
            approver: self.owner.identity(),
        };
        self.execute(op, &self.owner)?;
        Ok(attempt)
    }

    /// Fund `new_owner` and open a recovery of `wallet_to_recover` proposing
    /// it as the new owner. Returns the attempt address.
    pub fn create_wallet_to_request_recovery(
        &self,
        new_owner: &KeyPair,
        wallet_to_recover: &Address,
    ) -> Result<Address, SdkError> {
        self.airdrop(&Address::from(new_owner.identity()), DEFAULT_AIRDROP_LAMPORTS)?;
        let op = Operation::InitiateRecovery {
            wallet: *wallet_to_recover,
            proposer: new_owner.identity(),
            proposed_owner: new_owner.identity(),
        };
        match self.execute(op, new_owner)? {
            OperationOutcome::RecoveryInitiated { attempt, .. } => Ok(attempt),
            other => Err(unexpected(other)),
        }
    }

    /// Complete an approved recovery. Returns the wallet with its new owner.
    pub fn finalize_recovery(&self, attempt: &Address) -> Result<WalletAccount, SdkError> {
        let op = Operation::FinalizeRecovery { attempt: *attempt };
        match self.execute(op, &self.owner)? {
            OperationOutcome::RecoveryFinalized { wallet, .. } => {
                self.fetch_data_for_wallet(&wallet)
            }
            other => Err(unexpected(other)),
        }
    }

    /// Cancel an open recovery of the attached wallet. Only its owner may.
    pub fn cancel_recovery(&self, attempt: &Address) -> Result<WalletAccount, SdkError> {
        let op = Operation::CancelRecovery {
            attempt: *attempt,
            requested_by: self.owner.identity(),
        };
        match self.execute(op, &self.owner)? {
            OperationOutcome::RecoveryCancelled { wallet, .. } => {
                self.fetch_data_for_wallet(&wallet)
            }
            other => Err(unexpected(other)),
        }
    }

    // --- Directory ---

    pub fn name_from_address(&self, wallet: &Address) -> Result<Option<String>, SdkError> {
        self.directory
            .name_of(wallet)
            .map_err(|e| SdkError::Directory(e.to_string()))
    }

    pub fn address_from_name(&self, name: &str) -> Result<Option<Address>, SdkError> {
        self.directory
            .address_of(name)
            .map_err(|e| SdkError::Directory(e.to_string()))
    }

    // --- Internal helpers ---

    fn airdrop(&self, recipient: &Address, lamports: u64) -> Result<(), SdkError> {
        self.faucet
            .request_airdrop(recipient, lamports)
            .map_err(|e| SdkError::Faucet(e.to_string()))
    }

    /// Sign, submit, and wait for one operation.
    fn execute(
        &self,
        operation: Operation,
        signer: &KeyPair,
    ) -> Result<OperationOutcome, SdkError> {
        let name = operation.name();
        let signed = SignedOperation::sign(operation, signer)?;
        let handle = self.ledger.submit_operation(signed)?;
        match self.ledger.await_confirmation(&handle)? {
            Confirmation::Applied(outcome) => Ok(outcome),
            Confirmation::Rejected(rejection) => {
                debug!(op = name, ?rejection, "operation rejected");
                Err(match rejection {
                    Rejection::Protocol(e) => SdkError::Rejected(e),
                    Rejection::Signature(e) => SdkError::Solace(e.into()),
                    Rejection::Internal(msg) => SdkError::Solace(SolaceError::Transport(msg)),
                })
            }
        }
    }
}

fn unexpected(outcome: OperationOutcome) -> SdkError {
    SdkError::Solace(SolaceError::Transport(format!(
        "unexpected outcome from ledger: {outcome:?}"
    )))
}

impl std::fmt::Debug for SolaceSdk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolaceSdk")
            .field("owner", &self.owner.identity())
            .field("wallet", &self.wallet)
            .finish_non_exhaustive()
    }
}
