//! Deterministic account address derivation.
//!
//! Two derivations exist:
//!
//! - **Wallet addresses** are `BLAKE3(WALLET_SEED_TAG || base)` where `base`
//!   is a throwaway identity generated at wallet creation.
//! - **Recovery-attempt addresses** are
//!   `SHA-256(RECOVERY_ATTEMPT_TAG || wallet || sequence)`, with the
//!   sequence encoded as 8 bytes **little-endian**.
//!
//! Both are pure functions. The attempt derivation is the only wire format
//! the protocol defines; other implementations must reproduce it byte for
//! byte to locate existing attempts.

use sha2::{Digest, Sha256};

use crate::constants::{RECOVERY_ATTEMPT_TAG, WALLET_SEED_TAG};
use crate::error::RecoveryError;
use crate::types::{Address, Hash256, Identity};

/// Address of the wallet created from the given base identity.
pub fn wallet_address(base: &Identity) -> Address {
    let mut hasher = blake3::Hasher::new();
    hasher.update(WALLET_SEED_TAG);
    hasher.update(base.as_bytes());
    Address::from_hash(Hash256(hasher.finalize().into()))
}

/// Address of the recovery attempt for `wallet` at `sequence`.
pub fn recovery_address(wallet: &Address, sequence: u64) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(RECOVERY_ATTEMPT_TAG);
    hasher.update(wallet.as_bytes());
    hasher.update(sequence.to_le_bytes());
    Address::from_hash(Hash256(hasher.finalize().into()))
}

/// Like [`recovery_address`], taking the wallet in its base58 text form.
///
/// # Errors
///
/// [`RecoveryError::InvalidIdentity`] if `wallet` is not a well-formed address.
pub fn recovery_address_from_str(wallet: &str, sequence: u64) -> Result<Address, RecoveryError> {
    let wallet: Address = wallet.parse()?;
    Ok(recovery_address(&wallet, sequence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn wallet(seed: u8) -> Address {
        Address::from_bytes([seed; 32]).unwrap()
    }

    #[test]
    fn recovery_address_is_deterministic() {
        assert_eq!(recovery_address(&wallet(1), 5), recovery_address(&wallet(1), 5));
    }

    #[test]
    fn sequences_do_not_collide() {
        let w = wallet(1);
        let seen: HashSet<Address> = (0..1_000u64).map(|s| recovery_address(&w, s)).collect();
        assert_eq!(seen.len(), 1_000);
    }

    #[test]
    fn wallets_do_not_collide() {
        let seen: HashSet<Address> = (1..=255u8).map(|b| recovery_address(&wallet(b), 0)).collect();
        assert_eq!(seen.len(), 255);
    }

    #[test]
    fn attempt_never_equals_its_wallet() {
        let w = wallet(3);
        assert_ne!(recovery_address(&w, 0), w);
    }

    #[test]
    fn sequence_is_little_endian() {
        let w = wallet(2);
        let mut hasher = Sha256::new();
        hasher.update(b"solace-recovery-attempt-v1");
        hasher.update([2u8; 32]);
        hasher.update([1, 0, 0, 0, 0, 0, 0, 0]);
        let expected: [u8; 32] = hasher.finalize().into();
        assert_eq!(recovery_address(&w, 1).as_bytes(), &expected);
    }

    #[test]
    fn from_str_matches_typed() {
        let w = wallet(4);
        assert_eq!(
            recovery_address_from_str(&w.encode(), 7).unwrap(),
            recovery_address(&w, 7)
        );
    }

    #[test]
    fn from_str_rejects_malformed() {
        assert!(matches!(
            recovery_address_from_str("not-an-address", 0),
            Err(RecoveryError::InvalidIdentity(_))
        ));
    }

    #[test]
    fn wallet_address_depends_on_base() {
        let a = wallet_address(&Identity::from_bytes([1; 32]).unwrap());
        let b = wallet_address(&Identity::from_bytes([2; 32]).unwrap());
        assert_ne!(a, b);
    }
}
