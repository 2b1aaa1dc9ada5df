//! Core protocol types: hashes, identities, account addresses.
//!
//! Identities and addresses are both 32-byte values rendered as base58,
//! the same text form the wallet front-end uses for public keys. They are
//! kept as distinct types so an attempt address can never be passed where
//! a guardian identity is expected.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::RecoveryError;

/// A 32-byte hash value.
///
/// Used for confirmation handles and as the raw output of address
/// derivation.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// Decode a base58 string into exactly 32 non-zero bytes.
fn decode_base58_32(s: &str) -> Result<[u8; 32], RecoveryError> {
    let bytes = bs58::decode(s)
        .into_vec()
        .map_err(|_| RecoveryError::InvalidIdentity(s.to_string()))?;
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| RecoveryError::InvalidIdentity(s.to_string()))?;
    if arr == [0u8; 32] {
        return Err(RecoveryError::InvalidIdentity(s.to_string()));
    }
    Ok(arr)
}

/// Decode 32 raw bytes off the wire, applying the same non-zero rule as the
/// text parsers.
fn decode_raw_32<C, D: bincode::de::Decoder<Context = C>>(
    decoder: &mut D,
) -> Result<[u8; 32], bincode::error::DecodeError> {
    let bytes = <[u8; 32] as bincode::Decode<C>>::decode(decoder)?;
    if bytes == [0u8; 32] {
        return Err(bincode::error::DecodeError::OtherString(
            RecoveryError::InvalidIdentity(bs58::encode(bytes).into_string()).to_string(),
        ));
    }
    Ok(bytes)
}

/// A participant identity: the raw ed25519 public key of an owner,
/// guardian, or recovery proposer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, bincode::Encode)]
pub struct Identity([u8; 32]);

impl Identity {
    /// Wrap raw key bytes. Fails on the all-zero key.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, RecoveryError> {
        if bytes == [0u8; 32] {
            return Err(RecoveryError::InvalidIdentity(bs58::encode(bytes).into_string()));
        }
        Ok(Self(bytes))
    }

    /// Keys produced by a real ed25519 secret are never all-zero.
    pub(crate) fn from_key(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn encode(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.encode())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

impl FromStr for Identity {
    type Err = RecoveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_base58_32(s).map(Self)
    }
}

impl<C> bincode::Decode<C> for Identity {
    fn decode<D: bincode::de::Decoder<Context = C>>(
        decoder: &mut D,
    ) -> Result<Self, bincode::error::DecodeError> {
        decode_raw_32(decoder).map(Self)
    }
}

bincode::impl_borrow_decode!(Identity);

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// An account address in the external store: a wallet, a recovery attempt,
/// or the funds account of an identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, bincode::Encode)]
pub struct Address([u8; 32]);

impl Address {
    /// Wrap raw address bytes. Fails on the all-zero address.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, RecoveryError> {
        if bytes == [0u8; 32] {
            return Err(RecoveryError::InvalidIdentity(bs58::encode(bytes).into_string()));
        }
        Ok(Self(bytes))
    }

    /// Addresses produced by a hash are never zero in practice; this
    /// constructor skips the check for derivation outputs.
    pub(crate) fn from_hash(hash: Hash256) -> Self {
        Self(hash.0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn encode(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.encode())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

impl FromStr for Address {
    type Err = RecoveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_base58_32(s).map(Self)
    }
}

/// An identity's own funds account lives at the address equal to its key.
impl From<Identity> for Address {
    fn from(identity: Identity) -> Self {
        Self(identity.0)
    }
}

impl<C> bincode::Decode<C> for Address {
    fn decode<D: bincode::de::Decoder<Context = C>>(
        decoder: &mut D,
    ) -> Result<Self, bincode::error::DecodeError> {
        decode_raw_32(decoder).map(Self)
    }
}

bincode::impl_borrow_decode!(Address);

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
