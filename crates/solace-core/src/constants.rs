//! Protocol constants.

/// Seed tag mixed into every wallet address derivation.
pub const WALLET_SEED_TAG: &[u8] = b"SOLACE";

/// Domain separation tag for recovery-attempt address derivation.
///
/// Changing this value changes every attempt address and breaks
/// compatibility with existing state.
pub const RECOVERY_ATTEMPT_TAG: &[u8] = b"solace-recovery-attempt-v1";

/// Lamports per SOL, used for faucet amounts.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Amount airdropped to an identity before it pays for a new account.
pub const DEFAULT_AIRDROP_LAMPORTS: u64 = LAMPORTS_PER_SOL;

/// Default JSON-RPC port for the reference node.
pub const DEFAULT_RPC_PORT: u16 = 18899;
