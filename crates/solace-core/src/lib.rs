//! # solace-core
//! Protocol core for guardian-based social-recovery wallets: guardian
//! registry, recovery-attempt lifecycle, quorum evaluation, and the
//! deterministic addressing that binds an attempt to a wallet and sequence.

pub mod account;
pub mod attempt;
pub mod constants;
pub mod coordinator;
pub mod crypto;
pub mod derive;
pub mod error;
pub mod guardian;
pub mod operation;
pub mod store;
pub mod traits;
pub mod types;
