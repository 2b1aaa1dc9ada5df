//! # solace-sdk
//!
//! Client driver for guardian-based wallet recovery.
//!
//! Signs protocol operations with the holder's keypair, submits them to a
//! [`Ledger`](solace_core::traits::Ledger), and surfaces every rejection as
//! a typed error.
//!
//! # Modules
//!
//! - [`error`]: `SdkError` enum
//! - [`sdk`]: `SolaceSdk`, the high-level client
//! - [`directory`]: in-memory name directory

pub mod directory;
pub mod error;
pub mod sdk;

pub use directory::MemoryDirectory;
pub use error::SdkError;
pub use sdk::SolaceSdk;
