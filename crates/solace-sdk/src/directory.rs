//! In-memory [`NameDirectory`] implementation.
//!
//! Suitable for tests and local development where no directory service is
//! available. Airdrops come from the node itself.

use std::collections::HashMap;

use parking_lot::Mutex;

use solace_core::error::SolaceError;
use solace_core::traits::NameDirectory;
use solace_core::types::Address;

/// Bidirectional name map. Setting a name for a wallet replaces its old name.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    inner: Mutex<Names>,
}

#[derive(Debug, Default)]
struct Names {
    by_address: HashMap<Address, String>,
    by_name: HashMap<String, Address>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NameDirectory for MemoryDirectory {
    fn set_name(&self, name: &str, wallet: &Address) -> Result<(), SolaceError> {
        let mut names = self.inner.lock();
        if let Some(owner) = names.by_name.get(name) {
            if owner != wallet {
                return Err(SolaceError::Transport(format!("name already taken: {name}")));
            }
        }
        if let Some(old) = names.by_address.insert(*wallet, name.to_string()) {
            names.by_name.remove(&old);
        }
        names.by_name.insert(name.to_string(), *wallet);
        Ok(())
    }

    fn name_of(&self, wallet: &Address) -> Result<Option<String>, SolaceError> {
        Ok(self.inner.lock().by_address.get(wallet).cloned())
    }

    fn address_of(&self, name: &str) -> Result<Option<Address>, SolaceError> {
        Ok(self.inner.lock().by_name.get(name).copied())
    }
}
