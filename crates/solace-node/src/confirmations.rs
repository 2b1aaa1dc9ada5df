//! Bounded record of submission outcomes.
//!
//! Every submission leaves a [`Confirmation`] for its handle. The log keeps
//! at most `max_entries` of them and evicts the oldest first, so clients
//! must read a confirmation before enough newer submissions push it out.

use std::collections::{HashMap, VecDeque};

use solace_core::traits::Confirmation;
use solace_core::types::Hash256;

/// Default number of confirmations retained.
pub const DEFAULT_MAX_CONFIRMATIONS: usize = 10_000;

/// Insertion-ordered, size-limited map from handle to confirmation.
///
/// Not thread-safe: the node wraps it in a `Mutex`.
#[derive(Debug)]
pub struct ConfirmationLog {
    entries: HashMap<Hash256, Confirmation>,
    /// Handles in insertion order, oldest first.
    order: VecDeque<Hash256>,
    max_entries: usize,
}

impl ConfirmationLog {
    /// A log holding at most `max_entries` confirmations (minimum one).
    pub fn new(max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            max_entries,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_MAX_CONFIRMATIONS)
    }

    /// Record `confirmation` under `handle`, evicting the oldest entries
    /// beyond capacity.
    pub fn insert(&mut self, handle: Hash256, confirmation: Confirmation) {
        if self.entries.insert(handle, confirmation).is_none() {
            self.order.push_back(handle);
        }
        while self.order.len() > self.max_entries {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    pub fn get(&self, handle: &Hash256) -> Option<&Confirmation> {
        self.entries.get(handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}
