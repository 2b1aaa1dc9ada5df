//! Scenario and adversarial test suite for Solace.
//!
//! Integration tests drive the recovery protocol end to end through the
//! node and the SDK, and check its invariants under randomized inputs.

pub mod helpers;
