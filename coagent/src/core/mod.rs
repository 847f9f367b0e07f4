//! Deterministic, pure logic of the reconciliation layer.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod artifact_store;
pub mod classifier;
pub mod invariants;
pub mod pending;
pub mod stage_tracker;
pub mod state_update;
pub mod types;
pub mod view;
