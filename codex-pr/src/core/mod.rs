//! Deterministic, pure logic for the action pipeline.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! records and return deterministic outputs suitable for tests.

pub mod inputs;
pub mod naming;
pub mod provider;
pub mod state;
pub mod types;
