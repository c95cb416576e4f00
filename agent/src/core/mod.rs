//! Deterministic, pure logic shared by the pipeline.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod catalog;
pub mod classifier;
pub mod invariants;
pub mod planner;
pub mod rollback;
pub mod state_machine;
pub mod types;
pub mod validator;
