//! Operator-assistant pipeline for compliance-scoped deployment tasks.
//!
//! A task description is classified into a regulatory domain, turned into an
//! ordered plan, executed step by step with a checkpoint after every step,
//! validated, and recorded as an evidence manifest. The crate keeps a strict
//! separation:
//!
//! - **[`core`]**: Pure, deterministic logic (classification, planning,
//!   validation, state). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (filesystem, subprocesses, HTTP).
//!   Isolated behind small traits to enable scripted transports in tests.
//!
//! Orchestration modules ([`dispatch`], [`runner`], [`pipeline`], [`adhoc`], [`render`])
//! coordinate core logic with I/O to implement CLI commands.

pub mod adhoc;
pub mod core;
pub mod dispatch;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod render;
pub mod runner;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
