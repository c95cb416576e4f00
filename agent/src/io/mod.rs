//! I/O helpers for pipeline commands.

pub mod audit_log;
pub mod checkpoint;
pub mod config;
pub mod evidence;
pub mod fs;
pub mod git;
pub mod http;
pub mod paths;
pub mod plan_store;
pub mod process;
pub mod transport;
