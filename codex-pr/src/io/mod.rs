//! I/O adapters for the action pipeline.

pub mod codex;
pub mod config;
pub mod git;
pub mod github;
pub mod outputs;
pub mod pr_body;
pub mod process;
