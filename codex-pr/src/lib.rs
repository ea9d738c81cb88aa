//! CI wrapper that turns a prompt into a pull request.
//!
//! The `codex` CLI edits a repository checkout; if anything changed, the
//! changes are committed to a fresh branch, pushed, and proposed as a pull
//! request. The architecture keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (input resolution, provider
//!   mapping, naming, run phases). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting adapters (process, git, GitHub API, outputs,
//!   config). The generator and the hosting API sit behind traits so tests can
//!   swap in fakes.
//!
//! [`pipeline`] and [`publish`] coordinate the two to implement a run.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod publish;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
