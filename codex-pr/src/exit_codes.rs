//! Stable exit codes for the `codex-pr` binary.

/// Run finished, with or without changes.
pub const OK: i32 = 0;
/// Broken invariant or failure outside the run taxonomy.
pub const INTERNAL: i32 = 1;
/// Missing or invalid inputs/config.
pub const CONFIGURATION: i32 = 2;
/// The code-generation CLI failed.
pub const GENERATION: i32 = 3;
/// Git or pull-request publishing failed.
pub const PUBLISH: i32 = 4;
