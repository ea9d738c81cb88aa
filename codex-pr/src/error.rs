//! Failure taxonomy for a single action run.

use thiserror::Error;

use crate::exit_codes;

/// Fatal run failure. Every variant aborts the run; nothing is retried.
#[derive(Debug, Error)]
pub enum RunError {
    /// Missing or malformed input. Raised before any side effect.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The code-generation CLI could not run or exited unsuccessfully.
    /// Raised before any git command.
    #[error("generation error: {0:#}")]
    Generation(anyhow::Error),

    /// A git or hosting API operation failed after generation succeeded.
    /// Local commits or a pushed branch may remain.
    #[error("publish error: {0:#}")]
    Publish(anyhow::Error),

    /// Broken run invariant, such as an illegal phase transition.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RunError {
    /// Process exit code for this failure class.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => exit_codes::CONFIGURATION,
            Self::Generation(_) => exit_codes::GENERATION,
            Self::Publish(_) => exit_codes::PUBLISH,
            Self::Internal(_) => exit_codes::INTERNAL,
        }
    }
}
