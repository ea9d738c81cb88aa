//! Code generator abstraction for the external CLI.
//!
//! The [`CodeGenerator`] trait decouples the pipeline from the actual backend
//! (currently the `codex` CLI). Tests use scripted generators that edit the
//! checkout directly without spawning processes.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::core::inputs::ApprovalMode;
use crate::core::provider::{Provider, ProviderEnv};
use crate::io::process::{Tee, run_command_with_timeout};

/// Parameters for one CLI invocation.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Checkout the CLI edits in place.
    pub workdir: PathBuf,
    /// Task description passed verbatim.
    pub prompt: String,
    pub approval_mode: ApprovalMode,
    pub model: String,
    pub provider: Provider,
    /// Variables merged into the inherited environment.
    pub env: ProviderEnv,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
    /// Copy CLI output here while it runs.
    pub log_path: Option<PathBuf>,
}

/// How the CLI process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOutcome {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    /// Tail of stderr, for error reporting.
    pub stderr_tail: String,
}

impl GenerateOutcome {
    pub fn succeeded() -> Self {
        Self {
            exit_code: Some(0),
            timed_out: false,
            stderr_tail: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Abstraction over code-generation backends.
pub trait CodeGenerator {
    /// Run the generator against `request.workdir`.
    ///
    /// `Err` means the generator could not be run at all; a run that started
    /// but failed is reported through [`GenerateOutcome`].
    fn generate(&self, request: &GenerateRequest) -> Result<GenerateOutcome>;
}

/// Generator that spawns the codex CLI.
#[derive(Debug, Clone)]
pub struct CodexCli {
    bin: String,
}

impl CodexCli {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    /// Build the command without spawning it.
    pub fn command(&self, request: &GenerateRequest) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("--quiet")
            .arg("--approval-mode")
            .arg(request.approval_mode.as_str())
            .arg("--model")
            .arg(&request.model)
            .arg("--provider")
            .arg(request.provider.as_str())
            .arg(&request.prompt)
            .current_dir(&request.workdir);
        for (name, value) in request.env.vars() {
            cmd.env(name, value);
        }
        cmd
    }
}

impl Default for CodexCli {
    fn default() -> Self {
        Self::new("codex")
    }
}

impl CodeGenerator for CodexCli {
    #[instrument(skip_all, fields(bin = %self.bin, timeout_secs = request.timeout.as_secs()))]
    fn generate(&self, request: &GenerateRequest) -> Result<GenerateOutcome> {
        info!(
            workdir = %request.workdir.display(),
            model = %request.model,
            provider = %request.provider,
            approval_mode = %request.approval_mode,
            env = ?request.env.names(),
            "starting codex"
        );

        let output = run_command_with_timeout(
            self.command(request),
            request.timeout,
            request.output_limit_bytes,
            Tee {
                echo: true,
                path: request.log_path.as_deref(),
            },
        )
        .with_context(|| format!("run {}", self.bin))?;

        if output.timed_out {
            warn!(
                timeout_secs = request.timeout.as_secs(),
                "codex timed out"
            );
        } else if !output.success() {
            warn!(exit_code = ?output.status.code(), "codex failed");
        } else {
            debug!("codex completed successfully");
        }

        Ok(GenerateOutcome {
            exit_code: output.status.code(),
            timed_out: output.timed_out,
            stderr_tail: output.stderr_tail(20),
        })
    }
}
