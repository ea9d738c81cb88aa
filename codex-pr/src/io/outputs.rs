//! Output writers for the calling workflow.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::types::ActionOutputs;

/// Destination for the run's outputs.
pub trait OutputSink {
    fn write(&self, outputs: &ActionOutputs) -> Result<()>;
}

/// Appends to the file named by `GITHUB_OUTPUT`.
#[derive(Debug, Clone)]
pub struct GithubOutputFile {
    path: PathBuf,
}

impl GithubOutputFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl OutputSink for GithubOutputFile {
    fn write(&self, outputs: &ActionOutputs) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))?;
        file.write_all(format_outputs(outputs).as_bytes())
            .with_context(|| format!("write {}", self.path.display()))?;
        debug!(path = %self.path.display(), "outputs written");
        Ok(())
    }
}

/// Prints output lines to stdout (local runs).
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutOutputs;

impl OutputSink for StdoutOutputs {
    fn write(&self, outputs: &ActionOutputs) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(format_outputs(outputs).as_bytes())
            .context("write outputs to stdout")?;
        stdout.flush().context("flush stdout")
    }
}

/// Pick the sink from `GITHUB_OUTPUT`.
pub fn sink_from_env() -> Box<dyn OutputSink> {
    match std::env::var_os("GITHUB_OUTPUT").filter(|v| !v.is_empty()) {
        Some(path) => Box::new(GithubOutputFile::new(path)),
        None => Box::new(StdoutOutputs),
    }
}

/// `name=value` lines; multi-line values use the `name<<DELIM` form.
pub fn format_outputs(outputs: &ActionOutputs) -> String {
    let mut buf = String::new();
    for (name, value) in outputs.pairs() {
        if value.contains('\n') || value.contains('\r') {
            let delim = delimiter_for(&value);
            buf.push_str(&format!("{name}<<{delim}\n{value}\n{delim}\n"));
        } else {
            buf.push_str(&format!("{name}={value}\n"));
        }
    }
    buf
}

fn delimiter_for(value: &str) -> String {
    let mut delim = "CODEX_PR_EOF".to_string();
    while value.lines().any(|l| l == delim) {
        delim.push('_');
    }
    delim
}

/// `::error::` workflow command for a failure message.
pub fn format_error_annotation(message: &str) -> String {
    let escaped = message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A");
    format!("::error title=codex-pr::{escaped}")
}
