//! Git adapter for change detection and publishing.
//!
//! A small, explicit wrapper around `git` subprocess calls in the checkout.

use std::path::PathBuf;
use std::process::{Command, Output};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};

/// Parsed `git status --porcelain` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// 2-letter XY code, or "??" for untracked.
    pub code: String,
    /// Path for the changed file.
    pub path: String,
}

/// Commit identity passed via `-c user.name/-c user.email`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Return the current HEAD short SHA.
    pub fn head_short_sha(&self, len: usize) -> Result<String> {
        let arg = format!("--short={len}");
        let out = self.run_capture(&["rev-parse", &arg, "HEAD"])?;
        Ok(out.trim().to_string())
    }

    /// Get status entries (including untracked) in porcelain format.
    #[instrument(skip_all)]
    pub fn status_porcelain(&self) -> Result<Vec<StatusEntry>> {
        let out = self.run_capture(&["status", "--porcelain=v1", "-z", "-uall"])?;
        let entries = parse_status_z(&out)?;
        debug!(changed = entries.len(), "working tree status");
        Ok(entries)
    }

    /// Check whether a local branch exists.
    pub fn branch_exists(&self, branch: &str) -> Result<bool> {
        let status = self
            .run(&[
                "show-ref",
                "--verify",
                "--quiet",
                &format!("refs/heads/{branch}"),
            ])?
            .status;
        Ok(status.success())
    }

    /// Check whether `remote` has a branch named `branch`.
    ///
    /// `ls-remote --exit-code` exits 2 when no ref matches; any other failure
    /// (unreachable remote, auth) is an error.
    pub fn remote_branch_exists(&self, remote: &str, branch: &str) -> Result<bool> {
        let output = self.run(&[
            "ls-remote",
            "--exit-code",
            "--heads",
            remote,
            &format!("refs/heads/{branch}"),
        ])?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(2) => Ok(false),
            _ => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(anyhow!("git ls-remote {remote} failed: {}", stderr.trim()))
            }
        }
    }

    /// URL configured for `remote`.
    pub fn remote_url(&self, remote: &str) -> Result<String> {
        let out = self.run_capture(&["remote", "get-url", remote])?;
        Ok(out.trim().to_string())
    }

    /// Create and checkout a new branch at current HEAD.
    #[instrument(skip_all, fields(branch))]
    pub fn checkout_new_branch(&self, branch: &str) -> Result<()> {
        debug!(branch, "creating and checking out new branch");
        self.run_checked(&["checkout", "-b", branch])?;
        Ok(())
    }

    /// Stage all changes, including deletions (respects .gitignore).
    pub fn add_all(&self) -> Result<()> {
        self.run_checked(&["add", "-A"])?;
        Ok(())
    }

    /// Paths currently staged for commit.
    pub fn staged_paths(&self) -> Result<Vec<String>> {
        let out = self.run_capture(&["diff", "--cached", "--name-only", "-z"])?;
        Ok(out
            .split('\0')
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Commit staged changes with a message as `identity`.
    ///
    /// If there are no staged changes, this returns Ok(false) and does nothing.
    #[instrument(skip_all)]
    pub fn commit_staged(&self, message: &str, identity: &Identity) -> Result<bool> {
        if self.staged_paths()?.is_empty() {
            debug!("no staged changes, skipping commit");
            return Ok(false);
        }
        let name = format!("user.name={}", identity.name);
        let email = format!("user.email={}", identity.email);
        debug!("committing staged changes");
        self.run_checked(&["-c", &name, "-c", &email, "commit", "-q", "-m", message])?;
        Ok(true)
    }

    /// Push `branch` to `remote` and set it as upstream.
    #[instrument(skip_all, fields(remote, branch))]
    pub fn push_branch(&self, remote: &str, branch: &str) -> Result<()> {
        debug!(remote, branch, "pushing branch");
        if let Err(err) = self.run_checked(&["push", "--set-upstream", remote, branch]) {
            warn!(remote, branch, "push failed");
            return Err(err);
        }
        Ok(())
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        let output = self.run_checked(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git {} failed: {}", display_args(args), stderr.trim()));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .with_context(|| format!("spawn git {}", display_args(args)))
    }
}

/// Args for error messages, without `-c` overrides or commit message bodies.
fn display_args(args: &[&str]) -> String {
    let mut shown = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if *arg == "-c" || *arg == "-m" {
            iter.next();
            continue;
        }
        shown.push(*arg);
    }
    shown.join(" ")
}

/// Parse `git status --porcelain=v1 -z` output.
///
/// Records are `XY PATH`, NUL-terminated and unquoted. Renames and copies
/// carry one more record with the original path.
fn parse_status_z(out: &str) -> Result<Vec<StatusEntry>> {
    let mut entries = Vec::new();
    let mut records = out.split('\0').filter(|r| !r.is_empty());
    while let Some(record) = records.next() {
        let (Some(code), Some(path)) = (record.get(..2), record.get(3..)) else {
            return Err(anyhow!("unexpected porcelain record: '{record}'"));
        };
        if path.is_empty() || record.as_bytes()[2] != b' ' {
            return Err(anyhow!("unexpected porcelain record: '{record}'"));
        }
        if code.contains('R') || code.contains('C') {
            records.next();
        }
        entries.push(StatusEntry {
            code: code.to_string(),
            path: path.to_string(),
        });
    }
    Ok(entries)
}

/// Parse `owner/repo` out of a GitHub remote URL (https, ssh, or scp-like).
pub fn parse_github_remote(url: &str) -> Option<(String, String)> {
    let normalized = url.trim().trim_end_matches('/').trim_end_matches(".git");
    let path = if let Some(rest) = normalized.strip_prefix("git@") {
        rest.split_once(':')?.1
    } else if let Some(rest) = normalized
        .strip_prefix("https://")
        .or_else(|| normalized.strip_prefix("http://"))
        .or_else(|| normalized.strip_prefix("ssh://"))
    {
        // Skip `user[:pass]@host` or `host[:port]`.
        rest.split_once('/')?.1
    } else {
        return None;
    };

    let mut parts = path.split('/');
    let owner = parts.next()?.trim();
    let repo = parts.next()?.trim();
    if owner.is_empty() || repo.is_empty() || parts.next().is_some() {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}
