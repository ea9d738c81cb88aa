//! Git publishing: branch, stage, commit, push.
//!
//! Only runs once the working tree is known to have changes. Any failure is
//! fatal and nothing is rolled back; the caller logs what was left behind.

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info};

use crate::core::naming::{branch_base, branch_candidate, commit_message};
use crate::core::types::RunContext;
use crate::io::git::{Git, Identity};

const MAX_BRANCH_ATTEMPTS: u32 = 999;
const SHORT_SHA_LEN: usize = 8;

/// Inputs for [`publish_changes`].
#[derive(Debug, Clone)]
pub struct PublishRequest<'a> {
    pub remote: &'a str,
    pub branch_prefix: &'a str,
    /// Branch the pull request will target; never reused as the head.
    pub base_branch: &'a str,
    pub prompt: &'a str,
    pub context: &'a RunContext,
    pub identity: &'a Identity,
}

/// What was published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub branch: String,
    /// Paths included in the commit.
    pub files: Vec<String>,
}

/// How far publishing got before an error; used for partial-state logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishProgress {
    NothingDone,
    BranchCreated,
    Committed,
    Pushed,
}

/// Failure with the progress reached before it.
#[derive(Debug)]
pub struct PublishFailure {
    pub progress: PublishProgress,
    pub branch: Option<String>,
    pub error: anyhow::Error,
}

/// Create a branch, commit every change in the working tree, and push it.
pub fn publish_changes(
    git: &Git,
    request: &PublishRequest<'_>,
) -> Result<PublishOutcome, PublishFailure> {
    let fail = |progress, branch: Option<&str>, error| PublishFailure {
        progress,
        branch: branch.map(str::to_string),
        error,
    };

    let branch = generate_branch_name(git, request)
        .map_err(|e| fail(PublishProgress::NothingDone, None, e))?;

    git.checkout_new_branch(&branch)
        .with_context(|| format!("create branch {branch}"))
        .map_err(|e| fail(PublishProgress::NothingDone, Some(&branch), e))?;
    info!(branch = %branch, "created branch");

    let files = stage_and_commit(git, request)
        .map_err(|e| fail(PublishProgress::BranchCreated, Some(&branch), e))?;
    info!(branch = %branch, files = files.len(), "committed changes");

    git.push_branch(request.remote, &branch)
        .with_context(|| format!("push {branch} to {}", request.remote))
        .map_err(|e| fail(PublishProgress::Committed, Some(&branch), e))?;
    info!(branch = %branch, remote = request.remote, "pushed branch");

    Ok(PublishOutcome { branch, files })
}

fn stage_and_commit(git: &Git, request: &PublishRequest<'_>) -> Result<Vec<String>> {
    git.add_all().context("stage changes")?;
    let files = git.staged_paths().context("list staged changes")?;
    let committed = git
        .commit_staged(&commit_message(request.prompt), request.identity)
        .context("commit changes")?;
    if !committed {
        // Changes seen by status but nothing staged, e.g. only ignored files.
        return Err(anyhow!("nothing to commit after staging"));
    }
    Ok(files)
}

/// Deterministic branch name, made unique against local and remote branches.
fn generate_branch_name(git: &Git, request: &PublishRequest<'_>) -> Result<String> {
    let suffix = match request.context.run_suffix() {
        Some(suffix) => suffix,
        None => git
            .head_short_sha(SHORT_SHA_LEN)
            .context("read HEAD for branch suffix")?,
    };
    let base = branch_base(request.branch_prefix, request.prompt, &suffix);

    for attempt in 1..=MAX_BRANCH_ATTEMPTS {
        let candidate = branch_candidate(&base, attempt);
        if candidate == request.base_branch {
            continue;
        }
        if git.branch_exists(&candidate)? {
            debug!(branch = %candidate, "local branch exists");
            continue;
        }
        if git.remote_branch_exists(request.remote, &candidate)? {
            debug!(branch = %candidate, "remote branch exists");
            continue;
        }
        return Ok(candidate);
    }

    Err(anyhow!(
        "unable to generate unique branch name from base '{base}' (too many existing branches)"
    ))
}
