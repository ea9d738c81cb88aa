//! Orchestration for a single action run.
//!
//! Resolves inputs, runs the code generator, and publishes any resulting
//! changes as a pull request. Every step runs at most once and in order; the
//! first failure ends the run.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, anyhow};
use tracing::{error, info, warn};

use crate::core::inputs::{ActionInputs, RawInputs, resolve_inputs};
use crate::core::naming::subject_line;
use crate::core::provider::provider_env;
use crate::core::state::RunPhase;
use crate::core::types::{ActionOutputs, RunContext};
use crate::error::RunError;
use crate::io::codex::{CodeGenerator, GenerateRequest};
use crate::io::config::{ActionConfig, resolve_log_path};
use crate::io::git::{Git, Identity, parse_github_remote};
use crate::io::github::{PullRequestApi, PullRequestRequest};
use crate::io::outputs::OutputSink;
use crate::io::pr_body::{PrBodyInputs, render_pr_body};
use crate::publish::{PublishOutcome, PublishProgress, PublishRequest, publish_changes};

/// Everything a run needs besides its inputs and collaborators.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Repository checkout the generator edits.
    pub workdir: PathBuf,
    pub config: ActionConfig,
    pub context: RunContext,
}

/// Tracks the current phase and logs transitions.
struct PhaseTracker {
    phase: RunPhase,
}

impl PhaseTracker {
    fn new() -> Self {
        Self {
            phase: RunPhase::Idle,
        }
    }

    fn enter(&mut self, next: RunPhase) -> Result<(), RunError> {
        let advanced = self.phase.advance(next).map_err(RunError::Internal)?;
        info!(from = %self.phase, to = %next, "phase");
        self.phase = advanced;
        Ok(())
    }
}

/// Run the whole pipeline and write outputs on success.
///
/// `connect` builds the hosting API client from validated inputs; it is
/// called before the generator runs, so a bad token never costs a
/// generation.
pub fn run_action<G, P, F>(
    raw: RawInputs,
    options: &RunOptions,
    generator: &G,
    connect: F,
    outputs: &dyn OutputSink,
) -> Result<ActionOutputs, RunError>
where
    G: CodeGenerator,
    P: PullRequestApi,
    F: FnOnce(&ActionInputs, &RunContext) -> anyhow::Result<P>,
{
    let mut tracker = PhaseTracker::new();
    let result = run_phases(&mut tracker, raw, options, generator, connect, outputs)
        .and_then(|out| tracker.enter(RunPhase::Done).map(|()| out));
    match &result {
        Ok(out) => {
            info!(
                changes_detected = out.changes_detected,
                new_branch = %out.new_branch,
                pr_url = %out.pr_url,
                "run complete"
            );
        }
        Err(err) => {
            let failed_in = tracker.phase;
            if let Err(transition) = tracker.enter(RunPhase::Failed) {
                error!(phase = %failed_in, "{transition}");
            }
            error!(phase = %failed_in, "{err}");
        }
    }
    result
}

fn run_phases<G, P, F>(
    tracker: &mut PhaseTracker,
    raw: RawInputs,
    options: &RunOptions,
    generator: &G,
    connect: F,
    outputs: &dyn OutputSink,
) -> Result<ActionOutputs, RunError>
where
    G: CodeGenerator,
    P: PullRequestApi,
    F: FnOnce(&ActionInputs, &RunContext) -> anyhow::Result<P>,
{
    tracker.enter(RunPhase::Validating)?;
    let inputs = resolve_inputs(raw)?;
    let log_path = options
        .config
        .log_path
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .map(|p| resolve_log_path(&options.workdir, p))
        .transpose()
        .map_err(|e| RunError::Configuration(format!("{e:#}")))?;
    let pulls = connect(&inputs, &options.context)
        .map_err(|e| RunError::Configuration(format!("{e:#}")))?;
    let git = Git::new(&options.workdir);

    tracker.enter(RunPhase::Invoking)?;
    invoke_generator(generator, &inputs, options, log_path)?;

    let changes = git
        .status_porcelain()
        .context("inspect working tree")
        .map_err(RunError::Publish)?;
    if changes.is_empty() {
        tracker.enter(RunPhase::NoChanges)?;
        info!("no changes produced; nothing to publish");
        let result = ActionOutputs::no_changes();
        write_outputs(outputs, &result)?;
        return Ok(result);
    }
    info!(changed = changes.len(), "working tree has changes");

    tracker.enter(RunPhase::Publishing)?;
    let (owner, repo) = resolve_repository(&git, options).map_err(RunError::Publish)?;
    let identity = Identity {
        name: options.config.author.name.clone(),
        email: options.config.author.email.clone(),
    };
    let published = publish_changes(
        &git,
        &PublishRequest {
            remote: &options.config.remote,
            branch_prefix: &options.config.branch_prefix,
            base_branch: &inputs.branch_name,
            prompt: &inputs.prompt,
            context: &options.context,
            identity: &identity,
        },
    )
    .map_err(|failure| {
        log_partial_state(failure.progress, failure.branch.as_deref());
        RunError::Publish(failure.error)
    })?;

    tracker.enter(RunPhase::OpeningPr)?;
    let pr_url = open_pull_request(&pulls, &inputs, options, &owner, &repo, &published)
        .map_err(|e| {
            log_partial_state(PublishProgress::Pushed, Some(&published.branch));
            RunError::Publish(e)
        })?;

    let result = ActionOutputs {
        changes_detected: true,
        new_branch: published.branch,
        pr_url,
    };
    write_outputs(outputs, &result)?;
    Ok(result)
}

fn invoke_generator<G: CodeGenerator>(
    generator: &G,
    inputs: &ActionInputs,
    options: &RunOptions,
    log_path: Option<PathBuf>,
) -> Result<(), RunError> {
    let request = GenerateRequest {
        workdir: options.workdir.clone(),
        prompt: inputs.prompt.clone(),
        approval_mode: inputs.approval_mode,
        model: inputs.model.clone(),
        provider: inputs.provider.clone(),
        env: provider_env(
            &inputs.provider,
            &inputs.provider_api_key,
            inputs.provider_base_url.as_deref(),
        ),
        timeout: Duration::from_secs(options.config.timeout_secs),
        output_limit_bytes: options.config.output_limit_bytes,
        log_path,
    };

    let outcome = generator.generate(&request).map_err(RunError::Generation)?;
    if outcome.timed_out {
        return Err(RunError::Generation(anyhow!(
            "code generation timed out after {}s",
            options.config.timeout_secs
        )));
    }
    if !outcome.success() {
        let code = outcome
            .exit_code
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        let mut msg = format!("code generation exited with status {code}");
        if !outcome.stderr_tail.trim().is_empty() {
            msg.push_str(&format!(":\n{}", outcome.stderr_tail.trim()));
        }
        return Err(RunError::Generation(anyhow!(msg)));
    }
    Ok(())
}

/// `owner/repo` from the run context, else from the push remote's URL.
fn resolve_repository(git: &Git, options: &RunOptions) -> anyhow::Result<(String, String)> {
    if let Some(full) = options.context.repository.as_deref() {
        if let Some((owner, repo)) = full.split_once('/')
            && !owner.is_empty()
            && !repo.is_empty()
        {
            return Ok((owner.to_string(), repo.to_string()));
        }
        return Err(anyhow!("invalid repository '{full}' (expected owner/repo)"));
    }
    let url = git
        .remote_url(&options.config.remote)
        .context("read remote url")?;
    parse_github_remote(&url)
        .ok_or_else(|| anyhow!("cannot determine GitHub repository from remote url '{url}'"))
}

fn open_pull_request<P: PullRequestApi>(
    pulls: &P,
    inputs: &ActionInputs,
    options: &RunOptions,
    owner: &str,
    repo: &str,
    published: &PublishOutcome,
) -> anyhow::Result<String> {
    let run_url = options.context.run_url();
    let body = render_pr_body(
        &PrBodyInputs {
            inputs,
            files: &published.files,
            run_url: run_url.as_deref(),
        },
        options.config.pr.body_template.as_deref(),
    )?;
    let pr = pulls
        .open_pull_request(&PullRequestRequest {
            owner: owner.to_string(),
            repo: repo.to_string(),
            title: subject_line(&inputs.prompt),
            head: published.branch.clone(),
            base: inputs.branch_name.clone(),
            body,
            draft: options.config.pr.draft,
        })
        .context("open pull request")?;
    Ok(pr.html_url)
}

fn write_outputs(sink: &dyn OutputSink, outputs: &ActionOutputs) -> Result<(), RunError> {
    sink.write(outputs)
        .context("write outputs")
        .map_err(RunError::Publish)
}

fn log_partial_state(progress: PublishProgress, branch: Option<&str>) {
    let branch = branch.unwrap_or("<none>");
    match progress {
        PublishProgress::NothingDone => {}
        PublishProgress::BranchCreated => {
            warn!(branch, "local branch created but nothing committed")
        }
        PublishProgress::Committed => {
            warn!(branch, "commit exists locally but was not pushed")
        }
        PublishProgress::Pushed => {
            warn!(branch, "branch pushed but no pull request was opened")
        }
    }
}
