//! Test-only fixtures: scratch git repositories and scripted collaborators.

use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::core::types::ActionOutputs;
use crate::io::codex::{CodeGenerator, GenerateOutcome, GenerateRequest};
use crate::io::git::Git;
use crate::io::github::{PullRequest, PullRequestApi, PullRequestRequest};
use crate::io::outputs::OutputSink;

/// A working clone on `main` with one commit, pushed to a bare `origin`.
pub struct TestRepo {
    // Held for its Drop.
    _temp: TempDir,
    work: PathBuf,
    origin: PathBuf,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("tempdir")?;
        let work = temp.path().join("work");
        let origin = temp.path().join("origin.git");
        fs::create_dir_all(&work).context("create work dir")?;

        run_git(temp.path(), &["init", "-q", "--bare", "origin.git"])?;
        run_git(&origin, &["symbolic-ref", "HEAD", "refs/heads/main"])?;

        run_git(&work, &["init", "-q"])?;
        run_git(&work, &["symbolic-ref", "HEAD", "refs/heads/main"])?;
        fs::write(work.join("README.md"), "# widgets\n").context("write README")?;
        run_git(&work, &["add", "-A"])?;
        run_git(
            &work,
            &[
                "-c",
                "user.name=fixture",
                "-c",
                "user.email=fixture@example.com",
                "-c",
                "commit.gpgsign=false",
                "commit",
                "-q",
                "-m",
                "initial",
            ],
        )?;
        let origin_str = origin.to_string_lossy().to_string();
        run_git(&work, &["remote", "add", "origin", &origin_str])?;
        run_git(&work, &["push", "-q", "-u", "origin", "main"])?;

        Ok(Self {
            _temp: temp,
            work,
            origin,
        })
    }

    pub fn path(&self) -> &Path {
        &self.work
    }

    pub fn git(&self) -> Git {
        Git::new(&self.work)
    }

    pub fn write_file(&self, rel: &str, contents: &str) -> Result<()> {
        let path = self.work.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
    }

    /// Run git in the work tree, panicking on failure. Returns trimmed stdout.
    pub fn git_ok(&self, args: &[&str]) -> String {
        match run_git(&self.work, args) {
            Ok(out) => out,
            Err(err) => panic!("{err:#}"),
        }
    }

    pub fn current_branch(&self) -> String {
        self.git_ok(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    pub fn last_commit_message(&self) -> String {
        self.git_ok(&["log", "-1", "--pretty=%B"])
    }

    pub fn last_commit_author(&self) -> String {
        self.git_ok(&["log", "-1", "--pretty=%an <%ae>"])
    }

    /// Paths touched by the last commit.
    pub fn last_commit_files(&self) -> Vec<String> {
        self.git_ok(&["show", "--name-only", "--pretty=format:", "HEAD"])
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn commit_count(&self) -> usize {
        self.git_ok(&["rev-list", "--count", "--all"])
            .parse()
            .unwrap_or(0)
    }

    pub fn local_branches(&self) -> Vec<String> {
        self.git_ok(&["for-each-ref", "--format=%(refname:short)", "refs/heads"])
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn remote_has_branch(&self, branch: &str) -> bool {
        Command::new("git")
            .args(["show-ref", "--verify", "--quiet", &format!("refs/heads/{branch}")])
            .current_dir(&self.origin)
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Install a pre-receive hook on `origin` that rejects every push.
    #[cfg(unix)]
    pub fn reject_pushes(&self) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;
        let hook = self.origin.join("hooks").join("pre-receive");
        if let Some(parent) = hook.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&hook, "#!/bin/sh\necho 'pushes are disabled' >&2\nexit 1\n")?;
        let mut perms = fs::metadata(&hook)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&hook, perms)?;
        Ok(())
    }
}

fn run_git(dir: &Path, args: &[&str]) -> Result<String> {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .with_context(|| format!("spawn git {}", args.join(" ")))?;
    if !out.status.success() {
        return Err(anyhow!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&out.stderr).trim()
        ));
    }
    Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
}

/// What a scripted generator does on one call.
#[derive(Debug, Clone)]
pub enum ScriptedEdit {
    /// Write `(path, contents)` pairs into the workdir.
    Write(Vec<(String, String)>),
    /// Delete a tracked file.
    Remove(String),
    /// Leave the tree untouched.
    Nothing,
    /// Exit with a non-zero code without touching the tree.
    Fail(i32),
    /// Write the files, then report that the process was killed on timeout.
    TimedOut(Vec<(String, String)>),
}

/// Generator that applies a fixed edit instead of spawning a CLI.
pub struct ScriptedGenerator {
    edit: ScriptedEdit,
    calls: Cell<usize>,
    last_request: RefCell<Option<GenerateRequest>>,
}

impl ScriptedGenerator {
    pub fn new(edit: ScriptedEdit) -> Self {
        Self {
            edit,
            calls: Cell::new(0),
            last_request: RefCell::new(None),
        }
    }

    pub fn writing(path: &str, contents: &str) -> Self {
        Self::new(ScriptedEdit::Write(vec![(
            path.to_string(),
            contents.to_string(),
        )]))
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.last_request.borrow().clone()
    }
}

impl CodeGenerator for ScriptedGenerator {
    fn generate(&self, request: &GenerateRequest) -> Result<GenerateOutcome> {
        self.calls.set(self.calls.get() + 1);
        *self.last_request.borrow_mut() = Some(request.clone());
        match &self.edit {
            ScriptedEdit::Write(files) => write_files(&request.workdir, files)?,
            ScriptedEdit::Remove(rel) => fs::remove_file(request.workdir.join(rel))?,
            ScriptedEdit::Nothing => {}
            ScriptedEdit::Fail(code) => {
                return Ok(GenerateOutcome {
                    exit_code: Some(*code),
                    timed_out: false,
                    stderr_tail: "scripted failure".to_string(),
                });
            }
            ScriptedEdit::TimedOut(files) => {
                write_files(&request.workdir, files)?;
                return Ok(GenerateOutcome {
                    exit_code: None,
                    timed_out: true,
                    stderr_tail: String::new(),
                });
            }
        }
        Ok(GenerateOutcome::succeeded())
    }
}

fn write_files(workdir: &Path, files: &[(String, String)]) -> Result<()> {
    for (rel, contents) in files {
        let path = workdir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
    }
    Ok(())
}

/// Records pull-request requests and answers with a fixed URL, or an error.
pub struct RecordingPullRequests {
    fail_with: Option<String>,
    requests: RefCell<Vec<PullRequestRequest>>,
}

impl RecordingPullRequests {
    pub fn new() -> Self {
        Self {
            fail_with: None,
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<PullRequestRequest> {
        self.requests.borrow().clone()
    }
}

impl Default for RecordingPullRequests {
    fn default() -> Self {
        Self::new()
    }
}

impl PullRequestApi for RecordingPullRequests {
    fn open_pull_request(&self, request: &PullRequestRequest) -> Result<PullRequest> {
        self.requests.borrow_mut().push(request.clone());
        if let Some(message) = &self.fail_with {
            return Err(anyhow!("{message}"));
        }
        let number = self.requests.borrow().len() as u64;
        Ok(PullRequest {
            number,
            html_url: format!(
                "https://github.com/{}/{}/pull/{number}",
                request.owner, request.repo
            ),
        })
    }
}

impl PullRequestApi for &RecordingPullRequests {
    fn open_pull_request(&self, request: &PullRequestRequest) -> Result<PullRequest> {
        (**self).open_pull_request(request)
    }
}

/// Collects written outputs in memory.
#[derive(Default)]
pub struct MemoryOutputs {
    written: RefCell<Vec<ActionOutputs>>,
}

impl MemoryOutputs {
    pub fn written(&self) -> Vec<ActionOutputs> {
        self.written.borrow().clone()
    }
}

impl OutputSink for MemoryOutputs {
    fn write(&self, outputs: &ActionOutputs) -> Result<()> {
        self.written.borrow_mut().push(outputs.clone());
        Ok(())
    }
}
