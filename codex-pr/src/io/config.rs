//! Optional TOML configuration, by default `.github/codex-pr.toml`.

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = ".github/codex-pr.toml";

/// Wrapper configuration (TOML).
///
/// Inputs that the workflow passes per run live in `ActionInputs`; this file
/// holds repository-level knobs. Missing fields take the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ActionConfig {
    /// Code-generation CLI to spawn.
    pub codex_bin: String,

    /// Wall-clock limit for the CLI in seconds.
    pub timeout_secs: u64,

    /// Keep at most this many bytes of CLI stdout/stderr in memory.
    pub output_limit_bytes: usize,

    /// Also copy CLI output to this file when set. Relative paths resolve
    /// against the checkout; the file must end up outside it.
    pub log_path: Option<String>,

    /// Git remote to push to.
    pub remote: String,

    /// Prefix for generated branch names.
    pub branch_prefix: String,

    pub author: AuthorConfig,

    pub pr: PrConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AuthorConfig {
    pub name: String,
    pub email: String,
}

impl Default for AuthorConfig {
    fn default() -> Self {
        Self {
            name: "github-actions[bot]".to_string(),
            email: "41898282+github-actions[bot]@users.noreply.github.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PrConfig {
    /// minijinja template overriding the built-in PR body.
    pub body_template: Option<String>,
    /// Open pull requests as drafts.
    pub draft: bool,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            codex_bin: "codex".to_string(),
            timeout_secs: 60 * 60,
            output_limit_bytes: 1_000_000,
            log_path: None,
            remote: "origin".to_string(),
            branch_prefix: "codex/".to_string(),
            author: AuthorConfig::default(),
            pr: PrConfig::default(),
        }
    }
}

impl ActionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.codex_bin.trim().is_empty() {
            return Err(anyhow!("codex_bin must be non-empty"));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.remote.trim().is_empty() {
            return Err(anyhow!("remote must be non-empty"));
        }
        if self.branch_prefix.chars().any(char::is_whitespace) {
            return Err(anyhow!("branch_prefix must not contain whitespace"));
        }
        if self.author.name.trim().is_empty() || self.author.email.trim().is_empty() {
            return Err(anyhow!("author.name and author.email must be non-empty"));
        }
        Ok(())
    }
}

/// Absolute location of `log_path` for a run in `workdir`.
///
/// Errors when the file would land inside the checkout, where it would be
/// picked up as a change.
pub fn resolve_log_path(workdir: &Path, log_path: &str) -> Result<PathBuf> {
    let root = workdir
        .canonicalize()
        .with_context(|| format!("resolve working directory {}", workdir.display()))?;
    let raw = Path::new(log_path.trim());
    let joined = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        root.join(raw)
    };
    let resolved = canonical_prefix(&normalize(&joined));
    if resolved.starts_with(&root) {
        return Err(anyhow!(
            "log_path {} is inside the checkout {}",
            resolved.display(),
            root.display()
        ));
    }
    Ok(resolved)
}

/// Lexically drop `.` and fold `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Canonicalize the deepest existing ancestor and re-append the rest.
fn canonical_prefix(path: &Path) -> PathBuf {
    let mut tail = Vec::new();
    let mut current = path;
    loop {
        if let Ok(canonical) = current.canonicalize() {
            return tail.iter().rev().fold(canonical, |acc, part| acc.join(part));
        }
        match (current.parent(), current.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                current = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ActionConfig::default()`.
pub fn load_config(path: &Path) -> Result<ActionConfig> {
    if !path.exists() {
        let cfg = ActionConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ActionConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, ActionConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("codex-pr.toml");
        fs::write(
            &path,
            "timeout_secs = 120\nbranch_prefix = \"bot/\"\n\n[pr]\ndraft = true\n",
        )
        .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.timeout_secs, 120);
        assert_eq!(cfg.branch_prefix, "bot/");
        assert!(cfg.pr.draft);
        assert_eq!(cfg.codex_bin, "codex");
        assert_eq!(cfg.author, AuthorConfig::default());
    }

    #[test]
    fn rejects_zero_timeout() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("codex-pr.toml");
        fs::write(&path, "timeout_secs = 0\n").expect("write");
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("timeout_secs"));
    }

    #[test]
    fn rejects_whitespace_in_branch_prefix() {
        let cfg = ActionConfig {
            branch_prefix: "my bot/".to_string(),
            ..ActionConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn relative_log_path_resolves_against_checkout() {
        let temp = tempfile::tempdir().expect("tempdir");
        let work = temp.path().join("work");
        fs::create_dir_all(&work).expect("mkdir");

        let resolved = resolve_log_path(&work, "../logs/codex.log").expect("resolve");
        let root = temp.path().canonicalize().expect("canonical");
        assert_eq!(resolved, root.join("logs").join("codex.log"));
    }

    #[test]
    fn log_path_inside_checkout_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = resolve_log_path(temp.path(), "codex.log").unwrap_err();
        assert!(format!("{err:#}").contains("inside the checkout"));

        let absolute = temp.path().join("nested").join("codex.log");
        let absolute = absolute.to_string_lossy();
        assert!(resolve_log_path(temp.path(), &absolute).is_err());
        assert!(resolve_log_path(temp.path(), "./sub/../codex.log").is_err());
    }
}
