//! Shared records passed between pipeline steps.

const DEFAULT_API_URL: &str = "https://api.github.com";
const DEFAULT_SERVER_URL: &str = "https://github.com";

/// Outputs reported to the calling workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionOutputs {
    pub changes_detected: bool,
    /// Empty when no changes were detected.
    pub new_branch: String,
    /// Empty when no changes were detected.
    pub pr_url: String,
}

impl ActionOutputs {
    /// Outputs for a run that ended with a clean working tree.
    pub fn no_changes() -> Self {
        Self::default()
    }

    /// Output lines as `(name, value)` pairs in a stable order.
    pub fn pairs(&self) -> [(&'static str, String); 3] {
        [
            ("changes_detected", self.changes_detected.to_string()),
            ("new_branch", self.new_branch.clone()),
            ("pr_url", self.pr_url.clone()),
        ]
    }
}

/// CI run identifiers used for branch naming and API routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub run_id: Option<String>,
    pub run_attempt: Option<String>,
    /// `owner/repo`, when the CI provides it.
    pub repository: Option<String>,
    pub api_url: String,
    pub server_url: String,
}

impl Default for RunContext {
    fn default() -> Self {
        Self {
            run_id: None,
            run_attempt: None,
            repository: None,
            api_url: DEFAULT_API_URL.to_string(),
            server_url: DEFAULT_SERVER_URL.to_string(),
        }
    }
}

impl RunContext {
    /// Build a context from a variable lookup (normally the process env).
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            run_id: get("GITHUB_RUN_ID"),
            run_attempt: get("GITHUB_RUN_ATTEMPT"),
            repository: get("GITHUB_REPOSITORY"),
            api_url: get("GITHUB_API_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            server_url: get("GITHUB_SERVER_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
        }
    }

    /// Suffix that makes branch names unique per CI run, if running under CI.
    pub fn run_suffix(&self) -> Option<String> {
        let run_id = self.run_id.as_deref()?;
        Some(match self.run_attempt.as_deref() {
            Some(attempt) => format!("{run_id}-{attempt}"),
            None => run_id.to_string(),
        })
    }

    /// Link to the CI run page, when both repository and run id are known.
    pub fn run_url(&self) -> Option<String> {
        let repository = self.repository.as_deref()?;
        let run_id = self.run_id.as_deref()?;
        Some(format!(
            "{}/{repository}/actions/runs/{run_id}",
            self.server_url
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn context_defaults_without_ci_env() {
        let ctx = RunContext::from_lookup(lookup_from(&[]));
        assert_eq!(ctx, RunContext::default());
        assert_eq!(ctx.run_suffix(), None);
        assert_eq!(ctx.run_url(), None);
    }

    #[test]
    fn context_reads_ci_env_and_trims_urls() {
        let ctx = RunContext::from_lookup(lookup_from(&[
            ("GITHUB_RUN_ID", "12345"),
            ("GITHUB_RUN_ATTEMPT", "2"),
            ("GITHUB_REPOSITORY", "octo/widgets"),
            ("GITHUB_API_URL", "https://ghe.example.com/api/v3/"),
            ("GITHUB_SERVER_URL", "https://ghe.example.com"),
        ]));
        assert_eq!(ctx.run_suffix().as_deref(), Some("12345-2"));
        assert_eq!(ctx.api_url, "https://ghe.example.com/api/v3");
        assert_eq!(
            ctx.run_url().as_deref(),
            Some("https://ghe.example.com/octo/widgets/actions/runs/12345")
        );
    }

    #[test]
    fn blank_env_values_are_unset() {
        let ctx = RunContext::from_lookup(lookup_from(&[("GITHUB_RUN_ID", "  ")]));
        assert_eq!(ctx.run_id, None);
    }

    #[test]
    fn no_changes_outputs_are_empty() {
        let pairs = ActionOutputs::no_changes().pairs();
        assert_eq!(pairs[0], ("changes_detected", "false".to_string()));
        assert_eq!(pairs[1].1, "");
        assert_eq!(pairs[2].1, "");
    }
}
