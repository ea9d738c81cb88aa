//! Action input resolution: required fields, defaults, enum parsing.

use std::fmt;
use std::str::FromStr;

use crate::core::provider::Provider;
use crate::error::RunError;

pub const DEFAULT_BRANCH_NAME: &str = "main";
pub const DEFAULT_MODEL: &str = "o4-mini";

/// How autonomously the CLI applies edits. Semantics belong to the CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApprovalMode {
    Suggest,
    AutoEdit,
    #[default]
    FullAuto,
}

impl ApprovalMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Suggest => "suggest",
            Self::AutoEdit => "auto-edit",
            Self::FullAuto => "full-auto",
        }
    }
}

impl FromStr for ApprovalMode {
    type Err = RunError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "suggest" => Ok(Self::Suggest),
            "auto-edit" => Ok(Self::AutoEdit),
            "full-auto" => Ok(Self::FullAuto),
            other => Err(RunError::Configuration(format!(
                "invalid approval_mode '{other}' (expected suggest, auto-edit, or full-auto)"
            ))),
        }
    }
}

impl fmt::Display for ApprovalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs exactly as received. CI runners pass unset inputs as empty strings,
/// so every field is optional here.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RawInputs {
    pub github_token: Option<String>,
    pub provider_api_key: Option<String>,
    pub prompt: Option<String>,
    pub branch_name: Option<String>,
    pub approval_mode: Option<String>,
    pub model: Option<String>,
    pub provider: Option<String>,
    pub provider_base_url: Option<String>,
}

impl fmt::Debug for RawInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawInputs")
            .field("github_token", &self.github_token.as_ref().map(|_| "***"))
            .field(
                "provider_api_key",
                &self.provider_api_key.as_ref().map(|_| "***"),
            )
            .field("prompt", &self.prompt)
            .field("branch_name", &self.branch_name)
            .field("approval_mode", &self.approval_mode)
            .field("model", &self.model)
            .field("provider", &self.provider)
            .field("provider_base_url", &self.provider_base_url)
            .finish()
    }
}

/// Validated inputs with defaults applied.
#[derive(Clone, PartialEq, Eq)]
pub struct ActionInputs {
    pub github_token: String,
    pub provider_api_key: String,
    pub prompt: String,
    /// Base branch the pull request targets.
    pub branch_name: String,
    pub approval_mode: ApprovalMode,
    pub model: String,
    pub provider: Provider,
    pub provider_base_url: Option<String>,
}

impl fmt::Debug for ActionInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionInputs")
            .field("github_token", &"***")
            .field("provider_api_key", &"***")
            .field("prompt", &self.prompt)
            .field("branch_name", &self.branch_name)
            .field("approval_mode", &self.approval_mode)
            .field("model", &self.model)
            .field("provider", &self.provider)
            .field("provider_base_url", &self.provider_base_url)
            .finish()
    }
}

/// Validate required inputs and apply defaults.
///
/// Every missing required input is listed in a single error.
pub fn resolve_inputs(raw: RawInputs) -> Result<ActionInputs, RunError> {
    let github_token = present(raw.github_token);
    let provider_api_key = present(raw.provider_api_key);
    let prompt = present(raw.prompt);

    let mut missing = Vec::new();
    if github_token.is_none() {
        missing.push("github_token");
    }
    if provider_api_key.is_none() {
        missing.push("provider_api_key");
    }
    if prompt.is_none() {
        missing.push("prompt");
    }
    let (Some(github_token), Some(provider_api_key), Some(prompt)) =
        (github_token, provider_api_key, prompt)
    else {
        return Err(RunError::Configuration(format!(
            "missing required input(s): {}",
            missing.join(", ")
        )));
    };

    let approval_mode = match present(raw.approval_mode) {
        Some(mode) => mode.parse()?,
        None => ApprovalMode::default(),
    };
    let provider = present(raw.provider)
        .map(|name| Provider::parse(&name))
        .unwrap_or(Provider::OpenAi);

    Ok(ActionInputs {
        github_token: github_token.trim().to_string(),
        provider_api_key: provider_api_key.trim().to_string(),
        prompt,
        branch_name: present(raw.branch_name)
            .map(|b| b.trim().to_string())
            .unwrap_or_else(|| DEFAULT_BRANCH_NAME.to_string()),
        approval_mode,
        model: present(raw.model)
            .map(|m| m.trim().to_string())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        provider,
        provider_base_url: present(raw.provider_base_url).map(|u| u.trim().to_string()),
    })
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
