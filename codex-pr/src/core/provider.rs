//! Provider name → environment variables expected by the codex CLI.

use std::fmt;

/// AI backend selected by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    OpenRouter,
    Gemini,
    Ollama,
    Mistral,
    DeepSeek,
    Xai,
    Groq,
    /// `custom` or any unrecognized name, stored lowercase.
    Custom(String),
}

impl Provider {
    /// Parse a provider name. Never fails: unknown names become `Custom`.
    pub fn parse(name: &str) -> Self {
        let name = name.trim().to_ascii_lowercase();
        match name.as_str() {
            "openai" => Self::OpenAi,
            "openrouter" => Self::OpenRouter,
            "gemini" => Self::Gemini,
            "ollama" => Self::Ollama,
            "mistral" => Self::Mistral,
            "deepseek" => Self::DeepSeek,
            "xai" => Self::Xai,
            "groq" => Self::Groq,
            _ => Self::Custom(name),
        }
    }

    /// Name passed to the CLI's `--provider` flag.
    pub fn as_str(&self) -> &str {
        match self {
            Self::OpenAi => "openai",
            Self::OpenRouter => "openrouter",
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
            Self::Mistral => "mistral",
            Self::DeepSeek => "deepseek",
            Self::Xai => "xai",
            Self::Groq => "groq",
            Self::Custom(name) => name,
        }
    }

    /// Prefix shared by the API key and base URL variables.
    fn env_prefix(&self) -> String {
        match self {
            Self::OpenAi => "OPENAI".to_string(),
            Self::OpenRouter => "OPENROUTER".to_string(),
            Self::Gemini => "GEMINI".to_string(),
            Self::Ollama => "OLLAMA".to_string(),
            Self::Mistral => "MISTRAL".to_string(),
            Self::DeepSeek => "DEEPSEEK".to_string(),
            Self::Xai => "XAI".to_string(),
            Self::Groq => "GROQ".to_string(),
            Self::Custom(name) => derive_prefix(name),
        }
    }

    pub fn api_key_var(&self) -> String {
        format!("{}_API_KEY", self.env_prefix())
    }

    pub fn base_url_var(&self) -> String {
        format!("{}_BASE_URL", self.env_prefix())
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `my-llm.v2` → `MY_LLM_V2`.
fn derive_prefix(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Environment variables injected into the CLI subprocess.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderEnv {
    vars: Vec<(String, String)>,
}

impl ProviderEnv {
    pub fn vars(&self) -> &[(String, String)] {
        &self.vars
    }

    /// Variable names only; safe to log.
    pub fn names(&self) -> Vec<&str> {
        self.vars.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Debug for ProviderEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderEnv")
            .field("names", &self.names())
            .finish()
    }
}

/// Map a provider to its environment. The base URL variable is only set when
/// a base URL is provided. The key itself is not validated.
pub fn provider_env(provider: &Provider, api_key: &str, base_url: Option<&str>) -> ProviderEnv {
    let mut vars = vec![(provider.api_key_var(), api_key.to_string())];
    if let Some(url) = base_url.map(str::trim).filter(|u| !u.is_empty()) {
        vars.push((provider.base_url_var(), url.to_string()));
    }
    ProviderEnv { vars }
}
