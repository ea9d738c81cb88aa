//! `codex-pr`: run the codex CLI against a checkout and open a pull request
//! with whatever it changed.
//!
//! Inputs come from flags or from the `INPUT_*` variables GitHub Actions sets
//! for action inputs.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use codex_pr::core::inputs::RawInputs;
use codex_pr::core::types::RunContext;
use codex_pr::error::RunError;
use codex_pr::exit_codes;
use codex_pr::io::codex::CodexCli;
use codex_pr::io::config::{DEFAULT_CONFIG_PATH, load_config};
use codex_pr::io::github::GithubClient;
use codex_pr::io::outputs::{format_error_annotation, sink_from_env};
use codex_pr::logging;
use codex_pr::pipeline::{RunOptions, run_action};
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "codex-pr",
    version,
    about = "Run codex against a checkout and open a pull request with the changes"
)]
struct Cli {
    /// Token for the pull-request API.
    #[arg(long, env = "INPUT_GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// API key for the AI provider.
    #[arg(long, env = "INPUT_PROVIDER_API_KEY", hide_env_values = true)]
    provider_api_key: Option<String>,

    /// Task description passed to codex.
    #[arg(long, env = "INPUT_PROMPT")]
    prompt: Option<String>,

    /// Base branch the pull request targets [default: main].
    #[arg(long, env = "INPUT_BRANCH_NAME")]
    branch_name: Option<String>,

    /// suggest, auto-edit, or full-auto [default: full-auto].
    #[arg(long, env = "INPUT_APPROVAL_MODE")]
    approval_mode: Option<String>,

    /// Model name [default: o4-mini].
    #[arg(long, env = "INPUT_MODEL")]
    model: Option<String>,

    /// Provider name [default: openai].
    #[arg(long, env = "INPUT_PROVIDER")]
    provider: Option<String>,

    /// Base URL for the provider API.
    #[arg(long, env = "INPUT_PROVIDER_BASE_URL")]
    provider_base_url: Option<String>,

    /// Repository checkout [default: $GITHUB_WORKSPACE or .].
    #[arg(long, env = "INPUT_WORKING_DIRECTORY")]
    working_directory: Option<PathBuf>,

    /// TOML config [default: <checkout>/.github/codex-pr.toml].
    #[arg(long, env = "CODEX_PR_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    fn raw_inputs(&self) -> RawInputs {
        RawInputs {
            github_token: self.github_token.clone(),
            provider_api_key: self.provider_api_key.clone(),
            prompt: self.prompt.clone(),
            branch_name: self.branch_name.clone(),
            approval_mode: self.approval_mode.clone(),
            model: self.model.clone(),
            provider: self.provider.clone(),
            provider_base_url: self.provider_base_url.clone(),
        }
    }

    fn workdir(&self) -> PathBuf {
        self.working_directory
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
            .or_else(|| std::env::var_os("GITHUB_WORKSPACE").map(PathBuf::from))
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    let code = match run(&cli) {
        Ok(()) => exit_codes::OK,
        Err(err) => {
            eprintln!("{err:#}");
            if std::env::var_os("GITHUB_ACTIONS").is_some() {
                println!("{}", format_error_annotation(&format!("{err:#}")));
            }
            err.downcast_ref::<RunError>()
                .map_or(exit_codes::INTERNAL, RunError::exit_code)
        }
    };
    std::process::exit(code);
}

fn run(cli: &Cli) -> Result<()> {
    let workdir = cli.workdir();
    if !workdir.is_dir() {
        return Err(RunError::Configuration(format!(
            "working directory {} does not exist",
            workdir.display()
        ))
        .into());
    }
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| workdir.join(DEFAULT_CONFIG_PATH));
    let config =
        load_config(&config_path).map_err(|e| RunError::Configuration(format!("{e:#}")))?;
    debug!(config = ?config, path = %config_path.display(), "loaded config");

    let options = RunOptions {
        workdir,
        context: RunContext::from_lookup(|name| std::env::var(name).ok()),
        config,
    };
    let generator = CodexCli::new(options.config.codex_bin.clone());
    let sink = sink_from_env();

    run_action(
        cli.raw_inputs(),
        &options,
        &generator,
        |inputs, ctx| GithubClient::new(&ctx.api_url, &inputs.github_token),
        sink.as_ref(),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_flags_into_raw_inputs() {
        let cli = Cli::parse_from([
            "codex-pr",
            "--github-token",
            "t",
            "--provider-api-key",
            "k",
            "--prompt",
            "add a LICENSE file",
            "--approval-mode",
            "suggest",
        ]);
        let raw = cli.raw_inputs();
        assert_eq!(raw.prompt.as_deref(), Some("add a LICENSE file"));
        assert_eq!(raw.approval_mode.as_deref(), Some("suggest"));
        assert_eq!(raw.model, None);
    }

    #[test]
    fn explicit_working_directory_wins() {
        let cli = Cli::parse_from(["codex-pr", "--working-directory", "/tmp/checkout"]);
        assert_eq!(cli.workdir(), PathBuf::from("/tmp/checkout"));
    }
}
