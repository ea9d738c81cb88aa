//! Pull-request body rendering.

use anyhow::{Context, Result};
use minijinja::{Environment, context};

use crate::core::inputs::ActionInputs;

const PR_BODY_TEMPLATE: &str = include_str!("templates/pr_body.md");

/// Values available to the body template.
#[derive(Debug, Clone)]
pub struct PrBodyInputs<'a> {
    pub inputs: &'a ActionInputs,
    pub files: &'a [String],
    pub run_url: Option<&'a str>,
}

/// Render the body with the built-in template, or `custom` when given.
pub fn render_pr_body(body: &PrBodyInputs<'_>, custom: Option<&str>) -> Result<String> {
    let mut env = Environment::new();
    let source = custom
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(PR_BODY_TEMPLATE);
    env.add_template("pr_body", source)
        .context("parse pr body template")?;
    let template = env.get_template("pr_body")?;
    let rendered = template
        .render(context! {
            prompt => body.inputs.prompt.trim(),
            model => &body.inputs.model,
            provider => body.inputs.provider.as_str(),
            approval_mode => body.inputs.approval_mode.as_str(),
            files => body.files,
            run_url => body.run_url,
        })
        .context("render pr body template")?;
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::inputs::{RawInputs, resolve_inputs};

    fn inputs() -> ActionInputs {
        resolve_inputs(RawInputs {
            github_token: Some("t".to_string()),
            provider_api_key: Some("k".to_string()),
            prompt: Some("add a LICENSE file".to_string()),
            ..RawInputs::default()
        })
        .expect("inputs")
    }

    #[test]
    fn default_template_lists_prompt_settings_and_files() {
        let inputs = inputs();
        let files = vec!["LICENSE".to_string(), "README.md".to_string()];
        let body = render_pr_body(
            &PrBodyInputs {
                inputs: &inputs,
                files: &files,
                run_url: Some("https://github.com/octo/widgets/actions/runs/1"),
            },
            None,
        )
        .expect("render");

        assert!(body.contains("add a LICENSE file"));
        assert!(body.contains("`o4-mini`"));
        assert!(body.contains("`openai`"));
        assert!(body.contains("`full-auto`"));
        assert!(body.contains("- `LICENSE`"));
        assert!(body.contains("- `README.md`"));
        assert!(body.contains("actions/runs/1"));
    }

    #[test]
    fn run_row_is_omitted_without_run_url() {
        let inputs = inputs();
        let body = render_pr_body(
            &PrBodyInputs {
                inputs: &inputs,
                files: &[],
                run_url: None,
            },
            None,
        )
        .expect("render");
        assert!(!body.contains("| Run |"));
    }

    #[test]
    fn custom_template_overrides_default() {
        let inputs = inputs();
        let body = render_pr_body(
            &PrBodyInputs {
                inputs: &inputs,
                files: &["LICENSE".to_string()],
                run_url: None,
            },
            Some("Prompt: {{ prompt }} ({{ files | length }} files)"),
        )
        .expect("render");
        assert_eq!(body, "Prompt: add a LICENSE file (1 files)");
    }

    #[test]
    fn invalid_custom_template_is_an_error() {
        let inputs = inputs();
        let err = render_pr_body(
            &PrBodyInputs {
                inputs: &inputs,
                files: &[],
                run_url: None,
            },
            Some("{% if %}"),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("parse pr body template"));
    }
}
