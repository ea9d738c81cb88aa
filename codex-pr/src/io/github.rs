//! Pull-request API abstraction and the GitHub REST implementation.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

const API_VERSION: &str = "2022-11-28";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Pull request to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestRequest {
    /// `owner` of the repository.
    #[serde(skip)]
    pub owner: String,
    /// `repo` name.
    #[serde(skip)]
    pub repo: String,
    pub title: String,
    /// Branch with the changes.
    pub head: String,
    /// Branch the pull request targets.
    pub base: String,
    pub body: String,
    pub draft: bool,
}

/// Opened pull request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub html_url: String,
}

/// Abstraction over source-hosting APIs.
pub trait PullRequestApi {
    fn open_pull_request(&self, request: &PullRequestRequest) -> Result<PullRequest>;
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

/// Blocking GitHub REST client.
pub struct GithubClient {
    api_url: String,
    client: Client,
}

impl GithubClient {
    /// `api_url` is the REST root, e.g. `https://api.github.com`.
    pub fn new(api_url: &str, token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .context("github token is not a valid header value")?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(API_VERSION),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("codex-pr/", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("build http client")?;

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn pulls_url(&self, owner: &str, repo: &str) -> String {
        format!("{}/repos/{owner}/{repo}/pulls", self.api_url)
    }
}

impl PullRequestApi for GithubClient {
    #[instrument(skip_all, fields(owner = %request.owner, repo = %request.repo, head = %request.head, base = %request.base))]
    fn open_pull_request(&self, request: &PullRequestRequest) -> Result<PullRequest> {
        let url = self.pulls_url(&request.owner, &request.repo);
        debug!(%url, "creating pull request");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .with_context(|| format!("POST {url}"))?;

        let status = response.status();
        let text = response.text().context("read pull request response")?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "pull request creation failed");
            return Err(api_error(status, &text));
        }

        let pr: PullRequest =
            serde_json::from_str(&text).context("parse pull request response")?;
        info!(number = pr.number, url = %pr.html_url, "pull request opened");
        Ok(pr)
    }
}

fn api_error(status: StatusCode, body: &str) -> anyhow::Error {
    let detail = match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => {
            let mut msg = parsed.message.unwrap_or_else(|| "no message".to_string());
            let details: Vec<String> = parsed
                .errors
                .iter()
                .filter_map(|e| e.get("message").and_then(|m| m.as_str()))
                .map(str::to_string)
                .collect();
            if !details.is_empty() {
                msg.push_str(&format!(" ({})", details.join("; ")));
            }
            msg
        }
        Err(_) => body.trim().chars().take(200).collect(),
    };
    anyhow!("GitHub API returned {status}: {detail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PullRequestRequest {
        PullRequestRequest {
            owner: "octo".to_string(),
            repo: "widgets".to_string(),
            title: "codex: add a LICENSE file".to_string(),
            head: "codex/add-a-license-file-1-1".to_string(),
            base: "main".to_string(),
            body: "body".to_string(),
            draft: false,
        }
    }

    #[test]
    fn pulls_url_trims_trailing_slash() {
        let client = GithubClient::new("https://api.github.com/", "t").expect("client");
        assert_eq!(
            client.pulls_url("octo", "widgets"),
            "https://api.github.com/repos/octo/widgets/pulls"
        );
    }

    #[test]
    fn request_body_omits_routing_fields() {
        let value = serde_json::to_value(request()).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({
                "title": "codex: add a LICENSE file",
                "head": "codex/add-a-license-file-1-1",
                "base": "main",
                "body": "body",
                "draft": false,
            })
        );
    }

    #[test]
    fn api_error_includes_message_and_details() {
        let body = r#"{"message":"Validation Failed","errors":[{"message":"A pull request already exists for octo:codex/x."}]}"#;
        let err = api_error(StatusCode::UNPROCESSABLE_ENTITY, body);
        let msg = err.to_string();
        assert!(msg.contains("422"));
        assert!(msg.contains("Validation Failed"));
        assert!(msg.contains("already exists"));
    }

    #[test]
    fn api_error_falls_back_to_raw_body() {
        let err = api_error(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert!(err.to_string().contains("bad gateway"));
    }

    #[test]
    fn rejects_token_with_newline() {
        assert!(GithubClient::new("https://api.github.com", "bad\ntoken").is_err());
    }
}
