use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{ForgeError, Result};
use crate::types::{CreatePrRequest, PullRequest, RepoConfig};

const DEFAULT_BASE_URL: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("forgeflow/", env!("CARGO_PKG_VERSION"));

/// Pull-request creation on a GitHub-style forge.
#[async_trait]
pub trait ForgeApi: Send + Sync {
    async fn create_pull_request(
        &self,
        repo: &RepoConfig,
        request: CreatePrRequest,
    ) -> Result<PullRequest>;
}

/// REST client for the forge API. The base URL is injectable so tests and
/// self-hosted forges can point elsewhere; the token is passed through as
/// an opaque secret.
#[derive(Clone)]
pub struct ForgeClient {
    client: Client,
    token: String,
    base_url: String,
}

/// Error body shape returned by the forge on failure.
#[derive(Debug, Deserialize)]
struct ForgeErrorBody {
    message: String,
}

impl ForgeClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ForgeApi for ForgeClient {
    async fn create_pull_request(
        &self,
        repo: &RepoConfig,
        request: CreatePrRequest,
    ) -> Result<PullRequest> {
        info!(
            "Creating PR: {} ({} -> {})",
            request.title, request.head, request.base
        );

        let url = format!(
            "{}/repos/{}/{}/pulls",
            self.base_url, repo.owner, repo.repo
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ForgeErrorBody>(&error_text) {
                Ok(body) => body.message,
                Err(_) => error_text,
            };

            warn!("PR creation failed with {}: {}", status, message);

            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(ForgeError::Authentication(message));
            }

            return Err(ForgeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let pr: PullRequest = response.json().await?;
        debug!("Created PR #{} at {}", pr.number, pr.html_url);
        Ok(pr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ForgeClient {
        ForgeClient::with_base_url("test-token", server.uri())
    }

    #[tokio::test]
    async fn test_create_pull_request_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/owner/repo/pulls"))
            .and(header("Authorization", "Bearer test-token"))
            .and(body_partial_json(serde_json::json!({
                "title": "Add feature",
                "head": "feature/x",
                "base": "main"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "number": 42,
                "html_url": "https://github.com/owner/repo/pull/42",
                "title": "Add feature"
            })))
            .mount(&server)
            .await;

        let repo = RepoConfig::from_full_name("owner/repo").unwrap();
        let request = CreatePrRequest::new("Add feature", "feature/x", "main").with_body("body");

        let pr = client_for(&server)
            .create_pull_request(&repo, request)
            .await
            .unwrap();
        assert_eq!(pr.number, 42);
        assert_eq!(pr.html_url, "https://github.com/owner/repo/pull/42");
    }

    #[tokio::test]
    async fn test_unprocessable_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/owner/repo/pulls"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "message": "No commits between main and feature/x"
            })))
            .mount(&server)
            .await;

        let repo = RepoConfig::from_full_name("owner/repo").unwrap();
        let request = CreatePrRequest::new("t", "feature/x", "main");

        let err = client_for(&server)
            .create_pull_request(&repo, request)
            .await
            .unwrap_err();
        match err {
            ForgeError::Api { status, message } => {
                assert_eq!(status, 422);
                assert!(message.contains("No commits"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_authentication() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "message": "Bad credentials"
            })))
            .mount(&server)
            .await;

        let repo = RepoConfig::from_full_name("owner/repo").unwrap();
        let request = CreatePrRequest::new("t", "h", "b");

        let err = client_for(&server)
            .create_pull_request(&repo, request)
            .await
            .unwrap_err();
        assert!(matches!(err, ForgeError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_unparseable_error_body_falls_back_to_raw_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let repo = RepoConfig::from_full_name("owner/repo").unwrap();
        let request = CreatePrRequest::new("t", "h", "b");

        let err = client_for(&server)
            .create_pull_request(&repo, request)
            .await
            .unwrap_err();
        match err {
            ForgeError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "upstream exploded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
