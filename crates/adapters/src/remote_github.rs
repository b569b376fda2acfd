//! GitHub remote: atomic multi-file commits, deletes, workflow dispatch

use async_trait::async_trait;
use autoblog_domain::{CommitReceipt, FileChange, RemoteError, RemoteStore};
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// Repository coordinates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_workflow")]
    pub workflow: String,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_workflow() -> String {
    "deep-research.yml".to_string()
}

/// GitHub REST client implementing the remote store port
pub struct GitHubRemote {
    client: Client,
    token: SecretString,
    base_url: String,
    config: GitHubConfig,
}

impl GitHubRemote {
    pub fn new(token: SecretString, config: GitHubConfig) -> Result<Self, RemoteError> {
        Self::with_base_url(token, "https://api.github.com".to_string(), config)
    }

    pub fn with_base_url(
        token: SecretString,
        base_url: String,
        config: GitHubConfig,
    ) -> Result<Self, RemoteError> {
        if config.owner.is_empty() || config.repo.is_empty() {
            return Err(RemoteError::Config(
                "GitHub owner and repo must be set".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("autoblog/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Config(e.to_string()))?;
        Ok(Self {
            client,
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
        })
    }

    fn repo_url(&self, suffix: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.base_url, self.config.owner, self.config.repo, suffix
        )
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(
                "Authorization",
                format!("Bearer {}", self.token.expose_secret()),
            )
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, RemoteError> {
        let response = self
            .authed(request)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(RemoteError::Auth(format!("{}: {}", status, body)))
            }
            _ => Err(RemoteError::Api(format!("{}: {}", status, body))),
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RemoteError> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Api(format!("Malformed response: {}", e)))
    }
}

#[derive(Deserialize)]
struct RefResponse {
    object: ShaObject,
}

#[derive(Deserialize)]
struct ShaObject {
    sha: String,
}

#[derive(Deserialize)]
struct ContentResponse {
    sha: String,
}

#[async_trait]
impl RemoteStore for GitHubRemote {
    async fn commit_files(
        &self,
        files: &[FileChange],
        message: &str,
    ) -> Result<CommitReceipt, RemoteError> {
        if files.is_empty() {
            return Ok(CommitReceipt { sha: None });
        }

        let branch_ref = format!("git/ref/heads/{}", self.config.branch);
        let head: RefResponse = self
            .send_json(self.client.get(self.repo_url(&branch_ref)))
            .await?;
        let base_sha = head.object.sha;

        let mut entries = Vec::with_capacity(files.len());
        for file in files {
            let blob: ShaObject = self
                .send_json(self.client.post(self.repo_url("git/blobs")).json(&json!({
                    "content": file.content,
                    "encoding": "utf-8"
                })))
                .await?;
            entries.push(json!({
                "path": file.path,
                "mode": "100644",
                "type": "blob",
                "sha": blob.sha
            }));
        }

        let base_tree: ShaObject = self
            .send_json(
                self.client
                    .get(self.repo_url(&format!("git/trees/{}", base_sha))),
            )
            .await?;

        let tree: ShaObject = self
            .send_json(self.client.post(self.repo_url("git/trees")).json(&json!({
                "base_tree": base_tree.sha,
                "tree": entries
            })))
            .await?;

        let commit: ShaObject = self
            .send_json(self.client.post(self.repo_url("git/commits")).json(&json!({
                "message": message,
                "tree": tree.sha,
                "parents": [base_sha]
            })))
            .await?;

        self.send(
            self.client
                .patch(self.repo_url(&format!("git/refs/heads/{}", self.config.branch)))
                .json(&json!({ "sha": commit.sha })),
        )
        .await?;

        tracing::info!(sha = %commit.sha, files = files.len(), "Committed to remote");
        Ok(CommitReceipt {
            sha: Some(commit.sha),
        })
    }

    async fn delete_file(&self, path: &str, message: &str) -> Result<(), RemoteError> {
        let url = self.repo_url(&format!("contents/{}", path.trim_start_matches('/')));

        let existing = match self
            .send_json::<ContentResponse>(
                self.client
                    .get(&url)
                    .query(&[("ref", self.config.branch.as_str())]),
            )
            .await
        {
            Ok(content) => content,
            Err(RemoteError::Api(message)) if message.starts_with("404") => {
                tracing::debug!(path = %path, "Remote file already absent");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        self.send(self.client.delete(&url).json(&json!({
            "message": message,
            "sha": existing.sha,
            "branch": self.config.branch
        })))
        .await?;

        Ok(())
    }

    async fn trigger_workflow(&self, topic: &str, typology: &str) -> Result<(), RemoteError> {
        let url = self.repo_url(&format!(
            "actions/workflows/{}/dispatches",
            self.config.workflow
        ));
        self.send(self.client.post(url).json(&json!({
            "ref": self.config.branch,
            "inputs": { "topic": topic, "typology": typology }
        })))
        .await?;

        tracing::info!(topic = %topic, typology = %typology, "Dispatched research workflow");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn remote(server: &MockServer) -> GitHubRemote {
        GitHubRemote::with_base_url(
            SecretString::new("gh-token".into()),
            server.uri(),
            GitHubConfig {
                owner: "acme".to_string(),
                repo: "site".to_string(),
                branch: default_branch(),
                workflow: default_workflow(),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_commit_files_flow() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/acme/site/git/ref/heads/main"))
            .and(header("Authorization", "Bearer gh-token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "object": { "sha": "base" } })),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/site/git/blobs"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": "blob1" })))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/site/git/trees/base"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sha": "tree0" })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/site/git/trees"))
            .and(body_partial_json(json!({ "base_tree": "tree0" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": "tree1" })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/site/git/commits"))
            .and(body_partial_json(json!({ "tree": "tree1", "parents": ["base"] })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": "commit1" })))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/repos/acme/site/git/refs/heads/main"))
            .and(body_partial_json(json!({ "sha": "commit1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let files = vec![
            FileChange {
                path: "content/posts/a.json".to_string(),
                content: "{}".to_string(),
            },
            FileChange {
                path: "content/posts/b.json".to_string(),
                content: "{}".to_string(),
            },
        ];
        let receipt = remote(&server).commit_files(&files, "Update").await.unwrap();
        assert_eq!(receipt.sha.as_deref(), Some("commit1"));
    }

    #[tokio::test]
    async fn test_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Bad credentials"))
            .mount(&server)
            .await;

        let files = vec![FileChange {
            path: "a".to_string(),
            content: "b".to_string(),
        }];
        let result = remote(&server).commit_files(&files, "m").await;
        assert!(matches!(result, Err(RemoteError::Auth(_))));
    }

    #[tokio::test]
    async fn test_delete_file_uses_current_sha() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/site/contents/content/posts/a.json"))
            .and(query_param("ref", "main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sha": "file-sha" })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/repos/acme/site/contents/content/posts/a.json"))
            .and(body_partial_json(json!({ "sha": "file-sha", "branch": "main" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        remote(&server)
            .delete_file("content/posts/a.json", "Delete a")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_missing_file_is_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&server)
            .await;

        remote(&server).delete_file("gone.json", "Delete").await.unwrap();
    }

    #[tokio::test]
    async fn test_trigger_workflow() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/site/actions/workflows/deep-research.yml/dispatches"))
            .and(body_partial_json(json!({
                "ref": "main",
                "inputs": { "topic": "Rust GATs", "typology": "deep_dive" }
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        remote(&server)
            .trigger_workflow("Rust GATs", "deep_dive")
            .await
            .unwrap();
    }
}
