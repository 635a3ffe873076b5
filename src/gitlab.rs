//! Low-level client for the GitLab repository-files API.
//!
//! Files are addressed as `/api/v4/projects/{project}/repository/files/{path}`
//! with URL-encoded path segments; reads return base64-encoded content and
//! writes are create-or-update commits with a base64 body.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::store::StoreError;

/// Response body of a repository-files GET.
#[derive(Debug, Deserialize)]
struct FileResponse {
    content: String,
}

/// Thin HTTP client over the repository-files endpoints.
#[derive(Debug, Clone)]
pub struct GitLabClient {
    http: reqwest::Client,
    base_url: String,
}

impl GitLabClient {
    /// Create a client against an API host, e.g. `https://gitlab.com`.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to build HTTP client");
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn file_url(&self, project: &str, file_path: &str) -> String {
        format!(
            "{}/api/v4/projects/{}/repository/files/{}",
            self.base_url,
            urlencoding::encode(project),
            urlencoding::encode(file_path),
        )
    }

    /// Fetch a file's content at a branch. `Ok(None)` on 404.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-200/404 status, or
    /// undecodable content.
    pub async fn get_file(
        &self,
        project: &str,
        file_path: &str,
        branch: &str,
        token: &str,
    ) -> Result<Option<String>, StoreError> {
        let url = self.file_url(project, file_path);
        debug!(project = %project, path = %file_path, branch = %branch, "Fetching file");

        let response = self
            .http
            .get(&url)
            .query(&[("ref", branch)])
            .header("PRIVATE-TOKEN", token)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let body: FileResponse = response.json().await?;
                // GitLab wraps base64 payloads with newlines.
                let raw: String = body
                    .content
                    .chars()
                    .filter(|c| !c.is_ascii_whitespace())
                    .collect();
                let bytes = BASE64
                    .decode(raw.as_bytes())
                    .map_err(|e| StoreError::Decode(e.to_string()))?;
                let text =
                    String::from_utf8(bytes).map_err(|e| StoreError::Decode(e.to_string()))?;
                Ok(Some(text))
            }
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(StoreError::Api {
                operation: "get file",
                status: status.as_u16(),
            }),
        }
    }

    /// Create or update a file with a commit on the given branch.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-2xx status.
    pub async fn put_file(
        &self,
        project: &str,
        file_path: &str,
        branch: &str,
        token: &str,
        content: &str,
        commit_message: &str,
    ) -> Result<(), StoreError> {
        let url = self.file_url(project, file_path);
        debug!(project = %project, path = %file_path, branch = %branch, "Committing file");

        let body = serde_json::json!({
            "branch": branch,
            "content": BASE64.encode(content.as_bytes()),
            "commit_message": commit_message,
            "encoding": "base64",
        });

        let response = self
            .http
            .put(&url)
            .header("PRIVATE-TOKEN", token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(StoreError::Api {
                operation: "put file",
                status: status.as_u16(),
            })
        }
    }
}
