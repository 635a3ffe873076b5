use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Matches GitLab blob URLs: `https://host/{group/project}/-/blob/{branch}/{path}`.
static BLOB_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://[^/]+/([^/]+/[^/]+)/-/blob/([^/]+)/(.+)$")
        .expect("invalid blob URL regex")
});

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid target GitLab URL: {0}")]
    InvalidTargetUrl(String),
}

/// Lifecycle state of a scheduled post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Scheduled,
    Published,
    Error,
}

impl PostStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Published => "published",
            Self::Error => "error",
        }
    }
}

/// A scheduled publication request, as stored in the remote posts document.
///
/// Field names follow the external JSON document (camelCase), which is
/// written by other tools and must round-trip unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub description: String,
    pub link: String,
    pub guid: String,
    /// Naive local time when `timezone` is set, otherwise an absolute instant.
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    pub status: PostStatus,
    /// Blob URL of the destination feed file.
    pub gitlab_url: String,
    /// Credential scoped to the destination project.
    pub gitlab_token: String,
    /// Envelope fields, used only when the destination feed does not exist yet.
    pub feed_title: String,
    pub feed_description: String,
    pub feed_link: String,
}

/// A published post as recorded in the append-only archive document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedPost {
    pub id: String,
    pub title: String,
    pub description: String,
    pub link: String,
    pub guid: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// Publication instant, RFC 3339 UTC.
    pub published_at: String,
    /// Offset label of the post's zone at the scheduled date (human audit).
    pub utc_offset: String,
}

/// Parsed address of a destination feed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetLocation {
    pub project: String,
    pub branch: String,
    pub file_path: String,
}

impl TargetLocation {
    /// Parse a GitLab blob URL into its project, branch, and file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not match the blob URL shape.
    pub fn parse(url: &str) -> Result<Self, ModelError> {
        let caps = BLOB_URL
            .captures(url)
            .ok_or_else(|| ModelError::InvalidTargetUrl(url.to_string()))?;
        Ok(Self {
            project: caps[1].to_string(),
            branch: caps[2].to_string(),
            file_path: caps[3].to_string(),
        })
    }
}
