//! Post store abstraction over the remote versioned document store.
//!
//! The workflow only sees the [`PostStore`] trait, so tests can substitute an
//! in-memory fake and an implementation could add optimistic concurrency
//! later without touching workflow logic. All writes are whole-document
//! overwrites; the store offers no locking or versioning.

use async_trait::async_trait;
use thiserror::Error;

use crate::gitlab::GitLabClient;
use crate::model::{ArchivedPost, Post, TargetLocation};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("store API returned status {status} on {operation}")]
    Api { operation: &'static str, status: u16 },
    #[error("failed to decode file content: {0}")]
    Decode(String),
    #[error("failed to parse stored document: {0}")]
    Document(#[from] serde_json::Error),
}

/// Read/write access to the scheduled-posts collection, destination feeds,
/// and the published-posts archive.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Load the scheduled-posts collection. A missing document is the
    /// expected first-run state and yields an empty list.
    async fn load_posts(&self) -> Result<Vec<Post>, StoreError>;

    /// Overwrite the scheduled-posts collection.
    async fn save_posts(&self, posts: &[Post], commit_message: &str) -> Result<(), StoreError>;

    /// Fetch current feed content at a target location. A missing file is
    /// empty content, not an error.
    async fn fetch_feed(&self, target: &TargetLocation, token: &str)
        -> Result<String, StoreError>;

    /// Overwrite feed content at a target location.
    async fn save_feed(
        &self,
        target: &TargetLocation,
        token: &str,
        content: &str,
        commit_message: &str,
    ) -> Result<(), StoreError>;

    /// Load the published-posts archive; missing document yields an empty list.
    async fn load_archive(&self) -> Result<Vec<ArchivedPost>, StoreError>;

    /// Overwrite the published-posts archive.
    async fn save_archive(&self, archive: &[ArchivedPost]) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: PostStore + ?Sized> PostStore for std::sync::Arc<T> {
    async fn load_posts(&self) -> Result<Vec<Post>, StoreError> {
        (**self).load_posts().await
    }

    async fn save_posts(&self, posts: &[Post], commit_message: &str) -> Result<(), StoreError> {
        (**self).save_posts(posts, commit_message).await
    }

    async fn fetch_feed(
        &self,
        target: &TargetLocation,
        token: &str,
    ) -> Result<String, StoreError> {
        (**self).fetch_feed(target, token).await
    }

    async fn save_feed(
        &self,
        target: &TargetLocation,
        token: &str,
        content: &str,
        commit_message: &str,
    ) -> Result<(), StoreError> {
        (**self).save_feed(target, token, content, commit_message).await
    }

    async fn load_archive(&self) -> Result<Vec<ArchivedPost>, StoreError> {
        (**self).load_archive().await
    }

    async fn save_archive(&self, archive: &[ArchivedPost]) -> Result<(), StoreError> {
        (**self).save_archive(archive).await
    }
}

/// GitLab-backed store: posts and archive live in one project, feeds in the
/// per-post target projects.
pub struct GitLabPostStore {
    client: GitLabClient,
    project: String,
    branch: String,
    posts_path: String,
    archive_path: String,
    token: String,
}

impl GitLabPostStore {
    #[must_use]
    pub fn new(
        client: GitLabClient,
        project: impl Into<String>,
        branch: impl Into<String>,
        posts_path: impl Into<String>,
        archive_path: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            project: project.into(),
            branch: branch.into(),
            posts_path: posts_path.into(),
            archive_path: archive_path.into(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl PostStore for GitLabPostStore {
    async fn load_posts(&self) -> Result<Vec<Post>, StoreError> {
        let content = self
            .client
            .get_file(&self.project, &self.posts_path, &self.branch, &self.token)
            .await?;
        match content {
            Some(text) => Ok(serde_json::from_str(&text)?),
            None => Ok(Vec::new()),
        }
    }

    async fn save_posts(&self, posts: &[Post], commit_message: &str) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(posts)?;
        self.client
            .put_file(
                &self.project,
                &self.posts_path,
                &self.branch,
                &self.token,
                &content,
                commit_message,
            )
            .await
    }

    async fn fetch_feed(
        &self,
        target: &TargetLocation,
        token: &str,
    ) -> Result<String, StoreError> {
        let content = self
            .client
            .get_file(&target.project, &target.file_path, &target.branch, token)
            .await?;
        Ok(content.unwrap_or_default())
    }

    async fn save_feed(
        &self,
        target: &TargetLocation,
        token: &str,
        content: &str,
        commit_message: &str,
    ) -> Result<(), StoreError> {
        self.client
            .put_file(
                &target.project,
                &target.file_path,
                &target.branch,
                token,
                content,
                commit_message,
            )
            .await
    }

    async fn load_archive(&self) -> Result<Vec<ArchivedPost>, StoreError> {
        let content = self
            .client
            .get_file(&self.project, &self.archive_path, &self.branch, &self.token)
            .await?;
        match content {
            Some(text) => Ok(serde_json::from_str(&text)?),
            None => Ok(Vec::new()),
        }
    }

    async fn save_archive(&self, archive: &[ArchivedPost]) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(archive)?;
        self.client
            .put_file(
                &self.project,
                &self.archive_path,
                &self.branch,
                &self.token,
                &content,
                "Archive published post",
            )
            .await
    }
}
