//! Publication workflow: one cycle of due-post detection and publishing.
//!
//! Per cycle: load the posts document, resolve due instants for scheduled
//! posts, then publish each due post sequentially. A failing post is marked
//! `error` with an immediate partial update (re-read, mutate, re-write) so a
//! crash cannot lose the marker; successful posts are removed from the
//! working collection and persisted in one batched write at the end. The
//! archive append after a publish is best-effort and never escalates.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::feed;
use crate::model::{ArchivedPost, Post, PostStatus, TargetLocation};
use crate::store::PostStore;
use crate::timing;

/// Counts from one completed cycle, for logging.
#[derive(Debug, Default, Clone, Copy)]
pub struct CycleSummary {
    pub scheduled: usize,
    pub due: usize,
    pub published: usize,
    pub errored: usize,
}

pub struct PublicationWorkflow<S> {
    store: S,
}

impl<S: PostStore> PublicationWorkflow<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run one publication cycle against the given wall-clock instant.
    ///
    /// # Errors
    ///
    /// Returns an error only when the posts document itself cannot be loaded
    /// or the final batched write fails; per-post failures are absorbed into
    /// the summary.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<CycleSummary> {
        let mut posts = self
            .store
            .load_posts()
            .await
            .context("Failed to load posts document")?;

        let mut summary = CycleSummary::default();
        let mut due: Vec<(Post, DateTime<Utc>)> = Vec::new();
        let mut unresolvable: Vec<String> = Vec::new();

        for post in posts.iter().filter(|p| p.status == PostStatus::Scheduled) {
            summary.scheduled += 1;
            match timing::resolve_instant(&post.date, post.timezone.as_deref()) {
                Ok(instant) if timing::is_due(instant, now) => {
                    due.push((post.clone(), instant));
                }
                Ok(instant) => {
                    let minutes = (instant - now).num_minutes();
                    debug!(post_id = %post.id, title = %post.title, minutes_left = minutes, "Post not due yet");
                }
                Err(e) => {
                    warn!(post_id = %post.id, title = %post.title, "Cannot resolve due time: {e}");
                    unresolvable.push(post.id.clone());
                }
            }
        }
        summary.due = due.len();
        debug!(scheduled = summary.scheduled, due = summary.due, "Cycle scan complete");

        for id in unresolvable {
            self.mark_error(&mut posts, &id, now).await;
            summary.errored += 1;
        }

        // Due posts are processed strictly in store order, one at a time;
        // a failure for one never aborts the rest.
        let mut removed_any = false;
        for (post, instant) in due {
            info!(post_id = %post.id, title = %post.title, "Publishing due post");
            match self.publish_post(&post, instant).await {
                Ok(()) => {
                    posts.retain(|p| p.id != post.id);
                    removed_any = true;
                    summary.published += 1;
                    info!(post_id = %post.id, title = %post.title, "Published");

                    if let Err(e) = self.append_archive(&post, now).await {
                        warn!(post_id = %post.id, "Archive append failed (ignored): {e:#}");
                    }
                }
                Err(e) => {
                    warn!(post_id = %post.id, title = %post.title, "Publish failed: {e:#}");
                    self.mark_error(&mut posts, &post.id, now).await;
                    summary.errored += 1;
                }
            }
        }

        // One batched write for all removals. Error markers were already
        // persisted individually, so a cycle without a publish skips this.
        if removed_any {
            let message = format!("Remove published posts - {}", now.to_rfc3339());
            self.store
                .save_posts(&posts, &message)
                .await
                .context("Failed to persist posts document after publishing")?;
        }

        Ok(summary)
    }

    /// Publish one post: parse its target, fetch the feed, append the entry,
    /// commit the new feed content.
    async fn publish_post(&self, post: &Post, instant: DateTime<Utc>) -> Result<()> {
        let target = TargetLocation::parse(&post.gitlab_url)?;

        let existing = self
            .store
            .fetch_feed(&target, &post.gitlab_token)
            .await
            .context("Failed to fetch current feed content")?;

        let content = feed::build_feed(&existing, post, instant, Utc::now())?;

        let message = format!("Publish: {}", post.title);
        self.store
            .save_feed(&target, &post.gitlab_token, &content, &message)
            .await
            .context("Failed to commit feed content")?;

        Ok(())
    }

    /// Mark a post `error` in the working collection and persist the marker
    /// immediately through a dedicated partial update. The update re-fetches
    /// the latest document rather than writing the stale working copy, to
    /// narrow the lost-update window. Persistence failures here are logged
    /// and absorbed; the next cycle will retry the post as `scheduled` only
    /// if the marker never landed anywhere.
    async fn mark_error(&self, working: &mut [Post], id: &str, now: DateTime<Utc>) {
        if let Some(post) = working.iter_mut().find(|p| p.id == id) {
            post.status = PostStatus::Error;
        }

        match self.store.load_posts().await {
            Ok(mut current) => {
                let Some(post) = current.iter_mut().find(|p| p.id == id) else {
                    warn!(post_id = %id, "Post vanished before error marker could be written");
                    return;
                };
                post.status = PostStatus::Error;
                let message = format!("Update post status - {}", now.to_rfc3339());
                if let Err(e) = self.store.save_posts(&current, &message).await {
                    warn!(post_id = %id, "Failed to persist error marker: {e}");
                }
            }
            Err(e) => warn!(post_id = %id, "Failed to re-load posts for error marker: {e}"),
        }
    }

    /// Append the published post to the archive document. Best-effort: the
    /// caller logs and swallows any failure, and nothing retries it this
    /// cycle.
    async fn append_archive(&self, post: &Post, now: DateTime<Utc>) -> Result<()> {
        let utc_offset = timing::utc_offset_label(&post.date, post.timezone.as_deref())
            .unwrap_or_else(|_| "+00:00".to_string());

        let mut archive = self
            .store
            .load_archive()
            .await
            .context("Failed to load archive document")?;

        archive.push(ArchivedPost {
            id: post.id.clone(),
            title: post.title.clone(),
            description: post.description.clone(),
            link: post.link.clone(),
            guid: post.guid.clone(),
            date: post.date.clone(),
            timezone: post.timezone.clone(),
            published_at: now.to_rfc3339(),
            utc_offset,
        });

        self.store
            .save_archive(&archive)
            .await
            .context("Failed to write archive document")?;

        Ok(())
    }
}
