//! Publish cycle and per-post operations

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::events::{CycleKind, Event, EventBus};
use super::guard::CycleGuard;
use super::CycleOutcome;
use crate::db::Database;
use crate::error::{AutocastError, Result};
use crate::platforms::{Platform, PublishRequest, UNKNOWN_REMOTE_ID};
use crate::publisher::{PublishGateway, PublishOutcome};
use crate::scheduling::parse_schedule;
use crate::types::{Post, PostFilter, PostPatch, PostStatus, TopicStatus};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PublishReport {
    /// Post ids picked for this run, in publish order
    pub selected: Vec<i64>,
    pub published: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct PublishingService {
    db: Arc<Database>,
    gateway: Arc<PublishGateway>,
    events: EventBus,
    guard: CycleGuard,
    require_approval: bool,
    posts_per_day: u32,
}

impl PublishingService {
    pub fn new(
        db: Arc<Database>,
        gateway: Arc<PublishGateway>,
        events: EventBus,
        require_approval: bool,
        posts_per_day: u32,
    ) -> Self {
        Self {
            db,
            gateway,
            events,
            guard: CycleGuard::new(),
            require_approval,
            posts_per_day,
        }
    }

    pub fn is_running(&self) -> bool {
        self.guard.is_running()
    }

    /// Largest number of posts one platform may contribute to a run
    pub fn platform_share(&self) -> usize {
        (self.posts_per_day as usize).div_ceil(Platform::ALL.len())
    }

    /// Publish the posts that are due now, one at a time
    ///
    /// A failed publish leaves its post untouched and the run continues.
    pub async fn run_cycle(&self) -> CycleOutcome<PublishReport> {
        let Some(_token) = self.guard.try_enter() else {
            info!("Publish cycle already running, skipping");
            self.events.emit(Event::CycleSkipped {
                cycle: CycleKind::Publish,
            });
            return CycleOutcome::Skipped;
        };

        self.events.emit(Event::CycleStarted {
            cycle: CycleKind::Publish,
        });

        let posts = match self.select_due_posts(Utc::now().timestamp()).await {
            Ok(posts) => posts,
            Err(e) => {
                error!(error = %e, "Failed to select due posts");
                return CycleOutcome::Failed(e.to_string());
            }
        };

        info!(count = posts.len(), "Publish cycle started");
        let mut report = PublishReport {
            selected: posts.iter().map(|p| p.id).collect(),
            ..PublishReport::default()
        };

        for post in &posts {
            match self.publish_post(post).await {
                Ok(outcome) if outcome.is_success() => report.published += 1,
                Ok(_) => report.failed += 1,
                Err(e) => {
                    error!(post_id = post.id, error = %e, "Failed to record publish result");
                    report.failed += 1;
                }
            }
        }

        info!(
            published = report.published,
            failed = report.failed,
            "Publish cycle completed"
        );
        self.events.emit(Event::CycleCompleted {
            cycle: CycleKind::Publish,
            succeeded: report.published,
            failed: report.failed,
        });

        CycleOutcome::Completed(report)
    }

    /// Posts a publish run would pick at `now` (unix seconds)
    ///
    /// Approved posts first. Drafts are considered only when nothing approved
    /// is due and approval is not required.
    pub async fn select_due_posts(&self, now: i64) -> Result<Vec<Post>> {
        let selected = self.select_with_status(PostStatus::Approved, now).await?;
        if !selected.is_empty() || self.require_approval {
            return Ok(selected);
        }
        self.select_with_status(PostStatus::Draft, now).await
    }

    async fn select_with_status(&self, status: PostStatus, now: i64) -> Result<Vec<Post>> {
        let share = self.platform_share();
        let mut selected = Vec::new();

        for platform in Platform::ALL {
            let posts = self
                .db
                .list_posts(&PostFilter::default().status(status).platform(platform))
                .await?;
            selected.extend(posts.into_iter().filter(|p| p.is_due(now)).take(share));
        }

        selected.truncate(self.posts_per_day as usize);
        Ok(selected)
    }

    /// Publish one post and record the result
    ///
    /// A gateway error leaves the post as it was and is reported through the
    /// returned outcome. `Err` means the store could not be updated.
    pub async fn publish_post(&self, post: &Post) -> Result<PublishOutcome> {
        let outcome = self.gateway.publish(&PublishRequest::from_post(post)).await;

        if !outcome.is_success() {
            let message = outcome.message.clone().unwrap_or_default();
            warn!(
                post_id = post.id,
                platform = %post.platform,
                error = %message,
                "Publish failed, post stays queued"
            );
            self.events.emit(Event::PostPublishFailed {
                post_id: post.id,
                platform: post.platform,
                error: message,
            });
            return Ok(outcome);
        }

        let remote_id = outcome
            .remote_id
            .clone()
            .unwrap_or_else(|| UNKNOWN_REMOTE_ID.to_string());

        let marked = self
            .db
            .mark_post_posted(post.id, post.platform, &remote_id, Utc::now().timestamp())
            .await?;
        if !marked {
            warn!(post_id = post.id, "Post was already posted or removed");
            return Ok(outcome);
        }

        info!(post_id = post.id, platform = %post.platform, remote_id = %remote_id, "Post published");
        self.events.emit(Event::PostPublished {
            post_id: post.id,
            platform: post.platform,
            remote_id,
        });

        self.complete_topic_if_done(post.topic_id).await?;
        Ok(outcome)
    }

    /// Load a post and publish it now, ignoring its schedule
    ///
    /// # Errors
    ///
    /// Returns `AutocastError::InvalidInput` if the post does not exist or is
    /// already posted.
    pub async fn publish_post_by_id(&self, post_id: i64) -> Result<PublishOutcome> {
        let post = self.require_post(post_id).await?;
        if post.status == PostStatus::Posted {
            return Err(AutocastError::InvalidInput(format!(
                "Post {} is already posted",
                post_id
            )));
        }
        self.publish_post(&post).await
    }

    async fn complete_topic_if_done(&self, topic_id: i64) -> Result<()> {
        let remaining = self
            .db
            .count_posts_for_topic(topic_id, &[PostStatus::Posted])
            .await?;
        if remaining > 0 {
            return Ok(());
        }

        let Some(topic) = self.db.get_topic(topic_id).await? else {
            return Ok(());
        };
        match topic.status {
            TopicStatus::Posted => return Ok(()),
            // Generation is about to add posts; its own posts complete the topic later
            TopicStatus::Generating => {
                debug!(topic_id, "Topic is generating, not completing it yet");
                return Ok(());
            }
            TopicStatus::Pending | TopicStatus::Generated => {}
        }

        if self
            .db
            .compare_and_set_topic_status(topic_id, topic.status, TopicStatus::Posted)
            .await?
        {
            info!(topic_id, "All posts published, topic completed");
            self.events.emit(Event::TopicCompleted { topic_id });
        }
        Ok(())
    }

    /// Move a draft to approved; approving an approved post is a no-op
    pub async fn approve_post(&self, post_id: i64) -> Result<Post> {
        let post = self.require_post(post_id).await?;
        match post.status {
            PostStatus::Approved => Ok(post),
            PostStatus::Draft => {
                let patch = PostPatch {
                    status: Some(PostStatus::Approved),
                    ..PostPatch::default()
                };
                let post = self.db.update_post(post_id, &patch).await?;
                info!(post_id, "Post approved");
                Ok(post)
            }
            other => Err(AutocastError::InvalidInput(format!(
                "Post {} is {} and cannot be approved",
                post_id, other
            ))),
        }
    }

    /// Set the earliest publish time from an expression like `"in 2 hours"`
    /// or `"tomorrow 9am"`; `None` clears it
    pub async fn schedule_post(&self, post_id: i64, when: Option<&str>) -> Result<Post> {
        let post = self.require_post(post_id).await?;
        if post.status == PostStatus::Posted {
            return Err(AutocastError::InvalidInput(format!(
                "Post {} is already posted",
                post_id
            )));
        }

        let scheduled_time = when
            .map(|expr| parse_schedule(expr, Utc::now()).map(|at| at.timestamp()))
            .transpose()?;

        let patch = PostPatch {
            scheduled_time: Some(scheduled_time),
            ..PostPatch::default()
        };
        let post = self.db.update_post(post_id, &patch).await?;
        info!(post_id, scheduled_time = ?post.scheduled_time, "Post schedule updated");
        Ok(post)
    }

    async fn require_post(&self, post_id: i64) -> Result<Post> {
        self.db
            .get_post(post_id)
            .await?
            .ok_or_else(|| AutocastError::InvalidInput(format!("Post not found: {}", post_id)))
    }
}
