//! Generation cycle and on-demand topic generation

use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::events::{CycleKind, Event, EventBus};
use super::guard::CycleGuard;
use super::CycleOutcome;
use crate::db::Database;
use crate::error::{AutocastError, Result};
use crate::generator::{ContentGenerator, GeneratedContent};
use crate::platforms::Platform;
use crate::types::{
    validate_platform_set, NewPost, PostFilter, PostPatch, PostStatus, Topic, TopicStatus,
};

/// Pending topics handled per cycle run
pub const GENERATION_BATCH_LIMIT: usize = 10;

/// What generation did for one topic
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TopicGeneration {
    pub topic_id: i64,
    pub created: usize,
    pub updated: usize,
    /// Platforms that received fallback content
    pub degraded: Vec<Platform>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationReport {
    pub generated: Vec<TopicGeneration>,
    /// Pending topics with nothing left to generate
    pub skipped: Vec<i64>,
    /// Topics rolled back to pending
    pub failed: Vec<i64>,
}

enum Upsert {
    Created,
    Updated,
}

#[derive(Clone)]
pub struct GenerationService {
    db: Arc<Database>,
    generator: ContentGenerator,
    events: EventBus,
    guard: CycleGuard,
    require_approval: bool,
}

impl GenerationService {
    pub fn new(
        db: Arc<Database>,
        generator: ContentGenerator,
        events: EventBus,
        require_approval: bool,
    ) -> Self {
        Self {
            db,
            generator,
            events,
            guard: CycleGuard::new(),
            require_approval,
        }
    }

    /// Whether a cycle run is in progress
    pub fn is_running(&self) -> bool {
        self.guard.is_running()
    }

    fn new_post_status(&self) -> PostStatus {
        if self.require_approval {
            PostStatus::Draft
        } else {
            PostStatus::Approved
        }
    }

    /// Generate posts for the oldest pending topics
    ///
    /// Returns `Skipped` without touching the store when another run is in
    /// progress. A failing topic is rolled back to `pending` and the run
    /// moves on to the next one.
    pub async fn run_cycle(&self) -> CycleOutcome<GenerationReport> {
        let Some(_token) = self.guard.try_enter() else {
            info!("Generation cycle already running, skipping");
            self.events.emit(Event::CycleSkipped {
                cycle: CycleKind::Generation,
            });
            return CycleOutcome::Skipped;
        };

        self.events.emit(Event::CycleStarted {
            cycle: CycleKind::Generation,
        });

        let topics = match self
            .db
            .list_topics(Some(TopicStatus::Pending), Some(GENERATION_BATCH_LIMIT))
            .await
        {
            Ok(topics) => topics,
            Err(e) => {
                error!(error = %e, "Failed to load pending topics");
                return CycleOutcome::Failed(e.to_string());
            }
        };

        info!(count = topics.len(), "Generation cycle started");
        let mut report = GenerationReport::default();

        for topic in &topics {
            match self.generate_pending_topic(topic).await {
                Ok(Some(summary)) => report.generated.push(summary),
                Ok(None) => report.skipped.push(topic.id),
                Err(e) => {
                    error!(topic_id = topic.id, error = %e, "Generation failed for topic");
                    self.events.emit(Event::TopicGenerationFailed {
                        topic_id: topic.id,
                        error: e.to_string(),
                    });
                    report.failed.push(topic.id);
                }
            }
        }

        info!(
            generated = report.generated.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Generation cycle completed"
        );
        self.events.emit(Event::CycleCompleted {
            cycle: CycleKind::Generation,
            succeeded: report.generated.len(),
            failed: report.failed.len(),
        });

        CycleOutcome::Completed(report)
    }

    /// Target platforms of `topic` that have no post yet
    async fn missing_platforms(&self, topic: &Topic) -> Result<Vec<Platform>> {
        let existing = self
            .db
            .list_posts(&PostFilter::default().topic(topic.id))
            .await?;

        Ok(topic
            .platforms
            .iter()
            .copied()
            .filter(|platform| !existing.iter().any(|post| post.platform == *platform))
            .collect())
    }

    async fn generate_pending_topic(&self, topic: &Topic) -> Result<Option<TopicGeneration>> {
        let missing = self.missing_platforms(topic).await?;
        if missing.is_empty() {
            info!(topic_id = topic.id, "Topic has posts for every platform, skipping");
            return Ok(None);
        }

        if !self
            .db
            .compare_and_set_topic_status(topic.id, TopicStatus::Pending, TopicStatus::Generating)
            .await?
        {
            info!(topic_id = topic.id, "Topic left pending before generation, skipping");
            return Ok(None);
        }

        let summary = match self.generate_and_store(topic, &missing).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(topic_id = topic.id, "Rolling topic back to pending");
                if let Err(rollback) = self.release_topic(topic.id, TopicStatus::Pending).await {
                    error!(topic_id = topic.id, error = %rollback, "Failed to roll back topic");
                }
                return Err(e);
            }
        };
        self.release_topic(topic.id, TopicStatus::Generated).await?;
        self.emit_generated(&summary, &missing);

        Ok(Some(summary))
    }

    /// Generate for one topic now, outside the cycle
    ///
    /// `platforms` defaults to the topic's own list and must be a subset of
    /// it. Existing active posts are rewritten in place. On failure the topic
    /// returns to the status it had before.
    ///
    /// # Errors
    ///
    /// Returns `AutocastError::InvalidInput` if the topic does not exist, is
    /// generating or posted, or a requested platform is not targeted.
    pub async fn regenerate_topic(
        &self,
        topic_id: i64,
        platforms: Option<Vec<Platform>>,
    ) -> Result<TopicGeneration> {
        let topic = self.db.get_topic(topic_id).await?.ok_or_else(|| {
            AutocastError::InvalidInput(format!("Topic not found: {}", topic_id))
        })?;

        match topic.status {
            TopicStatus::Generating => {
                return Err(AutocastError::InvalidInput(format!(
                    "Topic {} is already generating",
                    topic_id
                )))
            }
            TopicStatus::Posted => {
                return Err(AutocastError::InvalidInput(format!(
                    "Topic {} is already posted",
                    topic_id
                )))
            }
            TopicStatus::Pending | TopicStatus::Generated => {}
        }

        let requested = platforms.unwrap_or_else(|| topic.platforms.clone());
        validate_platform_set(&requested)?;
        if let Some(extra) = requested.iter().find(|p| !topic.platforms.contains(p)) {
            return Err(AutocastError::InvalidInput(format!(
                "Topic {} does not target {}",
                topic_id, extra
            )));
        }

        let previous = topic.status;
        if !self
            .db
            .compare_and_set_topic_status(topic_id, previous, TopicStatus::Generating)
            .await?
        {
            return Err(AutocastError::InvalidInput(format!(
                "Topic {} changed status concurrently",
                topic_id
            )));
        }

        let result = async {
            let summary = self.generate_and_store(&topic, &requested).await?;
            self.release_topic(topic_id, TopicStatus::Generated).await?;
            Ok::<_, AutocastError>(summary)
        }
        .await;

        match result {
            Ok(summary) => {
                self.emit_generated(&summary, &requested);
                Ok(summary)
            }
            Err(e) => {
                warn!(topic_id, error = %e, "Regeneration failed, restoring {}", previous);
                if let Err(rollback) = self.release_topic(topic_id, previous).await {
                    error!(topic_id, error = %rollback, "Failed to restore topic status");
                }
                self.events.emit(Event::TopicGenerationFailed {
                    topic_id,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Move a topic this service claimed out of `generating`
    ///
    /// Only this service leaves `generating`, so a lost swap means the claim
    /// was broken and is reported as an error.
    async fn release_topic(&self, topic_id: i64, next: TopicStatus) -> Result<()> {
        if self
            .db
            .compare_and_set_topic_status(topic_id, TopicStatus::Generating, next)
            .await?
        {
            return Ok(());
        }
        Err(AutocastError::Scheduler(format!(
            "Topic {} left generating while it was claimed",
            topic_id
        )))
    }

    async fn generate_and_store(
        &self,
        topic: &Topic,
        platforms: &[Platform],
    ) -> Result<TopicGeneration> {
        let results = self
            .generator
            .generate(&topic.title, topic.description.as_deref(), platforms)
            .await?;

        let mut summary = TopicGeneration {
            topic_id: topic.id,
            ..TopicGeneration::default()
        };

        for result in &results {
            if result.is_fallback() {
                summary.degraded.push(result.platform);
            }
            match self.upsert_post(topic.id, result).await? {
                Upsert::Created => summary.created += 1,
                Upsert::Updated => summary.updated += 1,
            }
        }

        Ok(summary)
    }

    /// Rewrite the active post for (topic, platform) or create one
    async fn upsert_post(&self, topic_id: i64, result: &GeneratedContent) -> Result<Upsert> {
        let status = self.new_post_status();

        let existing = self
            .db
            .find_post_for_platform(topic_id, result.platform, &PostStatus::ACTIVE)
            .await?;

        if let Some(post) = existing {
            let patch = PostPatch {
                content: Some(result.content.clone()),
                hashtags: Some(result.hashtags.clone()),
                video_script: Some(result.video_script.clone()),
                status: Some(status),
                ..PostPatch::default()
            };
            self.db.update_post(post.id, &patch).await?;
            return Ok(Upsert::Updated);
        }

        let new_post = NewPost::new(topic_id, result.platform, result.content.clone())
            .with_status(status)
            .with_hashtags(result.hashtags.clone())
            .with_video_script(result.video_script.clone());
        self.db.create_post(&new_post).await?;
        Ok(Upsert::Created)
    }

    fn emit_generated(&self, summary: &TopicGeneration, platforms: &[Platform]) {
        if !summary.degraded.is_empty() {
            warn!(
                topic_id = summary.topic_id,
                degraded = ?summary.degraded,
                "Topic generated with fallback content"
            );
        }
        info!(
            topic_id = summary.topic_id,
            created = summary.created,
            updated = summary.updated,
            "Topic generated"
        );
        self.events.emit(Event::TopicGenerated {
            topic_id: summary.topic_id,
            platforms: platforms.to_vec(),
            degraded: summary.degraded.clone(),
        });
    }
}
