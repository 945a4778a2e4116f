//! Core types for Autocast

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AutocastError, Result};
use crate::platforms::Platform;

/// Lifecycle of a topic
///
/// `Pending -> Generating -> Generated -> Posted`, with `Generating -> Pending`
/// as the rollback after a failed generation and `Generated -> Generating`
/// when more platforms are generated later. Any non-posted topic becomes
/// `Posted` once every post it owns has been published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicStatus {
    Pending,
    Generating,
    Generated,
    Posted,
}

impl TopicStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicStatus::Pending => "pending",
            TopicStatus::Generating => "generating",
            TopicStatus::Generated => "generated",
            TopicStatus::Posted => "posted",
        }
    }

    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: TopicStatus) -> bool {
        use TopicStatus::*;
        matches!(
            (self, next),
            (Pending, Generating)
                | (Generating, Generated)
                | (Generating, Pending)
                | (Generated, Generating)
                | (Pending, Posted)
                | (Generating, Posted)
                | (Generated, Posted)
        )
    }
}

impl fmt::Display for TopicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TopicStatus {
    type Err = AutocastError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(TopicStatus::Pending),
            "generating" => Ok(TopicStatus::Generating),
            "generated" => Ok(TopicStatus::Generated),
            "posted" => Ok(TopicStatus::Posted),
            other => Err(AutocastError::InvalidInput(format!(
                "Unknown topic status '{}'",
                other
            ))),
        }
    }
}

/// Lifecycle of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Approved,
    Scheduled,
    Posted,
}

impl PostStatus {
    /// Statuses in which a post counts as the active rendering of its (topic, platform) pair
    pub const ACTIVE: [PostStatus; 2] = [PostStatus::Draft, PostStatus::Approved];

    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Approved => "approved",
            PostStatus::Scheduled => "scheduled",
            PostStatus::Posted => "posted",
        }
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = AutocastError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "approved" => Ok(PostStatus::Approved),
            "scheduled" => Ok(PostStatus::Scheduled),
            "posted" => Ok(PostStatus::Posted),
            other => Err(AutocastError::InvalidInput(format!(
                "Unknown post status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TopicStatus,
    /// Target platforms, unique and non-empty
    pub platforms: Vec<Platform>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Data for creating a topic
#[derive(Debug, Clone)]
pub struct NewTopic {
    pub title: String,
    pub description: Option<String>,
    pub platforms: Vec<Platform>,
}

impl NewTopic {
    /// Platforms a topic targets when none are given
    pub const DEFAULT_PLATFORMS: [Platform; 4] = [
        Platform::LinkedIn,
        Platform::Facebook,
        Platform::Instagram,
        Platform::X,
    ];

    pub fn new(title: impl Into<String>, platforms: Vec<Platform>) -> Self {
        Self {
            title: title.into(),
            description: None,
            platforms,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check the title and platform set
    ///
    /// # Errors
    ///
    /// Returns `AutocastError::InvalidInput` for an empty title, an empty
    /// platform list or a duplicated platform.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(AutocastError::InvalidInput(
                "Topic title cannot be empty".to_string(),
            ));
        }
        validate_platform_set(&self.platforms)
    }
}

/// Reject empty or duplicated platform lists
pub fn validate_platform_set(platforms: &[Platform]) -> Result<()> {
    if platforms.is_empty() {
        return Err(AutocastError::InvalidInput(
            "At least one target platform is required".to_string(),
        ));
    }
    for (i, platform) in platforms.iter().enumerate() {
        if platforms[..i].contains(platform) {
            return Err(AutocastError::InvalidInput(format!(
                "Platform '{}' is listed more than once",
                platform
            )));
        }
    }
    Ok(())
}

/// Platform-assigned post ids, at most one populated per post
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePostIds {
    pub linkedin: Option<String>,
    pub facebook: Option<String>,
    pub instagram: Option<String>,
    pub x: Option<String>,
    pub tiktok: Option<String>,
}

impl RemotePostIds {
    pub fn get(&self, platform: Platform) -> Option<&str> {
        match platform {
            Platform::LinkedIn => self.linkedin.as_deref(),
            Platform::Facebook => self.facebook.as_deref(),
            Platform::Instagram => self.instagram.as_deref(),
            Platform::X => self.x.as_deref(),
            Platform::TikTok => self.tiktok.as_deref(),
        }
    }

    pub fn set(&mut self, platform: Platform, id: impl Into<String>) {
        let slot = match platform {
            Platform::LinkedIn => &mut self.linkedin,
            Platform::Facebook => &mut self.facebook,
            Platform::Instagram => &mut self.instagram,
            Platform::X => &mut self.x,
            Platform::TikTok => &mut self.tiktok,
        };
        *slot = Some(id.into());
    }

    /// Platforms with a non-empty id
    pub fn populated(&self) -> Vec<Platform> {
        Platform::ALL
            .into_iter()
            .filter(|p| self.get(*p).is_some_and(|id| !id.is_empty()))
            .collect()
    }
}

/// Engagement counters, never negative
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub views: u32,
    pub likes: u32,
    pub shares: u32,
    pub comments: u32,
    pub saves: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub topic_id: i64,
    pub platform: Platform,
    pub content: String,
    pub hashtags: Vec<String>,
    pub media_url: Option<String>,
    pub video_script: Option<String>,
    pub scheduled_time: Option<i64>,
    pub posted_at: Option<i64>,
    pub status: PostStatus,
    pub remote_ids: RemotePostIds,
    pub engagement: Engagement,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Post {
    /// Whether the post may be published at `now`
    pub fn is_due(&self, now: i64) -> bool {
        self.scheduled_time.is_none_or(|at| at <= now)
    }

    /// Remote id for the post's own platform
    pub fn remote_id(&self) -> Option<&str> {
        self.remote_ids.get(self.platform)
    }
}

/// Data for creating a post
#[derive(Debug, Clone)]
pub struct NewPost {
    pub topic_id: i64,
    pub platform: Platform,
    pub content: String,
    pub hashtags: Vec<String>,
    pub media_url: Option<String>,
    pub video_script: Option<String>,
    pub scheduled_time: Option<i64>,
    pub status: PostStatus,
}

impl NewPost {
    pub fn new(topic_id: i64, platform: Platform, content: impl Into<String>) -> Self {
        Self {
            topic_id,
            platform,
            content: content.into(),
            hashtags: Vec::new(),
            media_url: None,
            video_script: None,
            scheduled_time: None,
            status: PostStatus::Draft,
        }
    }

    pub fn with_status(mut self, status: PostStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_hashtags(mut self, hashtags: Vec<String>) -> Self {
        self.hashtags = hashtags;
        self
    }

    pub fn with_media_url(mut self, media_url: impl Into<String>) -> Self {
        self.media_url = Some(media_url.into());
        self
    }

    pub fn with_video_script(mut self, video_script: Option<String>) -> Self {
        self.video_script = video_script;
        self
    }

    pub fn with_scheduled_time(mut self, scheduled_time: i64) -> Self {
        self.scheduled_time = Some(scheduled_time);
        self
    }
}

/// Partial update of a post; `None` leaves a field untouched
///
/// Nested options distinguish "leave as is" (`None`) from "clear"
/// (`Some(None)`) for nullable columns.
#[derive(Debug, Clone, Default)]
pub struct PostPatch {
    pub content: Option<String>,
    pub hashtags: Option<Vec<String>>,
    pub media_url: Option<Option<String>>,
    pub video_script: Option<Option<String>>,
    pub scheduled_time: Option<Option<i64>>,
    pub status: Option<PostStatus>,
}

impl PostPatch {
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.hashtags.is_none()
            && self.media_url.is_none()
            && self.video_script.is_none()
            && self.scheduled_time.is_none()
            && self.status.is_none()
    }
}

/// Filter for listing posts; unset fields match everything
#[derive(Debug, Clone, Copy, Default)]
pub struct PostFilter {
    pub status: Option<PostStatus>,
    pub topic_id: Option<i64>,
    pub platform: Option<Platform>,
}

impl PostFilter {
    pub fn status(mut self, status: PostStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn topic(mut self, topic_id: i64) -> Self {
        self.topic_id = Some(topic_id);
        self
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }
}
