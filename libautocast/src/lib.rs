//! Autocast - topic-to-post generation and scheduled publishing
//!
//! Topics go in, platform-specific posts come out. A generation cycle asks an
//! AI provider for one rendering per target platform, and a publish cycle
//! pushes due posts to LinkedIn, Facebook, Instagram, X and TikTok on a daily
//! schedule.

pub mod config;
pub mod db;
pub mod error;
pub mod generator;
pub mod logging;
pub mod platforms;
pub mod publisher;
pub mod scheduler;
pub mod scheduling;
pub mod service;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use error::{AutocastError, Result};
pub use generator::{ContentGenerator, GeneratedContent};
pub use platforms::Platform;
pub use publisher::{PublishGateway, PublishOutcome, PublishStatus};
pub use scheduler::Scheduler;
pub use service::{AutocastService, CycleOutcome};
pub use types::{NewPost, NewTopic, Post, PostFilter, PostStatus, Topic, TopicStatus};
