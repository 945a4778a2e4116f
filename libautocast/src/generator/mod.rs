//! Content generator gateway
//!
//! Fans one topic out to every requested platform concurrently. Each platform
//! gets its own prompt, and the reply is reduced to content that fits the
//! platform: hashtag-only lines removed, hashtags collected and capped,
//! length truncated with an ellipsis, and for TikTok a three-part script
//! extracted when the reply carries the section markers.
//!
//! A failing platform never fails the batch. Its slot is filled with
//! [`GeneratedContent::fallback`] and flagged so callers can log it.

use futures::future::join_all;
use std::sync::Arc;

use crate::error::{AutocastError, GenerationError, Result};
use crate::platforms::{truncate_chars, Platform};

pub mod mock;
pub mod parse;
pub mod prompts;
pub mod provider;

pub use provider::{create_provider, HelaGptProvider, OllamaProvider, TextProvider};

/// Generated rendering of a topic for one platform
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedContent {
    pub platform: Platform,
    pub content: String,
    pub hashtags: Vec<String>,
    pub video_script: Option<String>,
    /// Set when the provider failed and fallback text was substituted
    pub degraded: Option<String>,
}

impl GeneratedContent {
    /// Deterministic substitute used when generation for `platform` fails
    pub fn fallback(platform: Platform, title: &str, reason: &GenerationError) -> Self {
        let spec = platform.spec();
        let content = format!("Content about {} for {}", title.trim(), spec.display_name);

        Self {
            platform,
            content: truncate_chars(&content, spec.max_length),
            hashtags: spec.default_hashtag_list(),
            video_script: None,
            degraded: Some(reason.to_string()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.degraded.is_some()
    }
}

#[derive(Clone)]
pub struct ContentGenerator {
    provider: Arc<dyn TextProvider>,
}

impl ContentGenerator {
    pub fn new(provider: Arc<dyn TextProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Generate content for every platform in `platforms`
    ///
    /// The result has one entry per requested platform, in request order.
    ///
    /// # Errors
    ///
    /// Returns `AutocastError::InvalidInput` if `platforms` is empty or the
    /// title is blank. Provider failures never surface here.
    pub async fn generate(
        &self,
        title: &str,
        description: Option<&str>,
        platforms: &[Platform],
    ) -> Result<Vec<GeneratedContent>> {
        if platforms.is_empty() {
            return Err(AutocastError::InvalidInput(
                "At least one platform is required for generation".to_string(),
            ));
        }
        if title.trim().is_empty() {
            return Err(AutocastError::InvalidInput(
                "Topic title cannot be empty".to_string(),
            ));
        }

        let tasks = platforms.iter().map(|&platform| async move {
            match self.generate_for_platform(platform, title, description).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(
                        platform = %platform,
                        provider = self.provider.name(),
                        error = %e,
                        "Generation failed, using fallback content"
                    );
                    GeneratedContent::fallback(platform, title, &e)
                }
            }
        });

        Ok(join_all(tasks).await)
    }

    /// Generate content for a single platform, surfacing provider errors
    pub async fn generate_for_platform(
        &self,
        platform: Platform,
        title: &str,
        description: Option<&str>,
    ) -> std::result::Result<GeneratedContent, GenerationError> {
        let prompt = prompts::build_prompt(platform, title, description);
        tracing::debug!(platform = %platform, provider = self.provider.name(), "Requesting content");

        let raw = self.provider.complete(&prompt).await?;
        Ok(shape_reply(platform, &raw))
    }
}

/// Reduce a raw provider reply to platform-ready content
pub fn shape_reply(platform: Platform, raw: &str) -> GeneratedContent {
    let spec = platform.spec();

    let mut hashtags = parse::extract_hashtags(raw);
    if hashtags.is_empty() {
        hashtags = spec.default_hashtag_list();
    }
    let hashtags = spec.cap_hashtags(&hashtags).to_vec();

    let mut content = parse::strip_hashtag_lines(raw);
    let mut video_script = None;

    if spec.supports_script {
        if let Some((script, remaining)) = parse::extract_script(&content) {
            video_script = Some(script.render());
            content = remaining;
        }
    }

    GeneratedContent {
        platform,
        content: truncate_chars(content.trim(), spec.max_length),
        hashtags,
        video_script,
        degraded: None,
    }
}
