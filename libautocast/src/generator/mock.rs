//! Scripted AI provider for testing
//!
//! Replies and failures are chosen per platform by matching the platform's
//! prompt lead-in, so a single provider can serve a whole multi-platform
//! generation while failing only selected platforms.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use super::prompts::prompt_for;
use super::provider::{ProviderResult, TextProvider};
use crate::error::GenerationError;
use crate::platforms::Platform;

enum Rule {
    Reply(String),
    Fail(GenerationError),
}

pub struct MockProvider {
    default_reply: String,
    rules: Vec<(Platform, Rule)>,
    delay: Duration,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockProvider {
    /// Provider answering every prompt with `reply`
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            default_reply: reply.into(),
            rules: Vec::new(),
            delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Provider failing every platform
    pub fn failing(message: &str) -> Self {
        Platform::ALL
            .into_iter()
            .fold(Self::new(""), |mock, platform| mock.fail_for(platform, message))
    }

    /// Answer prompts for `platform` with `reply`
    pub fn reply_for(mut self, platform: Platform, reply: impl Into<String>) -> Self {
        self.rules.push((platform, Rule::Reply(reply.into())));
        self
    }

    /// Fail prompts for `platform` with a provider error
    pub fn fail_for(mut self, platform: Platform, message: &str) -> Self {
        self.rules.push((
            platform,
            Rule::Fail(GenerationError::Provider(message.to_string())),
        ));
        self
    }

    /// Wait before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, prompt: &str) -> ProviderResult<String> {
        self.calls.lock().unwrap().push(prompt.to_string());

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let rule = self
            .rules
            .iter()
            .rev()
            .find(|(platform, _)| prompt.contains(prompt_for(*platform).request));

        match rule {
            Some((_, Rule::Reply(reply))) => Ok(reply.clone()),
            Some((_, Rule::Fail(error))) => Err(error.clone()),
            None if self.default_reply.is_empty() => Err(GenerationError::EmptyResponse),
            None => Ok(self.default_reply.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::prompts::build_prompt;

    #[tokio::test]
    async fn test_rules_match_platform_prompts() {
        let mock = MockProvider::new("default")
            .reply_for(Platform::X, "tweet text")
            .fail_for(Platform::Facebook, "quota");

        let x = mock.complete(&build_prompt(Platform::X, "T", None)).await;
        assert_eq!(x.unwrap(), "tweet text");

        let fb = mock.complete(&build_prompt(Platform::Facebook, "T", None)).await;
        assert!(matches!(fb, Err(GenerationError::Provider(_))));

        let li = mock.complete(&build_prompt(Platform::LinkedIn, "T", None)).await;
        assert_eq!(li.unwrap(), "default");

        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_failing_provider() {
        let mock = MockProvider::failing("down");
        for platform in Platform::ALL {
            let prompt = build_prompt(platform, "T", None);
            assert!(mock.complete(&prompt).await.is_err());
        }
    }
}
