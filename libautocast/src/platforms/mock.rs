//! Mock publisher for testing
//!
//! A configurable [`Publisher`] that can succeed with a fixed or generated
//! remote id, fail with any `PlatformError`, panic, or wait before answering.
//! Behaviour can be switched while the mock is shared, which lets one test
//! drive the same post through a failed and then a successful publish.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{PlatformError, Result};
use crate::platforms::{Platform, PublishReceipt, PublishRequest, Publisher};

#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Succeed; `None` generates a fresh id per call
    Succeed(Option<String>),
    Fail(PlatformError),
    Panic,
}

#[derive(Debug, Default)]
struct MockState {
    requests: Vec<PublishRequest>,
}

pub struct MockPublisher {
    platform: Platform,
    configured: bool,
    delay: Duration,
    behavior: Mutex<MockBehavior>,
    state: Arc<Mutex<MockState>>,
}

impl MockPublisher {
    pub fn new(platform: Platform, behavior: MockBehavior) -> Self {
        Self {
            platform,
            configured: true,
            delay: Duration::ZERO,
            behavior: Mutex::new(behavior),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Publisher that always succeeds with generated ids
    pub fn success(platform: Platform) -> Self {
        Self::new(platform, MockBehavior::Succeed(None))
    }

    /// Publisher that always succeeds with `remote_id`
    pub fn with_remote_id(platform: Platform, remote_id: &str) -> Self {
        Self::new(platform, MockBehavior::Succeed(Some(remote_id.to_string())))
    }

    /// Publisher that always fails with `error`
    pub fn failure(platform: Platform, error: PlatformError) -> Self {
        Self::new(platform, MockBehavior::Fail(error))
    }

    /// Publisher that panics inside `publish`
    pub fn panicking(platform: Platform) -> Self {
        Self::new(platform, MockBehavior::Panic)
    }

    /// Publisher reporting missing credentials
    pub fn not_configured(platform: Platform) -> Self {
        let mut mock = Self::success(platform);
        mock.configured = false;
        mock
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Replace the behaviour for subsequent calls
    pub fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    /// Requests received so far, in call order
    pub fn requests(&self) -> Vec<PublishRequest> {
        self.state.lock().unwrap().requests.clone()
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn publish(&self, request: &PublishRequest) -> Result<PublishReceipt> {
        self.state.lock().unwrap().requests.push(request.clone());

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            MockBehavior::Succeed(remote_id) => Ok(PublishReceipt {
                remote_id: remote_id.unwrap_or_else(|| {
                    format!("mock-{}-{}", self.platform, uuid::Uuid::new_v4())
                }),
                message: Some(format!("Published to mock {}", self.platform)),
            }),
            MockBehavior::Fail(error) => Err(error.into()),
            MockBehavior::Panic => panic!("mock {} publisher panicked", self.platform),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AutocastError;

    fn request() -> PublishRequest {
        PublishRequest {
            platform: Platform::LinkedIn,
            content: "hello".to_string(),
            hashtags: vec![],
            media_url: None,
            video_script: None,
        }
    }

    #[tokio::test]
    async fn test_success_generates_unique_ids() {
        let mock = MockPublisher::success(Platform::LinkedIn);
        let first = mock.publish(&request()).await.unwrap();
        let second = mock.publish(&request()).await.unwrap();

        assert!(first.remote_id.starts_with("mock-linkedin-"));
        assert_ne!(first.remote_id, second.remote_id);
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_behavior_can_be_switched() {
        let mock = MockPublisher::failure(
            Platform::LinkedIn,
            PlatformError::Network("timeout".to_string()),
        );
        let err = mock.publish(&request()).await.unwrap_err();
        assert!(matches!(err, AutocastError::Platform(PlatformError::Network(_))));

        mock.set_behavior(MockBehavior::Succeed(Some("R1".to_string())));
        assert_eq!(mock.publish(&request()).await.unwrap().remote_id, "R1");
        assert_eq!(mock.requests().len(), 2);
    }

    #[test]
    fn test_not_configured() {
        assert!(!MockPublisher::not_configured(Platform::X).is_configured());
        assert!(MockPublisher::success(Platform::X).is_configured());
    }
}
