//! Publish gateway
//!
//! Routes a [`PublishRequest`] to the publisher registered for its platform
//! and folds every possible failure (missing publisher, missing credentials,
//! unmet media requirement, platform error, even a panicking publisher) into
//! a [`PublishOutcome`]. Callers never see an `Err` from this module.

use futures::future::join_all;
use futures::FutureExt;
use serde::Serialize;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::platforms::facebook::FacebookPublisher;
use crate::platforms::instagram::InstagramPublisher;
use crate::platforms::linkedin::LinkedInPublisher;
use crate::platforms::tiktok::TikTokPublisher;
use crate::platforms::x::XPublisher;
use crate::platforms::{Platform, PublishRequest, Publisher, UNKNOWN_REMOTE_ID};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    Success,
    Error,
}

/// Normalized result of one publish attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishOutcome {
    pub platform: Platform,
    /// Platform-assigned id, present on success
    pub remote_id: Option<String>,
    pub status: PublishStatus,
    pub message: Option<String>,
}

impl PublishOutcome {
    pub fn success(platform: Platform, remote_id: String, message: Option<String>) -> Self {
        Self {
            platform,
            remote_id: Some(remote_id),
            status: PublishStatus::Success,
            message,
        }
    }

    pub fn error(platform: Platform, message: impl Into<String>) -> Self {
        Self {
            platform,
            remote_id: None,
            status: PublishStatus::Error,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == PublishStatus::Success
    }
}

#[derive(Clone, Default)]
pub struct PublishGateway {
    publishers: HashMap<Platform, Arc<dyn Publisher>>,
}

impl PublishGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build publishers for every platform with a credentials section
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut gateway = Self::new();

        if let Some(section) = &config.linkedin {
            gateway.register(Arc::new(LinkedInPublisher::new(section)?));
        }
        if let Some(section) = &config.facebook {
            gateway.register(Arc::new(FacebookPublisher::new(section)?));
        }
        if let Some(section) = &config.instagram {
            gateway.register(Arc::new(InstagramPublisher::new(section)?));
        }
        if let Some(section) = &config.x {
            gateway.register(Arc::new(XPublisher::new(section)?));
        }
        if let Some(section) = &config.tiktok {
            gateway.register(Arc::new(TikTokPublisher::new(section)?));
        }

        tracing::debug!(platforms = ?gateway.platforms(), "Publishers registered");
        Ok(gateway)
    }

    /// Add or replace the publisher for its platform
    pub fn register(&mut self, publisher: Arc<dyn Publisher>) {
        self.publishers.insert(publisher.platform(), publisher);
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.register(publisher);
        self
    }

    /// Platforms with a registered publisher, in registry order
    pub fn platforms(&self) -> Vec<Platform> {
        Platform::ALL
            .into_iter()
            .filter(|p| self.publishers.contains_key(p))
            .collect()
    }

    /// Publish one request; never fails
    pub async fn publish(&self, request: &PublishRequest) -> PublishOutcome {
        let platform = request.platform;
        let name = platform.spec().display_name;

        let Some(publisher) = self.publishers.get(&platform) else {
            return PublishOutcome::error(
                platform,
                format!("No publisher configured for {}", name),
            );
        };

        if !publisher.is_configured() {
            return PublishOutcome::error(
                platform,
                format!("{} credentials are not configured", name),
            );
        }

        if let Err(e) = platform.spec().check_request(request) {
            return PublishOutcome::error(platform, e.to_string());
        }

        match AssertUnwindSafe(publisher.publish(request))
            .catch_unwind()
            .await
        {
            Ok(Ok(receipt)) => {
                let remote_id = if receipt.remote_id.trim().is_empty() {
                    UNKNOWN_REMOTE_ID.to_string()
                } else {
                    receipt.remote_id
                };
                PublishOutcome::success(platform, remote_id, receipt.message)
            }
            Ok(Err(e)) => PublishOutcome::error(platform, e.to_string()),
            Err(_) => PublishOutcome::error(
                platform,
                format!("{} publisher panicked while publishing", name),
            ),
        }
    }

    /// Publish every request concurrently, one outcome per request in input order
    pub async fn publish_batch(&self, requests: &[PublishRequest]) -> Vec<PublishOutcome> {
        join_all(requests.iter().map(|request| self.publish(request))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FacebookConfig, XConfig};
    use crate::error::PlatformError;
    use crate::platforms::mock::MockPublisher;

    fn request(platform: Platform) -> PublishRequest {
        PublishRequest {
            platform,
            content: "Scheduling posts with tokio".to_string(),
            hashtags: vec!["rust".to_string()],
            media_url: None,
            video_script: None,
        }
    }

    #[tokio::test]
    async fn test_success_outcome() {
        let gateway = PublishGateway::new()
            .with_publisher(Arc::new(MockPublisher::with_remote_id(Platform::LinkedIn, "urn:1")));

        let outcome = gateway.publish(&request(Platform::LinkedIn)).await;
        assert!(outcome.is_success());
        assert_eq!(outcome.remote_id.as_deref(), Some("urn:1"));
        assert_eq!(outcome.platform, Platform::LinkedIn);
    }

    #[tokio::test]
    async fn test_platform_error_becomes_error_outcome() {
        let gateway = PublishGateway::new().with_publisher(Arc::new(MockPublisher::failure(
            Platform::X,
            PlatformError::RateLimit("slow down".to_string()),
        )));

        let outcome = gateway.publish(&request(Platform::X)).await;
        assert_eq!(outcome.status, PublishStatus::Error);
        assert!(outcome.remote_id.is_none());
        assert!(outcome.message.unwrap().contains("slow down"));
    }

    #[tokio::test]
    async fn test_missing_and_unconfigured_publishers() {
        let gateway = PublishGateway::new()
            .with_publisher(Arc::new(MockPublisher::not_configured(Platform::Facebook)));

        let missing = gateway.publish(&request(Platform::LinkedIn)).await;
        assert!(missing.message.unwrap().contains("No publisher configured for LinkedIn"));

        let unconfigured = gateway.publish(&request(Platform::Facebook)).await;
        assert!(unconfigured.message.unwrap().contains("credentials are not configured"));
    }

    #[tokio::test]
    async fn test_media_requirement_checked_before_dispatch() {
        let mock = Arc::new(MockPublisher::success(Platform::Instagram));
        let gateway = PublishGateway::new().with_publisher(mock.clone());

        let outcome = gateway.publish(&request(Platform::Instagram)).await;
        assert!(!outcome.is_success());
        assert!(outcome.message.unwrap().contains("image URL"));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_panicking_publisher_is_contained() {
        let gateway =
            PublishGateway::new().with_publisher(Arc::new(MockPublisher::panicking(Platform::X)));

        let outcome = gateway.publish(&request(Platform::X)).await;
        assert!(!outcome.is_success());
        assert!(outcome.message.unwrap().contains("panicked"));
    }

    #[tokio::test]
    async fn test_empty_remote_id_is_normalized() {
        let gateway = PublishGateway::new()
            .with_publisher(Arc::new(MockPublisher::with_remote_id(Platform::X, "")));

        let outcome = gateway.publish(&request(Platform::X)).await;
        assert_eq!(outcome.remote_id.as_deref(), Some(UNKNOWN_REMOTE_ID));
    }

    #[tokio::test]
    async fn test_batch_outcomes_are_independent() {
        let gateway = PublishGateway::new()
            .with_publisher(Arc::new(MockPublisher::success(Platform::LinkedIn)))
            .with_publisher(Arc::new(MockPublisher::panicking(Platform::X)));

        let requests = vec![
            request(Platform::LinkedIn),
            request(Platform::X),
            request(Platform::Facebook),
            request(Platform::LinkedIn),
        ];
        let outcomes = gateway.publish_batch(&requests).await;

        let statuses: Vec<bool> = outcomes.iter().map(PublishOutcome::is_success).collect();
        assert_eq!(statuses, vec![true, false, false, true]);
        let platforms: Vec<Platform> = outcomes.iter().map(|o| o.platform).collect();
        assert_eq!(
            platforms,
            vec![Platform::LinkedIn, Platform::X, Platform::Facebook, Platform::LinkedIn]
        );
    }

    #[test]
    fn test_from_config_registers_configured_sections() {
        let config = Config {
            facebook: Some(FacebookConfig {
                page_id: "1".to_string(),
                access_token: "t".to_string(),
            }),
            x: Some(XConfig {
                bearer_token: "b".to_string(),
            }),
            ..Config::default()
        };

        let gateway = PublishGateway::from_config(&config).unwrap();
        assert_eq!(gateway.platforms(), vec![Platform::Facebook, Platform::X]);
    }

    #[test]
    fn test_outcome_serializes_lowercase_status() {
        let outcome = PublishOutcome::error(Platform::TikTok, "nope");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["platform"], "tiktok");
    }
}
