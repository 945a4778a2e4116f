//! TikTok publisher
//!
//! With a video URL the post goes through the Content Posting API using
//! `PULL_FROM_URL`. A post that only has a script cannot be uploaded; it is
//! accepted with a manual-upload placeholder id so the scheduler does not
//! retry it forever.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use crate::config::TikTokConfig;
use crate::error::{PlatformError, Result};
use crate::platforms::{
    append_hashtags, http_client, id_at, map_transport_error, read_json, truncate_chars, Platform,
    PublishReceipt, PublishRequest, Publisher, UNKNOWN_REMOTE_ID,
};

const API_BASE: &str = "https://open.tiktokapis.com/v2";
const TITLE_LIMIT: usize = 150;

pub struct TikTokPublisher {
    client: Client,
    access_token: SecretString,
    api_base: String,
}

impl TikTokPublisher {
    pub fn new(config: &TikTokConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(Platform::TikTok)?,
            access_token: SecretString::from(config.access_token.clone()),
            api_base: API_BASE.to_string(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    async fn publish_video(&self, title: &str, video_url: &str) -> Result<PublishReceipt> {
        let body = json!({
            "post_info": {
                "title": truncate_chars(title, TITLE_LIMIT),
                "privacy_level": "PUBLIC_TO_EVERYONE",
                "disable_duet": false,
                "disable_comment": false,
                "disable_stitch": false,
                "video_cover_timestamp_ms": 1000
            },
            "source_info": {
                "source": "PULL_FROM_URL",
                "video_url": video_url
            }
        });

        let response = self
            .client
            .post(format!("{}/post/publish/video/init/", self.api_base))
            .bearer_auth(self.access_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error(Platform::TikTok, e))?;

        let body = read_json(Platform::TikTok, response).await?;

        Ok(PublishReceipt {
            remote_id: id_at(&body, "/data/publish_id")
                .unwrap_or_else(|| UNKNOWN_REMOTE_ID.to_string()),
            message: Some("TikTok video submitted for publishing".to_string()),
        })
    }
}

fn manual_upload_id(now_ms: i64) -> String {
    format!("tiktok-manual-{}", now_ms)
}

#[async_trait]
impl Publisher for TikTokPublisher {
    fn platform(&self) -> Platform {
        Platform::TikTok
    }

    fn is_configured(&self) -> bool {
        !self.access_token.expose_secret().trim().is_empty()
    }

    async fn publish(&self, request: &PublishRequest) -> Result<PublishReceipt> {
        if !self.is_configured() {
            return Err(PlatformError::Authentication(
                "TikTok access token is not configured".to_string(),
            )
            .into());
        }

        let spec = Platform::TikTok.spec();
        spec.check_request(request)?;

        let title = append_hashtags(&request.content, spec.cap_hashtags(&request.hashtags));

        match request.media_url.as_deref().filter(|url| !url.trim().is_empty()) {
            Some(video_url) => self.publish_video(&title, video_url).await,
            None => {
                tracing::info!(
                    platform = %Platform::TikTok,
                    "No video URL, recording script for manual upload"
                );
                Ok(PublishReceipt {
                    remote_id: manual_upload_id(chrono::Utc::now().timestamp_millis()),
                    message: Some("TikTok post recorded; manual video upload required".to_string()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AutocastError;

    fn publisher() -> TikTokPublisher {
        TikTokPublisher::new(&TikTokConfig {
            access_token: "token".to_string(),
        })
        .unwrap()
    }

    fn request(media_url: Option<&str>, script: Option<&str>) -> PublishRequest {
        PublishRequest {
            platform: Platform::TikTok,
            content: "Profile first".to_string(),
            hashtags: vec!["perf".to_string()],
            media_url: media_url.map(str::to_string),
            video_script: script.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_script_only_returns_manual_placeholder() {
        let receipt = publisher()
            .publish(&request(None, Some("Hook: a\n\nMiddle: b\n\nCTA: c")))
            .await
            .unwrap();

        assert!(receipt.remote_id.starts_with("tiktok-manual-"));
        assert!(receipt.message.unwrap().contains("manual"));
    }

    #[tokio::test]
    async fn test_requires_video_or_script() {
        let err = publisher().publish(&request(None, None)).await.unwrap_err();
        assert!(matches!(
            err,
            AutocastError::Platform(PlatformError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_video_url_goes_to_api() {
        let publisher = publisher().with_api_base("http://127.0.0.1:9");
        let err = publisher
            .publish(&request(Some("https://cdn.example.com/clip.mp4"), None))
            .await
            .unwrap_err();
        assert!(matches!(err, AutocastError::Platform(PlatformError::Network(_))));
    }

    #[test]
    fn test_manual_upload_id() {
        assert_eq!(manual_upload_id(1_700_000_000_000), "tiktok-manual-1700000000000");
    }
}
