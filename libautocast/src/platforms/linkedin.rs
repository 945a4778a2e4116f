//! LinkedIn publisher (UGC posts API)

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use crate::config::LinkedInConfig;
use crate::error::{PlatformError, Result};
use crate::platforms::{
    append_hashtags, check_status, http_client, id_at, map_transport_error, read_json, Platform,
    PublishReceipt, PublishRequest, Publisher, UNKNOWN_REMOTE_ID,
};

const API_BASE: &str = "https://api.linkedin.com/v2";

pub struct LinkedInPublisher {
    client: Client,
    access_token: SecretString,
    person_id: Option<String>,
    api_base: String,
}

impl LinkedInPublisher {
    pub fn new(config: &LinkedInConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(Platform::LinkedIn)?,
            access_token: SecretString::from(config.access_token.clone()),
            person_id: config.person_id.clone().filter(|id| !id.trim().is_empty()),
            api_base: API_BASE.to_string(),
        })
    }

    /// Point the publisher at a different API host
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Author URN, looking the member up through `/me` when no id is configured
    async fn author_urn(&self) -> std::result::Result<String, PlatformError> {
        if let Some(id) = &self.person_id {
            return Ok(format!("urn:li:person:{}", id));
        }

        let response = self
            .client
            .get(format!("{}/me", self.api_base))
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await
            .map_err(|e| map_transport_error(Platform::LinkedIn, e))?;

        let profile = read_json(Platform::LinkedIn, response).await?;
        let id = id_at(&profile, "/id").ok_or_else(|| {
            PlatformError::Authentication(
                "LinkedIn profile response did not include a member id".to_string(),
            )
        })?;

        Ok(format!("urn:li:person:{}", id))
    }
}

fn ugc_body(author: &str, text: &str) -> serde_json::Value {
    json!({
        "author": author,
        "lifecycleState": "PUBLISHED",
        "specificContent": {
            "com.linkedin.ugc.ShareContent": {
                "shareCommentary": { "text": text },
                "shareMediaCategory": "NONE"
            }
        },
        "visibility": {
            "com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC"
        }
    })
}

#[async_trait]
impl Publisher for LinkedInPublisher {
    fn platform(&self) -> Platform {
        Platform::LinkedIn
    }

    fn is_configured(&self) -> bool {
        !self.access_token.expose_secret().trim().is_empty()
    }

    async fn publish(&self, request: &PublishRequest) -> Result<PublishReceipt> {
        if !self.is_configured() {
            return Err(PlatformError::Authentication(
                "LinkedIn access token is not configured".to_string(),
            )
            .into());
        }

        let author = self.author_urn().await?;
        let text = append_hashtags(&request.content, &request.hashtags);

        let response = self
            .client
            .post(format!("{}/ugcPosts", self.api_base))
            .bearer_auth(self.access_token.expose_secret())
            .header("X-Restli-Protocol-Version", "2.0.0")
            .json(&ugc_body(&author, &text))
            .send()
            .await
            .map_err(|e| map_transport_error(Platform::LinkedIn, e))?;

        let response = check_status(Platform::LinkedIn, response).await?;
        // The created URN comes back in a header; older API versions put it in the body
        let header_id = response
            .headers()
            .get("x-restli-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = read_json(Platform::LinkedIn, response).await?;

        let remote_id = header_id
            .or_else(|| id_at(&body, "/id"))
            .unwrap_or_else(|| UNKNOWN_REMOTE_ID.to_string());

        Ok(PublishReceipt {
            remote_id,
            message: Some("Post published to LinkedIn".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AutocastError;

    fn publisher(token: &str, person_id: Option<&str>) -> LinkedInPublisher {
        LinkedInPublisher::new(&LinkedInConfig {
            access_token: token.to_string(),
            person_id: person_id.map(str::to_string),
        })
        .unwrap()
    }

    fn request() -> PublishRequest {
        PublishRequest {
            platform: Platform::LinkedIn,
            content: "Lessons from a year of Rust".to_string(),
            hashtags: vec!["Rust".to_string()],
            media_url: None,
            video_script: None,
        }
    }

    #[test]
    fn test_ugc_body_shape() {
        let body = ugc_body("urn:li:person:abc", "Hello\n\n#Rust");
        assert_eq!(body["author"], "urn:li:person:abc");
        assert_eq!(
            body["specificContent"]["com.linkedin.ugc.ShareContent"]["shareCommentary"]["text"],
            "Hello\n\n#Rust"
        );
        assert_eq!(
            body["visibility"]["com.linkedin.ugc.MemberNetworkVisibility"],
            "PUBLIC"
        );
    }

    #[test]
    fn test_is_configured() {
        assert!(publisher("token", None).is_configured());
        assert!(!publisher("  ", None).is_configured());
    }

    #[tokio::test]
    async fn test_configured_person_id_skips_lookup() {
        let publisher = publisher("token", Some("abc123"));
        assert_eq!(publisher.author_urn().await.unwrap(), "urn:li:person:abc123");
    }

    #[tokio::test]
    async fn test_publish_without_token_is_auth_error() {
        let err = publisher("", None).publish(&request()).await.unwrap_err();
        assert!(matches!(
            err,
            AutocastError::Platform(PlatformError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_api_is_network_error() {
        let publisher = publisher("token", Some("abc")).with_api_base("http://127.0.0.1:9");
        let err = publisher.publish(&request()).await.unwrap_err();
        assert!(matches!(err, AutocastError::Platform(PlatformError::Network(_))));
    }
}
