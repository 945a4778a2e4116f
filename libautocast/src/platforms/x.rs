//! X (Twitter) publisher (API v2 tweets)

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use crate::config::XConfig;
use crate::error::{PlatformError, Result};
use crate::platforms::{
    hashtag_line, http_client, id_at, map_transport_error, read_json, truncate_chars, Platform,
    PublishReceipt, PublishRequest, Publisher, UNKNOWN_REMOTE_ID,
};

const API_BASE: &str = "https://api.twitter.com/2";

pub struct XPublisher {
    client: Client,
    bearer_token: SecretString,
    api_base: String,
}

impl XPublisher {
    pub fn new(config: &XConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(Platform::X)?,
            bearer_token: SecretString::from(config.bearer_token.clone()),
            api_base: API_BASE.to_string(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

/// Tweet text: content shortened so that it plus up to three hashtags fits
pub(crate) fn compose_tweet(content: &str, hashtags: &[String]) -> String {
    let spec = Platform::X.spec();
    let tags = spec.cap_hashtags(hashtags);
    if tags.is_empty() {
        return truncate_chars(content, spec.max_length);
    }

    let suffix = format!(" {}", hashtag_line(tags));
    let room = spec.max_length.saturating_sub(suffix.chars().count());
    format!("{}{}", truncate_chars(content, room), suffix)
}

#[async_trait]
impl Publisher for XPublisher {
    fn platform(&self) -> Platform {
        Platform::X
    }

    fn is_configured(&self) -> bool {
        !self.bearer_token.expose_secret().trim().is_empty()
    }

    async fn publish(&self, request: &PublishRequest) -> Result<PublishReceipt> {
        if !self.is_configured() {
            return Err(
                PlatformError::Authentication("X bearer token is not configured".to_string()).into(),
            );
        }

        let text = compose_tweet(&request.content, &request.hashtags);

        let response = self
            .client
            .post(format!("{}/tweets", self.api_base))
            .bearer_auth(self.bearer_token.expose_secret())
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(|e| map_transport_error(Platform::X, e))?;

        let body = read_json(Platform::X, response).await?;

        Ok(PublishReceipt {
            remote_id: id_at(&body, "/data/id").unwrap_or_else(|| UNKNOWN_REMOTE_ID.to_string()),
            message: Some("Tweet posted".to_string()),
        })
    }
}
