//! Facebook page publisher (Graph API feed)

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::config::FacebookConfig;
use crate::error::{PlatformError, Result};
use crate::platforms::{
    append_hashtags, http_client, id_at, map_transport_error, read_json, Platform, PublishReceipt,
    PublishRequest, Publisher, UNKNOWN_REMOTE_ID,
};

pub(crate) const GRAPH_API_BASE: &str = "https://graph.facebook.com/v18.0";

pub struct FacebookPublisher {
    client: Client,
    page_id: String,
    access_token: SecretString,
    api_base: String,
}

#[derive(Serialize)]
struct FeedPost<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<&'a str>,
    access_token: &'a str,
}

impl FacebookPublisher {
    pub fn new(config: &FacebookConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(Platform::Facebook)?,
            page_id: config.page_id.trim().to_string(),
            access_token: SecretString::from(config.access_token.clone()),
            api_base: GRAPH_API_BASE.to_string(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[async_trait]
impl Publisher for FacebookPublisher {
    fn platform(&self) -> Platform {
        Platform::Facebook
    }

    fn is_configured(&self) -> bool {
        !self.page_id.is_empty() && !self.access_token.expose_secret().trim().is_empty()
    }

    async fn publish(&self, request: &PublishRequest) -> Result<PublishReceipt> {
        if !self.is_configured() {
            return Err(PlatformError::Authentication(
                "Facebook access token and page id are required".to_string(),
            )
            .into());
        }

        let message = append_hashtags(&request.content, &request.hashtags);
        let body = FeedPost {
            message: &message,
            link: request.media_url.as_deref(),
            access_token: self.access_token.expose_secret(),
        };

        let response = self
            .client
            .post(format!("{}/{}/feed", self.api_base, self.page_id))
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error(Platform::Facebook, e))?;

        let body = read_json(Platform::Facebook, response).await?;

        Ok(PublishReceipt {
            remote_id: id_at(&body, "/id").unwrap_or_else(|| UNKNOWN_REMOTE_ID.to_string()),
            message: Some("Post published to Facebook".to_string()),
        })
    }
}
