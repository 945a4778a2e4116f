//! Instagram business account publisher
//!
//! Publishing is a two step Graph API exchange: create a media container for
//! the image and caption, then publish the container.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use super::facebook::GRAPH_API_BASE;
use crate::config::InstagramConfig;
use crate::error::{PlatformError, Result};
use crate::platforms::{
    append_hashtags, http_client, id_at, map_transport_error, read_json, Platform, PublishReceipt,
    PublishRequest, Publisher,
};

pub struct InstagramPublisher {
    client: Client,
    account_id: String,
    access_token: SecretString,
    api_base: String,
}

impl InstagramPublisher {
    pub fn new(config: &InstagramConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(Platform::Instagram)?,
            account_id: config.account_id.trim().to_string(),
            access_token: SecretString::from(config.access_token.clone()),
            api_base: GRAPH_API_BASE.to_string(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    async fn post_graph(
        &self,
        edge: &str,
        body: serde_json::Value,
    ) -> std::result::Result<serde_json::Value, PlatformError> {
        let response = self
            .client
            .post(format!("{}/{}/{}", self.api_base, self.account_id, edge))
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error(Platform::Instagram, e))?;

        read_json(Platform::Instagram, response).await
    }
}

fn caption(request: &PublishRequest) -> String {
    let spec = Platform::Instagram.spec();
    append_hashtags(&request.content, spec.cap_hashtags(&request.hashtags))
}

#[async_trait]
impl Publisher for InstagramPublisher {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    fn is_configured(&self) -> bool {
        !self.account_id.is_empty() && !self.access_token.expose_secret().trim().is_empty()
    }

    async fn publish(&self, request: &PublishRequest) -> Result<PublishReceipt> {
        if !self.is_configured() {
            return Err(PlatformError::Authentication(
                "Instagram access token and business account id are required".to_string(),
            )
            .into());
        }

        let image_url = request
            .media_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                PlatformError::Validation("Instagram posts require an image URL".to_string())
            })?;

        let token = self.access_token.expose_secret();
        let container = self
            .post_graph(
                "media",
                json!({
                    "image_url": image_url,
                    "caption": caption(request),
                    "access_token": token,
                }),
            )
            .await?;

        let container_id = id_at(&container, "/id").ok_or_else(|| {
            PlatformError::Posting("Instagram did not return a media container id".to_string())
        })?;
        tracing::debug!(container_id = %container_id, "Created Instagram media container");

        let published = self
            .post_graph(
                "media_publish",
                json!({
                    "creation_id": container_id,
                    "access_token": token,
                }),
            )
            .await?;

        Ok(PublishReceipt {
            remote_id: id_at(&published, "/id").unwrap_or(container_id),
            message: Some("Post published to Instagram".to_string()),
        })
    }
}
