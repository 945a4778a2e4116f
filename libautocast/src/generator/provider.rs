//! AI text providers
//!
//! Providers take a fully built prompt and return the model's raw reply.
//! Parsing the reply into content, hashtags and scripts happens in the
//! generator, so providers stay thin HTTP wrappers.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AiConfig, AiProviderKind};
use crate::error::{GenerationError, Result};

pub type ProviderResult<T> = std::result::Result<T, GenerationError>;

#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Short provider name used in logs
    fn name(&self) -> &str;

    /// Send `prompt` and return the raw reply text
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::Network` for transport failures,
    /// `GenerationError::Provider` for non-success responses and
    /// `GenerationError::EmptyResponse` when the reply has no text.
    async fn complete(&self, prompt: &str) -> ProviderResult<String>;
}

/// Build the provider selected in configuration
pub fn create_provider(config: &AiConfig) -> Result<Arc<dyn TextProvider>> {
    let provider: Arc<dyn TextProvider> = match config.provider {
        AiProviderKind::HelaGpt => Arc::new(HelaGptProvider::new(
            config.helagpt_url.clone(),
            config.helagpt_timeout()?,
        )?),
        AiProviderKind::Ollama => Arc::new(OllamaProvider::new(
            config.ollama_url.clone(),
            config.ollama_model.clone(),
            config.ollama_timeout()?,
        )?),
    };
    Ok(provider)
}

fn build_client(timeout: Duration) -> ProviderResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| GenerationError::Provider(format!("Failed to build HTTP client: {}", e)))
}

async fn post_json<B: Serialize + Sync>(
    client: &Client,
    provider: &str,
    url: &str,
    body: &B,
) -> ProviderResult<serde_json::Value> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| GenerationError::Network(format!("{} request failed: {}", provider, e)))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| GenerationError::Network(format!("Failed to read {} response: {}", provider, e)))?;

    if !status.is_success() {
        return Err(GenerationError::Provider(format!(
            "{} returned HTTP {}: {}",
            provider,
            status.as_u16(),
            text.trim()
        )));
    }

    serde_json::from_str(&text)
        .map_err(|e| GenerationError::Provider(format!("{} returned invalid JSON: {}", provider, e)))
}

fn non_empty(value: Option<&serde_json::Value>) -> Option<&str> {
    value
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// HelaGPT chat endpoint
pub struct HelaGptProvider {
    client: Client,
    url: String,
}

#[derive(Serialize)]
struct HelaGptRequest<'a> {
    message: &'a str,
}

impl HelaGptProvider {
    pub fn new(url: impl Into<String>, timeout: Duration) -> ProviderResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            url: url.into(),
        })
    }

    /// Reply text: `response`, else `message`, else the raw JSON body
    fn reply_text(body: &serde_json::Value) -> String {
        non_empty(body.get("response"))
            .or_else(|| non_empty(body.get("message")))
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string())
    }
}

#[async_trait]
impl TextProvider for HelaGptProvider {
    fn name(&self) -> &str {
        "helagpt"
    }

    async fn complete(&self, prompt: &str) -> ProviderResult<String> {
        let body = post_json(
            &self.client,
            "HelaGPT",
            &self.url,
            &HelaGptRequest { message: prompt },
        )
        .await?;

        let reply = Self::reply_text(&body);
        if reply.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(reply)
    }
}

/// Ollama generate endpoint, non-streaming
pub struct OllamaProvider {
    client: Client,
    url: String,
    model: String,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

impl OllamaProvider {
    pub fn new(
        url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            url: url.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl TextProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, prompt: &str) -> ProviderResult<String> {
        let request = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
        };
        let body = post_json(&self.client, "Ollama", &self.url, &request).await?;

        non_empty(body.get("response"))
            .map(str::to_string)
            .ok_or(GenerationError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_helagpt_reply_precedence() {
        let body = json!({"response": "from response", "message": "from message"});
        assert_eq!(HelaGptProvider::reply_text(&body), "from response");

        let body = json!({"response": "", "message": "from message"});
        assert_eq!(HelaGptProvider::reply_text(&body), "from message");

        let body = json!({"text": "other shape"});
        assert_eq!(HelaGptProvider::reply_text(&body), r#"{"text":"other shape"}"#);
    }

    #[test]
    fn test_create_provider_selects_kind() {
        let mut config = AiConfig::default();
        assert_eq!(create_provider(&config).unwrap().name(), "helagpt");

        config.provider = AiProviderKind::Ollama;
        assert_eq!(create_provider(&config).unwrap().name(), "ollama");
    }

    #[test]
    fn test_create_provider_rejects_bad_timeout() {
        let config = AiConfig {
            ollama_timeout: "never".to_string(),
            provider: AiProviderKind::Ollama,
            ..AiConfig::default()
        };
        assert!(create_provider(&config).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_network_error() {
        // Port 9 (discard) is closed on test machines
        let provider =
            OllamaProvider::new("http://127.0.0.1:9/api/generate", "mistral", Duration::from_secs(2))
                .unwrap();
        let err = provider.complete("hello").await.unwrap_err();
        assert!(matches!(err, GenerationError::Network(_)));
    }
}
