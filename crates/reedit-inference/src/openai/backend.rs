//! OpenAI-compatible backend implementation.

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use reedit_core::defaults;
use reedit_core::{Error, ImageEditBackend, ImageRef, Result, VisionBackend};

use super::error::error_from_response;
use super::types::*;
use crate::media::data_url;

/// Configuration for OpenAI-compatible backend.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// Base URL for the API endpoint.
    pub base_url: String,
    /// API key for authentication (optional for local endpoints).
    pub api_key: Option<String>,
    /// Model used for image analysis (chat completions).
    pub vision_model: String,
    /// Model used for image edits.
    pub edit_model: String,
    /// Number of images requested per edit call; only the first is used.
    pub edit_variants: u32,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// Skip TLS verification (for self-signed certs in local environments).
    pub skip_tls_verify: bool,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::OPENAI_URL.to_string(),
            api_key: None,
            vision_model: defaults::VISION_MODEL.to_string(),
            edit_model: defaults::EDIT_MODEL.to_string(),
            edit_variants: defaults::EDIT_VARIANTS,
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECS,
            skip_tls_verify: false,
        }
    }
}

impl OpenAIConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `OPENAI_BASE_URL` | `https://api.openai.com/v1` | API endpoint |
    /// | `OPENAI_API_KEY` | (none) | API key |
    /// | `OPENAI_VISION_MODEL` | `gpt-4o` | Analysis model |
    /// | `OPENAI_EDIT_MODEL` | `gpt-image-1` | Edit model |
    /// | `OPENAI_EDIT_VARIANTS` | `1` | Images per edit |
    /// | `OPENAI_TIMEOUT` | `300` | Request timeout (seconds) |
    /// | `OPENAI_SKIP_TLS_VERIFY` | `false` | Accept invalid certificates |
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var(defaults::ENV_OPENAI_BASE_URL)
                .unwrap_or_else(|_| defaults::OPENAI_URL.to_string()),
            api_key: std::env::var(defaults::ENV_OPENAI_API_KEY)
                .ok()
                .filter(|k| !k.is_empty()),
            vision_model: std::env::var(defaults::ENV_OPENAI_VISION_MODEL)
                .unwrap_or_else(|_| defaults::VISION_MODEL.to_string()),
            edit_model: std::env::var(defaults::ENV_OPENAI_EDIT_MODEL)
                .unwrap_or_else(|_| defaults::EDIT_MODEL.to_string()),
            edit_variants: std::env::var(defaults::ENV_OPENAI_EDIT_VARIANTS)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::EDIT_VARIANTS)
                .max(1),
            timeout_seconds: std::env::var(defaults::ENV_OPENAI_TIMEOUT)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::REQUEST_TIMEOUT_SECS),
            skip_tls_verify: std::env::var(defaults::ENV_OPENAI_SKIP_TLS_VERIFY)
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

/// OpenAI-compatible vision and image-edit backend.
pub struct OpenAIBackend {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIBackend {
    /// Create a new OpenAI backend with the given configuration.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        if config.edit_variants == 0 {
            return Err(Error::Config("edit_variants must be at least 1".into()));
        }

        let mut client_builder =
            Client::builder().timeout(Duration::from_secs(config.timeout_seconds));

        if config.skip_tls_verify {
            warn!("TLS certificate verification is disabled");
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        let client = client_builder
            .build()
            .map_err(|e| Error::Inference(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "Initializing OpenAI backend: url={}, vision={}, edit={}",
            config.base_url, config.vision_model, config.edit_model
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAIConfig::from_env())
    }

    /// Get the current configuration.
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.api_key {
            Some(ref api_key) => req.header("Authorization", format!("Bearer {}", api_key)),
            None => req,
        }
    }

    async fn probe_models(&self) -> Result<bool> {
        let response = self
            .authorize(self.client.get(self.endpoint("/models")))
            .timeout(Duration::from_secs(defaults::HEALTH_CHECK_TIMEOUT_SECS))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                info!("OpenAI health check passed");
                Ok(true)
            }
            Ok(resp) => {
                warn!("OpenAI health check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("OpenAI health check error: {}", e);
                Ok(false)
            }
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Request(format!("Image download failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Inference(format!(
                "Image download returned {}",
                response.status()
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl VisionBackend for OpenAIBackend {
    async fn analyze(
        &self,
        images: &[ImageRef<'_>],
        system: &str,
        prompt: &str,
    ) -> Result<String> {
        debug!(
            model = %self.config.vision_model,
            image_count = images.len(),
            "Analyzing images"
        );
        trace!(prompt_len = prompt.len(), "Vision prompt");

        let mut parts = Vec::with_capacity(images.len() + 1);
        parts.push(ContentPart::Text {
            text: prompt.to_string(),
        });
        parts.extend(images.iter().map(|image| ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: data_url(image.data),
            },
        }));

        let mut messages = Vec::with_capacity(2);
        if !system.is_empty() {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user_parts(parts));

        let request = ChatCompletionRequest {
            model: self.config.vision_model.clone(),
            messages,
        };

        let response = self
            .authorize(self.client.post(self.endpoint("/chat/completions")))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Request(format!("Vision request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Failed to parse vision response: {}", e)))?;

        if let Some(ref usage) = result.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "Vision token usage"
            );
        }

        let choice = result
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Inference("Vision response contained no choices".into()))?;

        let content = choice.message.content.ok_or_else(|| {
            Error::Inference(format!(
                "Vision response had no content (finish_reason={})",
                choice.finish_reason.as_deref().unwrap_or("unknown")
            ))
        })?;

        trace!(response_len = content.len(), "Vision response");
        Ok(content)
    }

    async fn health_check(&self) -> Result<bool> {
        self.probe_models().await
    }

    fn model_name(&self) -> &str {
        &self.config.vision_model
    }
}

#[async_trait]
impl ImageEditBackend for OpenAIBackend {
    async fn edit(&self, image_png: &[u8], prompt: &str) -> Result<Vec<u8>> {
        debug!(
            model = %self.config.edit_model,
            n = self.config.edit_variants,
            image_len = image_png.len(),
            "Requesting image edit"
        );
        trace!(prompt_len = prompt.len(), "Edit prompt");

        let image_part = reqwest::multipart::Part::bytes(image_png.to_vec())
            .file_name("image.png")
            .mime_str("image/png")
            .map_err(|e| Error::Internal(format!("Failed to create multipart: {}", e)))?;

        let form = reqwest::multipart::Form::new()
            .text("model", self.config.edit_model.clone())
            .part("image", image_part)
            .text("prompt", prompt.to_string())
            .text("n", self.config.edit_variants.to_string());

        let response = self
            .authorize(self.client.post(self.endpoint("/images/edits")))
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Request(format!("Image edit request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let result: ImageEditResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Failed to parse edit response: {}", e)))?;

        let first = result
            .data
            .into_iter()
            .next()
            .ok_or_else(|| Error::Inference("Image edit returned no images".into()))?;

        match (first.b64_json, first.url) {
            (Some(b64), _) => Ok(base64::engine::general_purpose::STANDARD.decode(b64)?),
            (None, Some(url)) => self.download(&url).await,
            (None, None) => Err(Error::Inference(
                "Image edit result had neither b64_json nor url".into(),
            )),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        self.probe_models().await
    }

    fn model_name(&self) -> &str {
        &self.config.edit_model
    }
}
