//! Core traits for reedit's external capabilities.
//!
//! The stages only see these traits, so the HTTP backends and the scripted
//! test backends are interchangeable.

use async_trait::async_trait;

use crate::error::Result;

/// An image handed to a vision model, in request order.
#[derive(Debug, Clone, Copy)]
pub struct ImageRef<'a> {
    /// Encoded image bytes as stored in the shard (JPEG, PNG, ...).
    pub data: &'a [u8],
}

impl<'a> ImageRef<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

/// Backend for analyzing one or more images with a vision LLM.
#[async_trait]
pub trait VisionBackend: Send + Sync {
    /// Ask the model about `images` (attached in order after `prompt`),
    /// under the given system instruction. Returns the model's text.
    async fn analyze(&self, images: &[ImageRef<'_>], system: &str, prompt: &str)
        -> Result<String>;

    /// Check if the backend is available.
    async fn health_check(&self) -> Result<bool>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

/// Backend for prompt-driven image editing.
#[async_trait]
pub trait ImageEditBackend: Send + Sync {
    /// Apply `prompt` to a PNG-encoded image and return the edited image
    /// bytes exactly as produced by the model.
    async fn edit(&self, image_png: &[u8], prompt: &str) -> Result<Vec<u8>>;

    /// Check if the backend is available.
    async fn health_check(&self) -> Result<bool>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}
