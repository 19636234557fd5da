//! OpenAI-compatible vision and image-edit backend.
//!
//! This module works with any endpoint that speaks the OpenAI chat
//! completions API with image content parts and the image edits API:
//!
//! - OpenAI cloud API
//! - Azure OpenAI
//! - vLLM / LocalAI / LM Studio (analysis only)
//!
//! # Example
//!
//! ```rust,no_run
//! use reedit_inference::openai::{OpenAIBackend, OpenAIConfig};
//!
//! // From environment variables
//! let backend = OpenAIBackend::from_env().unwrap();
//!
//! // Or with custom config
//! let config = OpenAIConfig {
//!     base_url: "http://localhost:8000/v1".to_string(),
//!     api_key: None,
//!     vision_model: "qwen2.5-vl".to_string(),
//!     ..Default::default()
//! };
//! let backend = OpenAIBackend::new(config).unwrap();
//! ```

mod backend;
mod error;
mod types;

pub use backend::{OpenAIBackend, OpenAIConfig};
pub use error::{to_reedit_error, OpenAIErrorCode};
pub use types::*;
