//! # reedit-inference
//!
//! Vision and image-edit backends for the reedit dataset pipeline.
//!
//! This crate provides:
//! - OpenAI-compatible implementation of [`VisionBackend`] (chat completions
//!   with image parts) and [`ImageEditBackend`] (the image edits endpoint)
//! - Classification of OpenAI error responses
//! - Scripted backends for deterministic tests (feature `mock`)
//!
//! # Feature Flags
//!
//! - `openai` (default): Enable the OpenAI-compatible backend
//! - `mock`: Expose the scripted backends to other crates' tests
//!
//! # Example
//!
//! ```rust,no_run
//! use reedit_inference::{ImageRef, OpenAIBackend, OpenAIConfig, VisionBackend};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = OpenAIConfig {
//!         api_key: Some("sk-...".to_string()),
//!         ..Default::default()
//!     };
//!     let backend = OpenAIBackend::new(config).unwrap();
//!     let image = std::fs::read("source.jpg").unwrap();
//!     let answer = backend
//!         .analyze(&[ImageRef::new(&image)], "You are a helpful visual assistant.", "Describe it.")
//!         .await
//!         .unwrap();
//!     println!("{}", answer);
//! }
//! ```

pub mod media;

#[cfg(feature = "openai")]
pub mod openai;

// Scripted backends for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use reedit_core::*;

#[cfg(feature = "openai")]
pub use openai::{OpenAIBackend, OpenAIConfig};

pub use media::{data_url, detect_mime};
