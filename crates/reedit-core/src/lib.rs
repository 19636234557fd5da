//! # reedit-core
//!
//! Core types, traits, and abstractions for the reedit dataset pipeline.
//!
//! This crate provides the record model that accumulates fields across the
//! four pipeline stages, the normalization of free-form model responses into
//! [`ModelResponse`], and the backend traits the stages call into.

pub mod defaults;
pub mod error;
pub mod normalize;
pub mod record;
pub mod response;
pub mod stage;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use normalize::{normalize_response, strip_code_fence};
pub use record::Record;
pub use response::ModelResponse;
pub use stage::{ShardState, StageKind};
pub use traits::*;
