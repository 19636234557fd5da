//! Centralized default constants for the reedit pipeline.
//!
//! **This module is the single source of truth** for shared default values.
//! The CLI, the inference backends and the stage runner reference these
//! constants instead of defining their own.

// =============================================================================
// MODELS
// =============================================================================

/// Default vision model used by the analysis stages (1, 2 and 4).
pub const VISION_MODEL: &str = "gpt-4o";

/// Default image edit model used by stage 3.
pub const EDIT_MODEL: &str = "gpt-image-1";

/// Default number of images requested per edit call.
pub const EDIT_VARIANTS: u32 = 1;

// =============================================================================
// OPENAI-COMPATIBLE ENDPOINT
// =============================================================================

/// Default OpenAI API endpoint.
pub const OPENAI_URL: &str = "https://api.openai.com/v1";

/// Default request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Timeout for health check probes in seconds.
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;

/// MIME type assumed for images whose magic bytes are not recognized.
pub const FALLBACK_IMAGE_MIME: &str = "image/jpeg";

// =============================================================================
// SHARDS
// =============================================================================

/// Default column holding the source image cell.
pub const SOURCE_COLUMN: &str = "src_img";

/// Default column holding the target image cell (stage 1 only).
pub const TARGET_COLUMN: &str = "edited_img";

/// File extension of shard tables.
pub const SHARD_EXTENSION: &str = "parquet";

/// Basename prefix of sidecar files that are never shards (macOS `._*`).
pub const HIDDEN_PREFIX: &str = "._";

/// Literal token that precedes the numeric shard index (`train-00012-...`).
pub const SHARD_INDEX_TOKEN: &str = "train";

/// Sort key for shards whose name has no numeric index; sorts first.
pub const UNINDEXED_SHARD: i64 = -1;

// =============================================================================
// RECORDS
// =============================================================================

/// File extension of per-shard record files.
pub const RECORD_EXTENSION: &str = "jsonal";

/// Default output directory of stage 1 (difference extraction).
pub const DIFFERENCE_DIR: &str = "./output/_1_difference";

/// Default output directory of stage 2 (instruction synthesis).
pub const INSTRUCTION_DIR: &str = "./output/_2_instruction";

/// Default output directory of stage 3 (edit application).
pub const STEP_IMAGE_DIR: &str = "./output/_3_step_image";

/// Default output directory of stage 4 (reflective critique).
pub const CRITIQUE_DIR: &str = "./output/_4_cot_reinstruction";

/// Key of the only edit action applied by stage 3.
pub const FIRST_ACTION_KEY: &str = "1";

// =============================================================================
// ENVIRONMENT VARIABLES
// =============================================================================

/// Env var: OpenAI-compatible base URL.
pub const ENV_OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";

/// Env var: API credential.
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// Env var: vision model.
pub const ENV_OPENAI_VISION_MODEL: &str = "OPENAI_VISION_MODEL";

/// Env var: image edit model.
pub const ENV_OPENAI_EDIT_MODEL: &str = "OPENAI_EDIT_MODEL";

/// Env var: images per edit.
pub const ENV_OPENAI_EDIT_VARIANTS: &str = "OPENAI_EDIT_VARIANTS";

/// Env var: request timeout in seconds.
pub const ENV_OPENAI_TIMEOUT: &str = "OPENAI_TIMEOUT";

/// Env var: skip TLS certificate verification ("true" or "1").
pub const ENV_OPENAI_SKIP_TLS_VERIFY: &str = "OPENAI_SKIP_TLS_VERIFY";
