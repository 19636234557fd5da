//! # reedit-pipeline
//!
//! Shard-driven record augmentation for the reedit dataset.
//!
//! This crate provides:
//! - Shard discovery and numeric ordering
//! - Parquet image-table reading behind the [`ShardSource`] trait
//! - Line-delimited JSON record files
//! - The four stages (difference, instruction, step image, critique)
//! - [`StageRunner`], which correlates records with table rows, calls a
//!   stage once per row, and writes the augmented records
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use reedit_pipeline::{DifferenceStage, ParquetShardSource, RunConfig, StageRunner};
//! use reedit_core::StageKind;
//!
//! let stage = DifferenceStage::new(Arc::new(backend));
//! let config = RunConfig::for_stage(StageKind::Difference, "data/shards");
//! let summary = StageRunner::new(Arc::new(stage), Arc::new(ParquetShardSource), config)
//!     .run()
//!     .await?;
//! println!("{} rows", summary.total_rows());
//! ```

pub mod imaging;
pub mod prompts;
pub mod records;
pub mod runner;
pub mod shard;
pub mod stage;
pub mod stages;
pub mod table;

// Re-export core types
pub use reedit_core::*;

pub use imaging::{normalize_png, PngImage};
pub use records::{load_records, record_path, save_records};
pub use runner::{RunConfig, RunSummary, ShardReport, StageRunner};
pub use shard::{discover_shards, parse_shard_index, ShardId};
pub use stage::{RowContext, RowImages, Stage};
pub use stages::{CritiqueStage, DifferenceStage, InstructionStage, StepImageStage};
pub use table::{ImageCell, MemoryShardSource, ParquetShardSource, ShardSource};
