//! The per-row stage abstraction.

use async_trait::async_trait;

use reedit_core::{Error, Record, Result, StageKind};

use crate::table::ImageCell;

/// Image cells for one shard row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowImages {
    pub source: ImageCell,
    /// Only read for stages that compare against the target image.
    pub target: Option<ImageCell>,
}

impl RowImages {
    /// The target cell, or an error naming the row.
    pub fn require_target(&self, row: usize) -> Result<&ImageCell> {
        self.target
            .as_ref()
            .ok_or_else(|| Error::InvalidInput(format!("row {} has no target image", row)))
    }
}

/// Context handed to a stage for one row.
#[derive(Debug, Clone, Copy)]
pub struct RowContext<'a> {
    /// Shard label (e.g. `00002`).
    pub shard: &'a str,
    /// Zero-based row position in the shard.
    pub row: usize,
    pub images: &'a RowImages,
}

/// One pipeline stage: adds a single field to a record.
///
/// The runner guarantees that `record` is the record correlated with the
/// row in `ctx` and that it carries every field in
/// [`StageKind::input_fields`].
#[async_trait]
pub trait Stage: Send + Sync {
    /// Which stage this is.
    fn kind(&self) -> StageKind;

    /// Process one row and return the augmented record.
    async fn process(&self, ctx: RowContext<'_>, record: Record) -> Result<Record>;

    /// Check the backend this stage calls is reachable.
    async fn health_check(&self) -> Result<bool>;
}
