//! Stage 1: describe how the target image differs from the source image.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use reedit_core::{ImageRef, Record, Result, StageKind, VisionBackend};

use super::normalize_reply;
use crate::prompts::{DIFFERENCE_PROMPT, DIFFERENCE_SYSTEM};
use crate::stage::{RowContext, Stage};

/// Produces the `difference` field from the source and target images.
pub struct DifferenceStage {
    backend: Arc<dyn VisionBackend>,
}

impl DifferenceStage {
    pub fn new(backend: Arc<dyn VisionBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Stage for DifferenceStage {
    fn kind(&self) -> StageKind {
        StageKind::Difference
    }

    async fn process(&self, ctx: RowContext<'_>, mut record: Record) -> Result<Record> {
        let source = &ctx.images.source;
        let target = ctx.images.require_target(ctx.row)?;

        let reply = self
            .backend
            .analyze(
                &[ImageRef::new(&source.bytes), ImageRef::new(&target.bytes)],
                DIFFERENCE_SYSTEM,
                DIFFERENCE_PROMPT,
            )
            .await?;
        debug!(
            shard = ctx.shard,
            row = ctx.row,
            model = self.backend.model_name(),
            "Difference reply received"
        );

        record.difference = Some(normalize_reply(self.kind(), &ctx, &reply));
        Ok(record)
    }

    async fn health_check(&self) -> Result<bool> {
        self.backend.health_check().await
    }
}
