//! Stage 2: turn a difference description into numbered edit actions.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use reedit_core::{Error, ImageRef, Record, Result, StageKind, VisionBackend};

use super::normalize_reply;
use crate::prompts::{instruction_prompt, INSTRUCTION_SYSTEM};
use crate::stage::{RowContext, Stage};

/// Produces the `edit` field from the source image and `difference`.
pub struct InstructionStage {
    backend: Arc<dyn VisionBackend>,
}

impl InstructionStage {
    pub fn new(backend: Arc<dyn VisionBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Stage for InstructionStage {
    fn kind(&self) -> StageKind {
        StageKind::Instruction
    }

    async fn process(&self, ctx: RowContext<'_>, mut record: Record) -> Result<Record> {
        let difference = record.difference.as_ref().ok_or_else(|| {
            Error::InvalidInput(format!("row {} has no difference field", ctx.row))
        })?;
        let prompt = instruction_prompt(&difference.to_prompt_text());

        let reply = self
            .backend
            .analyze(
                &[ImageRef::new(&ctx.images.source.bytes)],
                INSTRUCTION_SYSTEM,
                &prompt,
            )
            .await?;
        debug!(shard = ctx.shard, row = ctx.row, "Instruction reply received");

        record.edit = Some(normalize_reply(self.kind(), &ctx, &reply));
        Ok(record)
    }

    async fn health_check(&self) -> Result<bool> {
        self.backend.health_check().await
    }
}
