//! Stage 4: critique the step image and propose re-edit instructions.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use reedit_core::{Error, ImageRef, Record, Result, StageKind, VisionBackend};

use super::normalize_reply;
use crate::prompts::{critique_prompt, CRITIQUE_SYSTEM};
use crate::stage::{RowContext, Stage};

/// Produces the `CoT_Reedit` field from the source image, the full edit
/// plan and the step-edited image.
pub struct CritiqueStage {
    backend: Arc<dyn VisionBackend>,
}

impl CritiqueStage {
    pub fn new(backend: Arc<dyn VisionBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Stage for CritiqueStage {
    fn kind(&self) -> StageKind {
        StageKind::Critique
    }

    async fn process(&self, ctx: RowContext<'_>, mut record: Record) -> Result<Record> {
        let edit = record
            .edit
            .as_ref()
            .ok_or_else(|| Error::InvalidInput(format!("row {} has no edit field", ctx.row)))?;
        let step_image = record.step_edited_bytes()?.ok_or_else(|| {
            Error::InvalidInput(format!("row {} has no step_edited field", ctx.row))
        })?;
        let prompt = critique_prompt(&edit.to_prompt_text());

        let reply = self
            .backend
            .analyze(
                &[
                    ImageRef::new(&ctx.images.source.bytes),
                    ImageRef::new(&step_image),
                ],
                CRITIQUE_SYSTEM,
                &prompt,
            )
            .await?;
        debug!(shard = ctx.shard, row = ctx.row, "Critique reply received");

        record.cot_reedit = Some(normalize_reply(self.kind(), &ctx, &reply));
        Ok(record)
    }

    async fn health_check(&self) -> Result<bool> {
        self.backend.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::fixtures::row_images;
    use reedit_core::ModelResponse;
    use reedit_inference::mock::MockVisionBackend;

    fn stage3_record() -> Record {
        let mut record = Record {
            edit: Some(ModelResponse::structured([("1", "Change the sky to red")])),
            ..Record::seed(Some("a.jpg".into()), None)
        };
        record.set_step_edited(b"step-bytes");
        record
    }

    #[tokio::test]
    async fn test_sends_source_then_step_image() {
        let mock = MockVisionBackend::new()
            .with_response(r#"{"CoT_1":"sky is red","Re_Edit_1":"darken the sky"}"#);
        let stage = CritiqueStage::new(Arc::new(mock.clone()));
        let images = row_images();
        let ctx = RowContext { shard: "00000", row: 0, images: &images };

        let record = stage.process(ctx, stage3_record()).await.unwrap();

        let call = &mock.calls()[0];
        assert_eq!(call.system, CRITIQUE_SYSTEM);
        assert_eq!(call.images, vec![b"source-bytes".to_vec(), b"step-bytes".to_vec()]);
        assert!(call.prompt.starts_with(
            r#"<desired_editing_instruction>{"1":"Change the sky to red"}</desired_editing_instruction>"#
        ));
        let critique = record.cot_reedit.unwrap();
        assert_eq!(critique.get("Re_Edit_1"), Some("darken the sky"));
    }

    #[tokio::test]
    async fn test_missing_step_image_is_error() {
        let mock = MockVisionBackend::new();
        let stage = CritiqueStage::new(Arc::new(mock.clone()));
        let images = row_images();
        let ctx = RowContext { shard: "00000", row: 0, images: &images };
        let mut record = stage3_record();
        record.step_edited = None;

        assert!(stage.process(ctx, record).await.is_err());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_base64_step_image_is_error() {
        let stage = CritiqueStage::new(Arc::new(MockVisionBackend::new()));
        let images = row_images();
        let ctx = RowContext { shard: "00000", row: 0, images: &images };
        let mut record = stage3_record();
        record.step_edited = Some("!!not base64!!".into());

        assert!(stage.process(ctx, record).await.is_err());
    }
}
