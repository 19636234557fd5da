//! Stage 3: apply the first edit action to the source image.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use reedit_core::{Error, ImageEditBackend, Record, Result, StageKind};

use crate::imaging::normalize_png;
use crate::stage::{RowContext, Stage};

/// Produces the `step_edited` field by sending the source image, re-encoded
/// as PNG, and only the first edit action to the image-edit endpoint.
pub struct StepImageStage {
    backend: Arc<dyn ImageEditBackend>,
}

impl StepImageStage {
    pub fn new(backend: Arc<dyn ImageEditBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Stage for StepImageStage {
    fn kind(&self) -> StageKind {
        StageKind::StepImage
    }

    async fn process(&self, ctx: RowContext<'_>, mut record: Record) -> Result<Record> {
        let edit = record
            .edit
            .as_ref()
            .ok_or_else(|| Error::InvalidInput(format!("row {} has no edit field", ctx.row)))?;
        let action = edit.first_action();
        if action.is_empty() {
            warn!(shard = ctx.shard, row = ctx.row, "Edit plan has no first action");
        }

        let png = normalize_png(&ctx.images.source.bytes)?;
        debug!(
            shard = ctx.shard,
            row = ctx.row,
            width = png.width,
            height = png.height,
            action,
            "Applying first edit action"
        );

        let edited = self.backend.edit(&png.bytes, action).await?;
        record.set_step_edited(&edited);
        Ok(record)
    }

    async fn health_check(&self) -> Result<bool> {
        self.backend.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::RowImages;
    use crate::table::ImageCell;
    use image::{ImageFormat, Rgb, RgbImage};
    use reedit_core::ModelResponse;
    use reedit_inference::mock::MockEditBackend;
    use std::io::Cursor;

    fn jpeg_row() -> RowImages {
        let mut out = Cursor::new(Vec::new());
        RgbImage::from_pixel(4, 4, Rgb([0, 0, 255]))
            .write_to(&mut out, ImageFormat::Jpeg)
            .unwrap();
        RowImages {
            source: ImageCell::new(out.into_inner(), Some("a.jpg")),
            target: None,
        }
    }

    #[tokio::test]
    async fn test_only_first_action_is_sent() {
        let mock = MockEditBackend::new().with_output(b"edited".to_vec());
        let stage = StepImageStage::new(Arc::new(mock.clone()));
        let images = jpeg_row();
        let ctx = RowContext { shard: "00000", row: 0, images: &images };
        let record = Record {
            edit: Some(ModelResponse::structured([
                ("1", "Change the sky to red"),
                ("2", "Remove the car"),
            ])),
            ..Default::default()
        };

        let record = stage.process(ctx, record).await.unwrap();

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].prompt, "Change the sky to red");
        assert!(calls[0].images[0].starts_with(b"\x89PNG"));
        assert_eq!(record.step_edited_bytes().unwrap(), Some(b"edited".to_vec()));
    }

    #[tokio::test]
    async fn test_raw_edit_is_sent_whole() {
        let mock = MockEditBackend::new();
        let stage = StepImageStage::new(Arc::new(mock.clone()));
        let images = jpeg_row();
        let ctx = RowContext { shard: "00000", row: 0, images: &images };
        let record = Record {
            edit: Some(ModelResponse::Raw("make it night".into())),
            ..Default::default()
        };

        stage.process(ctx, record).await.unwrap();
        assert_eq!(mock.calls()[0].prompt, "make it night");
    }

    #[tokio::test]
    async fn test_undecodable_source_fails_before_call() {
        let mock = MockEditBackend::new();
        let stage = StepImageStage::new(Arc::new(mock.clone()));
        let images = RowImages {
            source: ImageCell::new(b"garbage".to_vec(), None),
            target: None,
        };
        let ctx = RowContext { shard: "00000", row: 0, images: &images };
        let record = Record {
            edit: Some(ModelResponse::structured([("1", "x")])),
            ..Default::default()
        };

        assert!(matches!(
            stage.process(ctx, record).await,
            Err(Error::Image(_))
        ));
        assert!(mock.calls().is_empty());
    }
}
