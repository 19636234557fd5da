//! The four stage implementations.

mod critique;
mod difference;
mod instruction;
mod step_image;

pub use critique::CritiqueStage;
pub use difference::DifferenceStage;
pub use instruction::InstructionStage;
pub use step_image::StepImageStage;

use reedit_core::{normalize_response, ModelResponse, StageKind};
use tracing::warn;

use crate::stage::RowContext;

/// Normalize a model reply, warning when it had to be kept as raw text.
pub(crate) fn normalize_reply(stage: StageKind, ctx: &RowContext<'_>, reply: &str) -> ModelResponse {
    let response = normalize_response(reply);
    if !response.is_structured() {
        warn!(
            %stage,
            shard = ctx.shard,
            row = ctx.row,
            response_len = reply.len(),
            "Model reply is not a JSON object, storing raw text"
        );
    }
    response
}

/// Shared fixtures for the stage unit tests.
#[cfg(test)]
pub(crate) mod fixtures {
    use crate::stage::RowImages;
    use crate::table::ImageCell;

    pub fn row_images() -> RowImages {
        RowImages {
            source: ImageCell::new(b"source-bytes".to_vec(), Some("a.jpg")),
            target: Some(ImageCell::new(b"target-bytes".to_vec(), Some("b.jpg"))),
        }
    }
}
