//! The per-row record that accumulates fields across stages.
//!
//! A record is created by stage 1 and each later stage returns the same
//! record with one more field set. Fields never change once written;
//! unknown fields read from a record file are carried through untouched.

use base64::Engine;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::response::ModelResponse;
use crate::stage::{ShardState, StageKind};

/// One line of a record file.
///
/// Field order on disk follows declaration order, which is also the order
/// the stages add them in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    /// Logical path of the source image in the shard table.
    #[serde(default)]
    pub source: Option<String>,

    /// Logical path of the target image in the shard table.
    #[serde(default)]
    pub target: Option<String>,

    /// Stage 1 output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difference: Option<ModelResponse>,

    /// Stage 2 output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit: Option<ModelResponse>,

    /// Stage 3 output: the step-edited image, base64-encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_edited: Option<String>,

    /// Stage 4 output.
    #[serde(
        rename = "CoT_Reedit",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cot_reedit: Option<ModelResponse>,

    /// Fields this pipeline does not know about.
    #[serde(flatten)]
    pub extra: IndexMap<String, JsonValue>,
}

impl Record {
    /// A fresh record for one shard row, before stage 1 has run.
    pub fn seed(source: Option<String>, target: Option<String>) -> Self {
        Self {
            source,
            target,
            ..Default::default()
        }
    }

    /// Whether the named stage field is present.
    pub fn has_field(&self, field: &str) -> bool {
        match field {
            "source" => self.source.is_some(),
            "target" => self.target.is_some(),
            "difference" => self.difference.is_some(),
            "edit" => self.edit.is_some(),
            "step_edited" => self.step_edited.is_some(),
            "CoT_Reedit" => self.cot_reedit.is_some(),
            other => self.extra.contains_key(other),
        }
    }

    /// Input fields `stage` needs that this record lacks.
    pub fn missing_inputs(&self, stage: StageKind) -> Vec<&'static str> {
        stage
            .input_fields()
            .iter()
            .copied()
            .filter(|field| !self.has_field(field))
            .collect()
    }

    /// The furthest stage whose output this record carries, counting only
    /// an unbroken prefix of stages.
    pub fn state(&self) -> ShardState {
        let mut state = ShardState::Discovered;
        for stage in StageKind::ALL {
            if !self.has_field(stage.output_field()) {
                break;
            }
            state = ShardState::after(stage);
        }
        state
    }

    /// Store step-edited image bytes, transport-encoded as base64.
    pub fn set_step_edited(&mut self, image: &[u8]) {
        self.step_edited = Some(base64::engine::general_purpose::STANDARD.encode(image));
    }

    /// Decode the step-edited image, if present.
    pub fn step_edited_bytes(&self) -> Result<Option<Vec<u8>>> {
        self.step_edited
            .as_deref()
            .map(|b64| {
                base64::engine::general_purpose::STANDARD
                    .decode(b64)
                    .map_err(Into::into)
            })
            .transpose()
    }

    /// Serialize as one compact JSON line (without the trailing newline).
    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
