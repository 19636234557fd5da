//! Pipeline stages and the per-shard progress they imply.

use serde::{Deserialize, Serialize};

use crate::defaults;

/// The four stages of the pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Stage 1: describe differences between source and target.
    Difference,
    /// Stage 2: turn a difference description into edit actions.
    Instruction,
    /// Stage 3: apply the first edit action to the source image.
    StepImage,
    /// Stage 4: critique the step image and propose re-edits.
    Critique,
}

impl StageKind {
    /// All stages in execution order.
    pub const ALL: [StageKind; 4] = [
        StageKind::Difference,
        StageKind::Instruction,
        StageKind::StepImage,
        StageKind::Critique,
    ];

    /// Stable name used in logs and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Difference => "difference",
            Self::Instruction => "instruction",
            Self::StepImage => "step_image",
            Self::Critique => "critique",
        }
    }

    /// One-based position in the pipeline.
    pub fn ordinal(&self) -> usize {
        match self {
            Self::Difference => 1,
            Self::Instruction => 2,
            Self::StepImage => 3,
            Self::Critique => 4,
        }
    }

    /// The record field this stage adds.
    pub fn output_field(&self) -> &'static str {
        match self {
            Self::Difference => "difference",
            Self::Instruction => "edit",
            Self::StepImage => "step_edited",
            Self::Critique => "CoT_Reedit",
        }
    }

    /// Record fields this stage reads from its upstream record.
    pub fn input_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Difference => &[],
            Self::Instruction => &["difference"],
            Self::StepImage => &["edit"],
            Self::Critique => &["edit", "step_edited"],
        }
    }

    /// The stage whose output file this stage consumes.
    pub fn upstream(&self) -> Option<StageKind> {
        match self {
            Self::Difference => None,
            Self::Instruction => Some(Self::Difference),
            Self::StepImage => Some(Self::Instruction),
            Self::Critique => Some(Self::StepImage),
        }
    }

    /// Whether the stage needs the target image column.
    pub fn needs_target_image(&self) -> bool {
        matches!(self, Self::Difference)
    }

    /// Default directory the stage writes its record files to.
    pub fn default_output_dir(&self) -> &'static str {
        match self {
            Self::Difference => defaults::DIFFERENCE_DIR,
            Self::Instruction => defaults::INSTRUCTION_DIR,
            Self::StepImage => defaults::STEP_IMAGE_DIR,
            Self::Critique => defaults::CRITIQUE_DIR,
        }
    }

    /// Default directory the stage reads upstream record files from.
    pub fn default_input_dir(&self) -> Option<&'static str> {
        self.upstream().map(|up| up.default_output_dir())
    }

    /// Shard state required before this stage may run.
    pub fn requires(&self) -> ShardState {
        match self.upstream() {
            None => ShardState::Discovered,
            Some(up) => ShardState::after(up),
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of one shard through the pipeline.
///
/// Each transition is a separate run of the corresponding stage; nothing
/// chains automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardState {
    Discovered,
    DifferenceDone,
    InstructionDone,
    StepImageDone,
    CritiqueDone,
}

impl ShardState {
    /// State reached once `stage` has written the shard's output file.
    pub fn after(stage: StageKind) -> Self {
        match stage {
            StageKind::Difference => Self::DifferenceDone,
            StageKind::Instruction => Self::InstructionDone,
            StageKind::StepImage => Self::StepImageDone,
            StageKind::Critique => Self::CritiqueDone,
        }
    }

    /// The stage that may run next, if any.
    pub fn next_stage(&self) -> Option<StageKind> {
        match self {
            Self::Discovered => Some(StageKind::Difference),
            Self::DifferenceDone => Some(StageKind::Instruction),
            Self::InstructionDone => Some(StageKind::StepImage),
            Self::StepImageDone => Some(StageKind::Critique),
            Self::CritiqueDone => None,
        }
    }
}
