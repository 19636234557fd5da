//! Command-line surface: one subcommand per stage.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use reedit_core::{defaults, StageKind};
use reedit_inference::OpenAIConfig;
use reedit_pipeline::RunConfig;

#[derive(Debug, Parser)]
#[command(name = "reedit")]
#[command(author, version, about = "Build a multi-stage image re-editing dataset")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Stage 1: describe differences between source and target images
    Difference {
        #[command(flatten)]
        common: CommonArgs,

        /// Target image column in the shard tables
        #[arg(long, default_value = defaults::TARGET_COLUMN)]
        target_column_name: String,

        /// Output directory for record files
        #[arg(long, default_value = defaults::DIFFERENCE_DIR)]
        output_dir: PathBuf,
    },

    /// Stage 2: derive numbered edit actions from the differences
    Instruction {
        #[command(flatten)]
        common: CommonArgs,

        /// Directory with the stage 1 record files
        #[arg(long, default_value = defaults::DIFFERENCE_DIR)]
        input_jsonal_dir: PathBuf,

        /// Output directory for record files
        #[arg(long, default_value = defaults::INSTRUCTION_DIR)]
        output_dir: PathBuf,
    },

    /// Stage 3: apply the first edit action to each source image
    StepImage {
        #[command(flatten)]
        common: CommonArgs,

        /// Directory with the stage 2 record files
        #[arg(long, default_value = defaults::INSTRUCTION_DIR)]
        input_jsonal_dir: PathBuf,

        /// Output directory for record files
        #[arg(long, default_value = defaults::STEP_IMAGE_DIR)]
        output_dir: PathBuf,

        /// Number of images the edit endpoint generates per call (only the
        /// first is kept)
        #[arg(long, default_value_t = defaults::EDIT_VARIANTS, value_parser = clap::value_parser!(u32).range(1..))]
        n: u32,
    },

    /// Stage 4: critique the step image and propose re-edit instructions
    Critique {
        #[command(flatten)]
        common: CommonArgs,

        /// Directory with the stage 3 record files
        #[arg(long, default_value = defaults::STEP_IMAGE_DIR)]
        input_jsonal_dir: PathBuf,

        /// Output directory for record files
        #[arg(long, default_value = defaults::CRITIQUE_DIR)]
        output_dir: PathBuf,
    },
}

/// Flags shared by every stage.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// API key for the OpenAI-compatible endpoint
    #[arg(long, env = defaults::ENV_OPENAI_API_KEY, hide_env_values = true)]
    pub api_key: String,

    /// Directory containing the parquet shards
    #[arg(long)]
    pub input_parquet_dir: PathBuf,

    /// Source image column in the shard tables
    #[arg(long, default_value = defaults::SOURCE_COLUMN)]
    pub source_column_name: String,

    /// Model identifier (vision model for stages 1, 2 and 4, edit model for
    /// stage 3)
    #[arg(long)]
    pub model: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[arg(long, env = defaults::ENV_OPENAI_BASE_URL)]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Accept invalid TLS certificates (self-signed local endpoints)
    #[arg(long)]
    pub insecure: bool,
}

impl Commands {
    pub fn stage(&self) -> StageKind {
        match self {
            Self::Difference { .. } => StageKind::Difference,
            Self::Instruction { .. } => StageKind::Instruction,
            Self::StepImage { .. } => StageKind::StepImage,
            Self::Critique { .. } => StageKind::Critique,
        }
    }

    pub fn common(&self) -> &CommonArgs {
        match self {
            Self::Difference { common, .. }
            | Self::Instruction { common, .. }
            | Self::StepImage { common, .. }
            | Self::Critique { common, .. } => common,
        }
    }

    /// Runner configuration for this invocation.
    pub fn run_config(&self) -> RunConfig {
        let common = self.common();
        let config = RunConfig::for_stage(self.stage(), &common.input_parquet_dir)
            .with_source_column(&common.source_column_name);

        match self {
            Self::Difference {
                target_column_name,
                output_dir,
                ..
            } => config
                .with_target_column(target_column_name)
                .with_output_dir(output_dir),
            Self::Instruction {
                input_jsonal_dir,
                output_dir,
                ..
            }
            | Self::StepImage {
                input_jsonal_dir,
                output_dir,
                ..
            }
            | Self::Critique {
                input_jsonal_dir,
                output_dir,
                ..
            } => config
                .with_input_dir(input_jsonal_dir)
                .with_output_dir(output_dir),
        }
    }

    /// Backend configuration: environment defaults overridden by flags.
    pub fn backend_config(&self) -> OpenAIConfig {
        self.apply_overrides(OpenAIConfig::from_env())
    }

    fn apply_overrides(&self, mut config: OpenAIConfig) -> OpenAIConfig {
        let common = self.common();
        config.api_key = Some(common.api_key.clone());
        if let Some(ref url) = common.base_url {
            config.base_url = url.clone();
        }
        if let Some(timeout) = common.timeout {
            config.timeout_seconds = timeout;
        }
        if common.insecure {
            config.skip_tls_verify = true;
        }
        if let Some(ref model) = common.model {
            match self.stage() {
                StageKind::StepImage => config.edit_model = model.clone(),
                _ => config.vision_model = model.clone(),
            }
        }
        if let Self::StepImage { n, .. } = self {
            config.edit_variants = *n;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_difference_defaults() {
        let cli = parse(&[
            "reedit",
            "difference",
            "--api-key",
            "sk-test",
            "--input-parquet-dir",
            "data/shards",
        ]);
        assert_eq!(cli.command.stage(), StageKind::Difference);

        let run = cli.command.run_config();
        assert_eq!(run.shard_dir, PathBuf::from("data/shards"));
        assert_eq!(run.source_column, "src_img");
        assert_eq!(run.target_column, "edited_img");
        assert_eq!(run.output_dir, PathBuf::from(defaults::DIFFERENCE_DIR));
        assert_eq!(run.input_dir, None);
    }

    #[test]
    fn test_instruction_reads_upstream_dir() {
        let cli = parse(&[
            "reedit",
            "instruction",
            "--api-key",
            "sk-test",
            "--input-parquet-dir",
            "shards",
            "--input-jsonal-dir",
            "out/one",
            "--output-dir",
            "out/two",
            "--source-column-name",
            "before",
        ]);
        let run = cli.command.run_config();
        assert_eq!(run.input_dir, Some(PathBuf::from("out/one")));
        assert_eq!(run.output_dir, PathBuf::from("out/two"));
        assert_eq!(run.source_column, "before");
    }

    #[test]
    fn test_step_image_model_and_variants() {
        let cli = parse(&[
            "reedit",
            "step-image",
            "--api-key",
            "sk-test",
            "--input-parquet-dir",
            "shards",
            "--model",
            "dall-e-2",
            "--n",
            "2",
        ]);
        let config = cli.command.apply_overrides(OpenAIConfig::default());
        assert_eq!(config.edit_model, "dall-e-2");
        assert_eq!(config.vision_model, defaults::VISION_MODEL);
        assert_eq!(config.edit_variants, 2);
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_vision_stage_model_override() {
        let cli = parse(&[
            "reedit",
            "critique",
            "--api-key",
            "sk-test",
            "--input-parquet-dir",
            "shards",
            "--model",
            "gpt-4.1",
            "--base-url",
            "http://localhost:8000/v1",
            "--timeout",
            "30",
        ]);
        let config = cli.command.apply_overrides(OpenAIConfig::default());
        assert_eq!(config.vision_model, "gpt-4.1");
        assert_eq!(config.base_url, "http://localhost:8000/v1");
        assert_eq!(config.timeout_seconds, 30);
        assert!(!config.skip_tls_verify);
        assert_eq!(
            cli.command.run_config().input_dir,
            Some(PathBuf::from(defaults::STEP_IMAGE_DIR))
        );
    }

    #[test]
    fn test_insecure_flag_skips_tls_verification() {
        let cli = parse(&[
            "reedit",
            "difference",
            "--api-key",
            "sk-test",
            "--input-parquet-dir",
            "shards",
            "--base-url",
            "https://localhost:8443/v1",
            "--insecure",
        ]);
        let config = cli.command.apply_overrides(OpenAIConfig::default());
        assert!(config.skip_tls_verify);
    }

    #[test]
    fn test_target_column_only_on_difference() {
        let result = Cli::try_parse_from([
            "reedit",
            "instruction",
            "--api-key",
            "k",
            "--input-parquet-dir",
            "s",
            "--target-column-name",
            "x",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_n_must_be_positive() {
        let result = Cli::try_parse_from([
            "reedit",
            "step-image",
            "--api-key",
            "k",
            "--input-parquet-dir",
            "s",
            "--n",
            "0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_shard_dir_is_required() {
        let result = Cli::try_parse_from(["reedit", "difference", "--api-key", "k"]);
        assert!(result.is_err());
    }
}
