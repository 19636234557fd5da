//! reedit: build a multi-stage image re-editing dataset from parquet shards.
//!
//! Each subcommand runs one stage over every shard in `--input-parquet-dir`
//! and writes one `<shard>.jsonal` record file per shard:
//!
//! ```bash
//! reedit difference  --api-key sk-... --input-parquet-dir data/
//! reedit instruction --api-key sk-... --input-parquet-dir data/
//! reedit step-image  --api-key sk-... --input-parquet-dir data/
//! reedit critique    --api-key sk-... --input-parquet-dir data/
//! ```

mod cli;
mod logging;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use reedit_inference::OpenAIBackend;
use reedit_pipeline::{
    CritiqueStage, DifferenceStage, InstructionStage, ParquetShardSource, RunSummary, ShardState,
    Stage, StageKind, StageRunner, StepImageStage,
};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _log_guard = logging::init();

    match run(cli.command).await {
        Ok(summary) => {
            print_summary(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %format!("{:#}", e), "Stage run failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> anyhow::Result<RunSummary> {
    let kind = command.stage();
    let backend = Arc::new(
        OpenAIBackend::new(command.backend_config())
            .context("failed to configure the OpenAI-compatible backend")?,
    );
    let model = match kind {
        StageKind::StepImage => backend.config().edit_model.clone(),
        _ => backend.config().vision_model.clone(),
    };
    info!(stage = %kind, model = %model, base_url = %backend.config().base_url, "Backend ready");

    let stage: Arc<dyn Stage> = match kind {
        StageKind::Difference => Arc::new(DifferenceStage::new(backend)),
        StageKind::Instruction => Arc::new(InstructionStage::new(backend)),
        StageKind::StepImage => Arc::new(StepImageStage::new(backend)),
        StageKind::Critique => Arc::new(CritiqueStage::new(backend)),
    };

    let config = command.run_config();
    let shard_dir = config.shard_dir.clone();
    StageRunner::new(stage, Arc::new(ParquetShardSource), config)
        .run()
        .await
        .with_context(|| format!("{} stage failed for {}", kind, shard_dir.display()))
}

fn print_summary(summary: &RunSummary) {
    for shard in &summary.shards {
        println!(
            "{}\t{} rows\t{} raw\t{:.1}s\t{}",
            shard.label,
            shard.rows,
            shard.raw_fallbacks,
            shard.elapsed.as_secs_f64(),
            shard.output.display()
        );
    }
    println!(
        "{}: {} shards, {} rows, {} raw responses in {:.1}s",
        summary.stage,
        summary.shards.len(),
        summary.total_rows(),
        summary.raw_fallbacks(),
        summary.elapsed.as_secs_f64()
    );
    if let Some(next) = ShardState::after(summary.stage).next_stage() {
        println!("next: reedit {}", next.as_str().replace('_', "-"));
    }
}
