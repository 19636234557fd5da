//! Stage runner: walks shards in order and drives one stage over every row.
//!
//! Before the first model call every shard is read and paired with its
//! records (a fresh seed for stage 1, the upstream record otherwise), so
//! input errors in any shard abort the run while nothing has been spent.
//! Shards are then read again one at a time, the stage is called once per
//! row in order, and the shard's output file is written. Any error aborts
//! the whole run; the output file of the shard being processed is only
//! written once all of its rows are done.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use reedit_core::{defaults, Error, ModelResponse, Record, Result, StageKind};

use crate::records::{load_records, record_path, save_records};
use crate::shard::{discover_shards, ShardId};
use crate::stage::{RowContext, RowImages, Stage};
use crate::table::{ImageCell, ShardSource};

/// Configuration for one stage run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory holding the parquet shards.
    pub shard_dir: PathBuf,
    /// Directory holding the upstream stage's record files. Unused by
    /// stage 1.
    pub input_dir: Option<PathBuf>,
    /// Directory this stage writes its record files to.
    pub output_dir: PathBuf,
    /// Name of the source image column.
    pub source_column: String,
    /// Name of the target image column. Only read by stage 1.
    pub target_column: String,
}

impl RunConfig {
    /// Defaults for `stage`: the conventional output directory and, for
    /// stages 2-4, the upstream stage's conventional output directory as
    /// input.
    pub fn for_stage(stage: StageKind, shard_dir: impl Into<PathBuf>) -> Self {
        Self {
            shard_dir: shard_dir.into(),
            input_dir: stage.default_input_dir().map(PathBuf::from),
            output_dir: PathBuf::from(stage.default_output_dir()),
            source_column: defaults::SOURCE_COLUMN.to_string(),
            target_column: defaults::TARGET_COLUMN.to_string(),
        }
    }

    /// Set the upstream record directory.
    pub fn with_input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.input_dir = Some(dir.into());
        self
    }

    /// Set the output record directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the source image column name.
    pub fn with_source_column(mut self, column: impl Into<String>) -> Self {
        self.source_column = column.into();
        self
    }

    /// Set the target image column name.
    pub fn with_target_column(mut self, column: impl Into<String>) -> Self {
        self.target_column = column.into();
        self
    }
}

/// Outcome for one shard.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardReport {
    pub label: String,
    pub index: i64,
    pub rows: usize,
    /// Path of the record file written.
    pub output: PathBuf,
    /// Rows whose model reply was stored as raw text.
    pub raw_fallbacks: usize,
    pub elapsed: Duration,
}

/// Outcome of a complete stage run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub stage: StageKind,
    pub shards: Vec<ShardReport>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn total_rows(&self) -> usize {
        self.shards.iter().map(|s| s.rows).sum()
    }

    pub fn raw_fallbacks(&self) -> usize {
        self.shards.iter().map(|s| s.raw_fallbacks).sum()
    }
}

/// Runs one stage over every discovered shard, strictly sequentially.
pub struct StageRunner {
    stage: Arc<dyn Stage>,
    source: Arc<dyn ShardSource>,
    config: RunConfig,
}

impl StageRunner {
    pub fn new(stage: Arc<dyn Stage>, source: Arc<dyn ShardSource>, config: RunConfig) -> Self {
        Self {
            stage,
            source,
            config,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run the stage over all shards.
    pub async fn run(&self) -> Result<RunSummary> {
        let kind = self.stage.kind();
        let start = Instant::now();

        let shards = discover_shards(&self.config.shard_dir)?;
        info!(
            stage = %kind,
            shard_dir = %self.config.shard_dir.display(),
            output_dir = %self.config.output_dir.display(),
            shards = shards.len(),
            "Starting stage run"
        );

        let input_dir = self.preflight(kind, &shards)?;
        if !shards.is_empty() && !self.stage.health_check().await.unwrap_or(false) {
            warn!(stage = %kind, "Backend health check failed, continuing");
        }

        let mut reports = Vec::with_capacity(shards.len());
        for shard in &shards {
            reports.push(self.run_shard(kind, shard, input_dir).await?);
        }

        let summary = RunSummary {
            stage: kind,
            shards: reports,
            elapsed: start.elapsed(),
        };
        info!(
            stage = %kind,
            shards = summary.shards.len(),
            rows = summary.total_rows(),
            raw_fallbacks = summary.raw_fallbacks(),
            duration_ms = summary.elapsed.as_millis() as u64,
            "Stage run complete"
        );
        Ok(summary)
    }

    /// Validate every shard's input before any model call.
    ///
    /// Upstream record files are checked for existence first so a missing
    /// file is reported before any table is read. Then each shard's columns
    /// are read and paired with its records; the results are dropped so only
    /// one shard's images are held at a time.
    fn preflight(&self, kind: StageKind, shards: &[ShardId]) -> Result<Option<&Path>> {
        let input_dir = match kind.upstream() {
            None => None,
            Some(upstream) => {
                let input_dir = self.config.input_dir.as_deref().ok_or_else(|| {
                    Error::Config(format!(
                        "{} stage needs the {} record directory",
                        kind, upstream
                    ))
                })?;
                for shard in shards {
                    let path = record_path(input_dir, &shard.label);
                    if !path.is_file() {
                        return Err(Error::NotFound(format!(
                            "{} record file {} for shard {}",
                            upstream,
                            path.display(),
                            shard.path.display()
                        )));
                    }
                }
                Some(input_dir)
            }
        };

        for shard in shards {
            let (rows, _) = self.prepare_shard(kind, shard, input_dir)?;
            debug!(stage = %kind, shard = %shard.label, rows = rows.len(), "Shard input valid");
        }
        Ok(input_dir)
    }

    /// Read a shard's rows and pair them with their records.
    fn prepare_shard(
        &self,
        kind: StageKind,
        shard: &ShardId,
        input_dir: Option<&Path>,
    ) -> Result<(Vec<RowImages>, Vec<Record>)> {
        let rows = self.read_rows(kind, shard)?;
        let records: Vec<Record> = match input_dir {
            None => rows
                .iter()
                .map(|row| {
                    Record::seed(
                        row.source.path.clone(),
                        row.target.as_ref().and_then(|t| t.path.clone()),
                    )
                })
                .collect(),
            Some(dir) => {
                let records = load_records(&record_path(dir, &shard.label))?;
                validate_correlation(kind, shard, &rows, &records)?;
                records
            }
        };
        Ok((rows, records))
    }

    async fn run_shard(
        &self,
        kind: StageKind,
        shard: &ShardId,
        input_dir: Option<&Path>,
    ) -> Result<ShardReport> {
        let start = Instant::now();
        let (rows, records) = self.prepare_shard(kind, shard, input_dir)?;

        info!(
            stage = %kind,
            shard = %shard.label,
            rows = rows.len(),
            "Processing shard"
        );

        let mut output = Vec::with_capacity(rows.len());
        let mut raw_fallbacks = 0;
        for (row, (images, record)) in rows.iter().zip(records).enumerate() {
            let ctx = RowContext {
                shard: &shard.label,
                row,
                images,
            };
            let record = self.stage.process(ctx, record).await?;
            if output_response(kind, &record).is_some_and(|r| !r.is_structured()) {
                raw_fallbacks += 1;
            }
            debug!(stage = %kind, shard = %shard.label, row, "Row processed");
            output.push(record);
        }

        let path = record_path(&self.config.output_dir, &shard.label);
        save_records(&path, &output)?;

        let report = ShardReport {
            label: shard.label.clone(),
            index: shard.index,
            rows: output.len(),
            output: path,
            raw_fallbacks,
            elapsed: start.elapsed(),
        };
        info!(
            stage = %kind,
            shard = %report.label,
            rows = report.rows,
            raw_fallbacks = report.raw_fallbacks,
            output = %report.output.display(),
            duration_ms = report.elapsed.as_millis() as u64,
            "Shard complete"
        );
        Ok(report)
    }

    /// Read the image columns the stage needs and zip them into rows.
    fn read_rows(&self, kind: StageKind, shard: &ShardId) -> Result<Vec<RowImages>> {
        let mut columns = vec![self.config.source_column.as_str()];
        if kind.needs_target_image() {
            columns.push(self.config.target_column.as_str());
        }

        let mut data = self.source.read_columns(&shard.path, &columns)?;
        let targets: Option<Vec<ImageCell>> = if kind.needs_target_image() {
            data.pop()
        } else {
            None
        };
        let sources = data.pop().ok_or_else(|| {
            Error::Internal(format!(
                "shard source returned no '{}' column",
                self.config.source_column
            ))
        })?;

        match targets {
            None => Ok(sources
                .into_iter()
                .map(|source| RowImages {
                    source,
                    target: None,
                })
                .collect()),
            Some(targets) => {
                if targets.len() != sources.len() {
                    return Err(Error::LengthMismatch {
                        what: format!(
                            "'{}' vs '{}' in shard {}",
                            self.config.target_column, self.config.source_column, shard.label
                        ),
                        expected: sources.len(),
                        actual: targets.len(),
                    });
                }
                Ok(sources
                    .into_iter()
                    .zip(targets)
                    .map(|(source, target)| RowImages {
                        source,
                        target: Some(target),
                    })
                    .collect())
            }
        }
    }
}

/// Check upstream records line up with the shard rows one-to-one.
///
/// Counts must match, each record's `source` must equal its row's source
/// image path, and each record must carry the fields the stage reads.
fn validate_correlation(
    kind: StageKind,
    shard: &ShardId,
    rows: &[RowImages],
    records: &[Record],
) -> Result<()> {
    if records.len() != rows.len() {
        return Err(Error::LengthMismatch {
            what: format!("records vs rows in shard {}", shard.label),
            expected: rows.len(),
            actual: records.len(),
        });
    }

    for (i, (row, record)) in rows.iter().zip(records).enumerate() {
        if record.source != row.source.path {
            return Err(Error::Correlation(format!(
                "shard {} row {}: record source {:?} does not match image path {:?}",
                shard.label, i, record.source, row.source.path
            )));
        }
        let missing = record.missing_inputs(kind);
        if !missing.is_empty() {
            return Err(Error::InvalidInput(format!(
                "shard {} row {}: record is missing {} (state {:?}, {} needs {:?})",
                shard.label,
                i,
                missing.join(", "),
                record.state(),
                kind,
                kind.requires()
            )));
        }
    }
    Ok(())
}

fn output_response(kind: StageKind, record: &Record) -> Option<&ModelResponse> {
    match kind {
        StageKind::Difference => record.difference.as_ref(),
        StageKind::Instruction => record.edit.as_ref(),
        StageKind::StepImage => None,
        StageKind::Critique => record.cot_reedit.as_ref(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(paths: &[&str]) -> Vec<RowImages> {
        paths
            .iter()
            .map(|p| RowImages {
                source: ImageCell::new(vec![0], Some(*p)),
                target: None,
            })
            .collect()
    }

    fn shard() -> ShardId {
        ShardId::from_path("train-00000-of-00001.parquet")
    }

    #[test]
    fn test_run_config_defaults() {
        let c = RunConfig::for_stage(StageKind::Instruction, "shards");
        assert_eq!(c.input_dir, Some(PathBuf::from(defaults::DIFFERENCE_DIR)));
        assert_eq!(c.output_dir, PathBuf::from(defaults::INSTRUCTION_DIR));
        assert_eq!(c.source_column, "src_img");

        let c = RunConfig::for_stage(StageKind::Difference, "shards").with_output_dir("out");
        assert_eq!(c.input_dir, None);
        assert_eq!(c.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_validate_count_mismatch() {
        let records = vec![Record::seed(Some("a".into()), None)];
        let err = validate_correlation(
            StageKind::Instruction,
            &shard(),
            &rows(&["a", "b"]),
            &records,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::LengthMismatch {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_validate_source_mismatch() {
        let records = vec![Record {
            difference: Some(ModelResponse::Raw("x".into())),
            ..Record::seed(Some("z".into()), None)
        }];
        let err = validate_correlation(StageKind::Instruction, &shard(), &rows(&["a"]), &records)
            .unwrap_err();
        assert!(matches!(err, Error::Correlation(_)));
    }

    #[test]
    fn test_validate_missing_field() {
        let records = vec![Record::seed(Some("a".into()), None)];
        let err = validate_correlation(StageKind::Instruction, &shard(), &rows(&["a"]), &records)
            .unwrap_err();
        assert!(err.to_string().contains("difference"));
    }

    #[test]
    fn test_summary_totals() {
        let report = |rows, raw| ShardReport {
            label: "00000".into(),
            index: 0,
            rows,
            output: PathBuf::from("x"),
            raw_fallbacks: raw,
            elapsed: Duration::ZERO,
        };
        let summary = RunSummary {
            stage: StageKind::Difference,
            shards: vec![report(2, 1), report(3, 0)],
            elapsed: Duration::ZERO,
        };
        assert_eq!(summary.total_rows(), 5);
        assert_eq!(summary.raw_fallbacks(), 1);
    }
}
