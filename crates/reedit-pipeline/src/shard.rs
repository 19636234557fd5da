//! Shard discovery and ordering.
//!
//! Shards are parquet files named like `train-00002-of-00010.parquet`. The
//! numeric segment after `train-` is the shard index; processing order and
//! record file names both derive from it.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use reedit_core::{defaults, Error, Result};

/// One discovered shard file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardId {
    /// Full path to the shard file.
    pub path: PathBuf,
    /// Numeric index, or [`defaults::UNINDEXED_SHARD`] if the name has none.
    pub index: i64,
    /// Label used for the record file name: the index digits as they appear
    /// in the file name, or the file stem for unindexed shards.
    pub label: String,
}

impl ShardId {
    /// Build a shard id from a file path.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = file_name(&path);
        match index_digits(&name).and_then(|d| d.parse::<i64>().ok().map(|i| (d, i))) {
            Some((digits, index)) => Self {
                label: digits.to_string(),
                index,
                path,
            },
            None => Self {
                label: path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or(name),
                index: defaults::UNINDEXED_SHARD,
                path,
            },
        }
    }

    /// Whether the file name carried a numeric index.
    pub fn is_indexed(&self) -> bool {
        self.index != defaults::UNINDEXED_SHARD
    }

    fn file_name(&self) -> String {
        file_name(&self.path)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn index_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let pattern = format!(r"{}-(\d+)-", regex::escape(defaults::SHARD_INDEX_TOKEN));
        Regex::new(&pattern).expect("shard index pattern is a valid regex")
    })
}

fn index_digits(name: &str) -> Option<&str> {
    index_pattern()
        .captures(name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Extract the numeric shard index from a file name.
///
/// Returns [`defaults::UNINDEXED_SHARD`] when the name does not match
/// `train-<digits>-`.
pub fn parse_shard_index(name: &str) -> i64 {
    index_digits(name)
        .and_then(|d| d.parse().ok())
        .unwrap_or(defaults::UNINDEXED_SHARD)
}

/// List shard files in `dir`, ordered by numeric index.
///
/// Only regular files ending in `.parquet` are considered; names starting
/// with `._` (resource-fork artifacts) are skipped. Unindexed shards sort
/// first, then ties break on file name so the order is total.
pub fn discover_shards(dir: &Path) -> Result<Vec<ShardId>> {
    if !dir.is_dir() {
        return Err(Error::NotFound(format!(
            "shard directory {} does not exist",
            dir.display()
        )));
    }

    let mut shards = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = file_name(&path);

        if name.starts_with(defaults::HIDDEN_PREFIX) {
            debug!(file = %name, "Skipping hidden shard artifact");
            continue;
        }
        let is_shard = path
            .extension()
            .is_some_and(|ext| ext == defaults::SHARD_EXTENSION);
        if !is_shard || !entry.file_type()?.is_file() {
            continue;
        }
        shards.push(ShardId::from_path(path));
    }

    shards.sort_by(|a, b| {
        a.index
            .cmp(&b.index)
            .then_with(|| a.file_name().cmp(&b.file_name()))
    });
    debug!(dir = %dir.display(), count = shards.len(), "Discovered shards");
    Ok(shards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn test_parse_shard_index() {
        assert_eq!(parse_shard_index("train-00002-of-00010.parquet"), 2);
        assert_eq!(parse_shard_index("train-00010-of-00010.parquet"), 10);
        assert_eq!(parse_shard_index("data.parquet"), defaults::UNINDEXED_SHARD);
        assert_eq!(parse_shard_index("train-.parquet"), defaults::UNINDEXED_SHARD);
    }

    #[test]
    fn test_shard_id_label_keeps_digits() {
        let id = ShardId::from_path("/data/train-00002-of-00010.parquet");
        assert_eq!(id.index, 2);
        assert_eq!(id.label, "00002");
        assert!(id.is_indexed());
    }

    #[test]
    fn test_unindexed_shard_uses_stem() {
        let id = ShardId::from_path("/data/extra.parquet");
        assert_eq!(id.index, -1);
        assert_eq!(id.label, "extra");
        assert!(!id.is_indexed());
    }

    #[test]
    fn test_discover_orders_numerically() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "train-00010-of-00011.parquet");
        touch(dir.path(), "train-00002-of-00011.parquet");
        touch(dir.path(), "train-00000-of-00011.parquet");

        let labels: Vec<String> = discover_shards(dir.path())
            .unwrap()
            .into_iter()
            .map(|s| s.label)
            .collect();
        assert_eq!(labels, vec!["00000", "00002", "00010"]);
    }

    #[test]
    fn test_discover_skips_hidden_and_other_files() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "._train-00000-of-00001.parquet");
        touch(dir.path(), "train-00000-of-00001.parquet");
        touch(dir.path(), "README.md");
        std::fs::create_dir(dir.path().join("nested.parquet")).unwrap();

        let shards = discover_shards(dir.path()).unwrap();
        assert_eq!(shards.len(), 1);
        assert_eq!(shards[0].label, "00000");
    }

    #[test]
    fn test_discover_empty_dir() {
        let dir = TempDir::new().unwrap();
        assert!(discover_shards(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_discover_missing_dir() {
        let dir = TempDir::new().unwrap();
        let err = discover_shards(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_unindexed_sorts_first_then_by_name() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "train-00001-of-00002.parquet");
        touch(dir.path(), "zeta.parquet");
        touch(dir.path(), "alpha.parquet");

        let labels: Vec<String> = discover_shards(dir.path())
            .unwrap()
            .into_iter()
            .map(|s| s.label)
            .collect();
        assert_eq!(labels, vec!["alpha", "zeta", "00001"]);
    }
}
