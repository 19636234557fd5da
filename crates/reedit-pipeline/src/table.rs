//! Image tables behind each shard.
//!
//! A shard is a columnar table whose image columns hold either a struct
//! `{bytes, path}` or a bare binary value. [`ShardSource`] abstracts the
//! storage so the runner can be driven from memory in tests.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::{Field, Row};
use parquet::schema::types::Type;
use tracing::debug;

use reedit_core::{Error, Result};

/// One image cell: encoded image bytes plus the logical path, if the table
/// stores one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCell {
    pub bytes: Vec<u8>,
    pub path: Option<String>,
}

impl ImageCell {
    pub fn new(bytes: impl Into<Vec<u8>>, path: Option<&str>) -> Self {
        Self {
            bytes: bytes.into(),
            path: path.map(String::from),
        }
    }
}

/// Read image columns from a shard.
pub trait ShardSource: Send + Sync {
    /// Read the named columns, one `Vec<ImageCell>` per column in the
    /// order requested.
    ///
    /// Fails if any column is absent from the shard.
    fn read_columns(&self, shard: &Path, columns: &[&str]) -> Result<Vec<Vec<ImageCell>>>;
}

/// Parquet-backed shard source.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParquetShardSource;

impl ParquetShardSource {
    fn projection(schema: &Type, columns: &[&str], shard: &Path) -> Result<Type> {
        let fields = schema.get_fields();
        let mut selected = Vec::with_capacity(columns.len());
        for column in columns {
            let field = fields
                .iter()
                .find(|f| f.name() == *column)
                .ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "shard {} has no column '{}'",
                        shard.display(),
                        column
                    ))
                })?;
            if !selected.iter().any(|f: &parquet::schema::types::TypePtr| f.name() == *column) {
                selected.push(field.clone());
            }
        }
        Type::group_type_builder(schema.name())
            .with_fields(selected)
            .build()
            .map_err(|e| Error::Shard(format!("{}: {}", shard.display(), e)))
    }
}

impl ShardSource for ParquetShardSource {
    fn read_columns(&self, shard: &Path, columns: &[&str]) -> Result<Vec<Vec<ImageCell>>> {
        let shard_err = |e: parquet::errors::ParquetError| {
            Error::Shard(format!("{}: {}", shard.display(), e))
        };

        let file = File::open(shard).map_err(|e| {
            Error::NotFound(format!("cannot open shard {}: {}", shard.display(), e))
        })?;
        let reader = SerializedFileReader::new(file).map_err(shard_err)?;
        let projection = Self::projection(
            reader.metadata().file_metadata().schema(),
            columns,
            shard,
        )?;

        let mut out: Vec<Vec<ImageCell>> = vec![Vec::new(); columns.len()];
        for (row_index, row) in reader
            .get_row_iter(Some(projection))
            .map_err(shard_err)?
            .enumerate()
        {
            let row = row.map_err(shard_err)?;
            for (slot, column) in columns.iter().enumerate() {
                out[slot].push(cell_from_row(&row, column).ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "{}: row {} column '{}' is not an image cell",
                        shard.display(),
                        row_index,
                        column
                    ))
                })?);
            }
        }

        debug!(
            shard = %shard.display(),
            rows = out.first().map(Vec::len).unwrap_or(0),
            "Read shard columns"
        );
        Ok(out)
    }
}

fn cell_from_row(row: &Row, column: &str) -> Option<ImageCell> {
    row.get_column_iter()
        .find(|(name, _)| name.as_str() == column)
        .and_then(|(_, field)| cell_from_field(field))
}

fn cell_from_field(field: &Field) -> Option<ImageCell> {
    match field {
        Field::Bytes(bytes) => Some(ImageCell {
            bytes: bytes.data().to_vec(),
            path: None,
        }),
        Field::Group(group) => {
            let mut bytes = None;
            let mut path = None;
            for (name, value) in group.get_column_iter() {
                match (name.as_str(), value) {
                    ("bytes", Field::Bytes(b)) => bytes = Some(b.data().to_vec()),
                    ("path", Field::Str(s)) => path = Some(s.clone()),
                    ("path", Field::Bytes(b)) => {
                        path = Some(String::from_utf8_lossy(b.data()).into_owned())
                    }
                    _ => {}
                }
            }
            bytes.map(|bytes| ImageCell { bytes, path })
        }
        _ => None,
    }
}

/// In-memory shard source keyed by shard path.
///
/// Useful for driving the runner without parquet files on disk; the shard
/// files still have to exist for discovery.
#[derive(Debug, Clone, Default)]
pub struct MemoryShardSource {
    tables: Arc<RwLock<HashMap<PathBuf, HashMap<String, Vec<ImageCell>>>>>,
}

impl MemoryShardSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one column of one shard.
    pub fn insert_column(&self, shard: impl Into<PathBuf>, column: &str, cells: Vec<ImageCell>) {
        let mut tables = self
            .tables
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        tables
            .entry(shard.into())
            .or_default()
            .insert(column.to_string(), cells);
    }

    /// Builder-style [`insert_column`](Self::insert_column).
    pub fn with_column(self, shard: impl Into<PathBuf>, column: &str, cells: Vec<ImageCell>) -> Self {
        self.insert_column(shard, column, cells);
        self
    }
}

impl ShardSource for MemoryShardSource {
    fn read_columns(&self, shard: &Path, columns: &[&str]) -> Result<Vec<Vec<ImageCell>>> {
        let tables = self
            .tables
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let table = tables
            .get(shard)
            .ok_or_else(|| Error::NotFound(format!("no table for shard {}", shard.display())))?;
        columns
            .iter()
            .map(|column| {
                table.get(*column).cloned().ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "shard {} has no column '{}'",
                        shard.display(),
                        column
                    ))
                })
            })
            .collect()
    }
}
