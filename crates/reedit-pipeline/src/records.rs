//! Record files: one compact JSON object per line, `<label>.jsonal`.

use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use reedit_core::{defaults, Error, Record, Result};

/// Path of the record file for shard `label` inside `dir`.
pub fn record_path(dir: &Path, label: &str) -> PathBuf {
    dir.join(format!("{}.{}", label, defaults::RECORD_EXTENSION))
}

/// Read every record in a record file, in line order.
///
/// Blank lines are skipped. A line that is not a valid record fails the
/// whole load with its 1-based line number.
pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    let file = fs::File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(format!("record file {}", path.display()))
        } else {
            Error::Io(e)
        }
    })?;

    let mut records = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: Record = serde_json::from_str(&line).map_err(|e| {
            Error::Serialization(format!("{} line {}: {}", path.display(), i + 1, e))
        })?;
        records.push(record);
    }

    debug!(path = %path.display(), count = records.len(), "Loaded records");
    Ok(records)
}

/// Write records to `path`, replacing any existing file.
///
/// Parent directories are created as needed.
pub fn save_records(path: &Path, records: &[Record]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(fs::File::create(path)?);
    for record in records {
        writer.write_all(record.to_json_line()?.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    debug!(path = %path.display(), count = records.len(), "Saved records");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reedit_core::ModelResponse;
    use tempfile::TempDir;

    #[test]
    fn test_record_path() {
        assert_eq!(
            record_path(Path::new("out/_1_difference"), "00002"),
            PathBuf::from("out/_1_difference/00002.jsonal")
        );
    }

    #[test]
    fn test_save_then_load_preserves_order_and_fields() {
        let dir = TempDir::new().unwrap();
        let path = record_path(&dir.path().join("nested/dir"), "00000");
        let records = vec![
            Record {
                difference: Some(ModelResponse::structured([("1", "sky")])),
                ..Record::seed(Some("a.jpg".into()), Some("b.jpg".into()))
            },
            Record {
                difference: Some(ModelResponse::Raw("oops".into())),
                ..Record::seed(Some("c.jpg".into()), Some("d.jpg".into()))
            },
        ];

        save_records(&path, &records).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.ends_with('\n'));

        assert_eq!(load_records(&path).unwrap(), records);
    }

    #[test]
    fn test_save_truncates_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("00000.jsonal");
        let seed = Record::seed(Some("a".into()), None);
        save_records(&path, &[seed.clone(), seed.clone()]).unwrap();
        save_records(&path, &[seed]).unwrap();
        assert_eq!(load_records(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_load_skips_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("00000.jsonal");
        std::fs::write(
            &path,
            "{\"source\":\"a\",\"target\":null}\n\n   \n{\"source\":\"b\",\"target\":null}\n",
        )
        .unwrap();
        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].source.as_deref(), Some("b"));
    }

    #[test]
    fn test_load_reports_bad_line_number() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("00000.jsonal");
        std::fs::write(&path, "{\"source\":\"a\"}\nnot json\n").unwrap();
        let err = load_records(&path).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load_records(&dir.path().join("absent.jsonal")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
