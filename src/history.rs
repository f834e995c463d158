use crate::error::{Error, Result};
use crate::report::Criterion;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Journal file kept in each swept folder, one JSON record per line.
pub const HISTORY_FILE: &str = ".imgsweep-history.jsonl";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Deleted,
    Copied,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub timestamp: String,
    pub action: Action,
    pub criterion: Criterion,
    pub done: Vec<String>,
    pub failed: Vec<String>,
}

impl HistoryRecord {
    pub fn new(action: Action, criterion: Criterion, done: Vec<String>, failed: Vec<String>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            action,
            criterion,
            done,
            failed,
        }
    }
}

pub fn history_path(folder: &Path) -> PathBuf {
    folder.join(HISTORY_FILE)
}

/// Append one record to the folder's journal.
pub fn append(folder: &Path, record: &HistoryRecord) -> Result<()> {
    let path = history_path(folder);
    let mut out = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| Error::io(&path, e))?;
    writeln!(out, "{}", serde_json::to_string(record)?).map_err(|e| Error::io(&path, e))?;
    Ok(())
}

/// Read the journal. Malformed lines are logged and skipped; a folder that
/// has never been swept has an empty history.
pub fn read(folder: &Path) -> Result<Vec<HistoryRecord>> {
    let path = history_path(folder);
    let file = match File::open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::io(&path, e)),
    };

    let mut records = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| Error::io(&path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<HistoryRecord>(&line) {
            Ok(record) => records.push(record),
            Err(err) => log::warn!("Skipping malformed history entry {}: {}", i, err),
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_append_then_read() {
        let temp_dir = TempDir::new().unwrap();
        append(
            temp_dir.path(),
            &HistoryRecord::new(
                Action::Deleted,
                Criterion::Blur,
                vec!["a.jpg".into()],
                vec!["b.jpg".into()],
            ),
        )
        .unwrap();
        append(
            temp_dir.path(),
            &HistoryRecord::new(Action::Copied, Criterion::Faces, vec!["c.jpg".into()], vec![]),
        )
        .unwrap();

        let records = read(temp_dir.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].action, Action::Deleted);
        assert_eq!(records[0].failed, vec!["b.jpg"]);
        assert_eq!(records[1].criterion, Criterion::Faces);
    }

    #[test]
    fn test_missing_history_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        assert!(read(temp_dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let good = serde_json::to_string(&HistoryRecord::new(
            Action::Deleted,
            Criterion::Stale,
            vec!["old.jpg".into()],
            vec![],
        ))
        .unwrap();
        fs::write(
            history_path(temp_dir.path()),
            format!("{{not json\n{}\n\n", good),
        )
        .unwrap();

        let records = read(temp_dir.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].done, vec!["old.jpg"]);
    }
}
