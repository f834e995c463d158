use crate::core::face::FaceMatchRecord;
use crate::core::image::{ImageRecord, Status};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Which check produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    Duplicates,
    Blur,
    Stale,
    Faces,
    Combined,
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Criterion::Duplicates => "duplicate",
            Criterion::Blur => "blurry",
            Criterion::Stale => "stale",
            Criterion::Faces => "matching",
            Criterion::Combined => "flagged",
        };
        f.write_str(name)
    }
}

/// How a run ended, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Nothing matched the criterion.
    NothingFound,
    /// Items were flagged and every requested side effect succeeded.
    Success,
    /// At least one side effect failed.
    PartialSuccess,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub scanned: usize,
    pub flagged: usize,
    /// Deleted files, or copied files for a face scan.
    pub handled: usize,
    pub failed: usize,
    pub unreadable: usize,
}

impl Summary {
    pub fn outcome(&self) -> Outcome {
        if self.flagged == 0 {
            Outcome::NothingFound
        } else if self.failed > 0 {
            Outcome::PartialSuccess
        } else {
            Outcome::Success
        }
    }
}

/// Result of a duplicate, blur, stale or combined scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub folder: PathBuf,
    pub criterion: Criterion,
    pub records: Vec<ImageRecord>,
}

impl ScanReport {
    pub fn new(folder: &Path, criterion: Criterion, records: Vec<ImageRecord>) -> Self {
        Self {
            folder: folder.to_path_buf(),
            criterion,
            records,
        }
    }

    pub fn flagged(&self) -> impl Iterator<Item = &ImageRecord> {
        self.records.iter().filter(|r| r.is_flagged())
    }

    pub fn flagged_paths(&self) -> Vec<PathBuf> {
        self.flagged().map(|r| r.path.clone()).collect()
    }

    pub fn summary(&self) -> Summary {
        Summary {
            scanned: self.records.len(),
            flagged: self.flagged().count(),
            handled: self
                .records
                .iter()
                .filter(|r| r.status == Status::Deleted)
                .count(),
            failed: self
                .records
                .iter()
                .filter(|r| r.status == Status::Flagged && r.side_effect_failed())
                .count(),
            unreadable: self.records.iter().filter(|r| r.unreadable).count(),
        }
    }
}

/// Result of a face match scan.
#[derive(Debug, Clone, Serialize)]
pub struct FaceReport {
    pub folder: PathBuf,
    pub reference: PathBuf,
    pub output_folder: PathBuf,
    pub records: Vec<FaceMatchRecord>,
}

impl FaceReport {
    pub fn matched_paths(&self) -> Vec<PathBuf> {
        self.records
            .iter()
            .filter(|r| r.matched)
            .map(|r| r.path.clone())
            .collect()
    }

    pub fn summary(&self) -> Summary {
        Summary {
            scanned: self.records.len(),
            flagged: self.records.iter().filter(|r| r.matched).count(),
            handled: self
                .records
                .iter()
                .filter(|r| r.status == Status::Copied)
                .count(),
            failed: self
                .records
                .iter()
                .filter(|r| r.matched && r.status == Status::Flagged && !r.errors.is_empty())
                .count(),
            unreadable: 0,
        }
    }
}
