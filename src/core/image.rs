use crate::core::hash::PerceptualHash;
use crate::error::{Error, Result};
use chrono::{DateTime, Local};
use image::{DynamicImage, ImageReader};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Lifecycle of a record through a scan.
///
/// `Unprocessed -> Evaluated -> {Flagged, Clear}`, then `Flagged -> Deleted`
/// or `Flagged -> Copied` once the side effect succeeds. A failed side effect
/// leaves the record `Flagged` with the failure in `action_error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Unprocessed,
    Evaluated,
    Flagged,
    Clear,
    Deleted,
    Copied,
}

/// Per-file classification produced by a scan.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRecord {
    pub path: PathBuf,
    pub last_modified: Option<DateTime<Local>>,
    pub perceptual_hash: Option<PerceptualHash>,
    pub sharpness: Option<f64>,
    pub is_duplicate: bool,
    pub is_blurry: bool,
    pub is_stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<PathBuf>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub unreadable: bool,
    pub status: Status,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Why the delete failed, when it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_error: Option<String>,
    #[serde(skip)]
    modified: Option<SystemTime>,
}

impl ImageRecord {
    /// Create an unprocessed record, reading the file's modification time.
    pub fn new(path: &Path) -> Self {
        let mut record = ImageRecord {
            path: path.to_path_buf(),
            last_modified: None,
            perceptual_hash: None,
            sharpness: None,
            is_duplicate: false,
            is_blurry: false,
            is_stale: false,
            duplicate_of: None,
            unreadable: false,
            status: Status::Unprocessed,
            errors: Vec::new(),
            action_error: None,
            modified: None,
        };

        match fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => {
                record.modified = Some(modified);
                record.last_modified = Some(DateTime::<Local>::from(modified));
            }
            Err(e) => record.push_error(&Error::io(path, e)),
        }

        record
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    pub fn is_flagged(&self) -> bool {
        self.is_duplicate || self.is_blurry || self.is_stale
    }

    pub fn push_error(&mut self, error: &Error) {
        self.errors.push(error.to_string());
    }

    /// Record a failed decode and mark the file unreadable.
    pub fn mark_unreadable(&mut self, error: &Error) {
        log::warn!("{}", error);
        self.unreadable = true;
        self.push_error(error);
    }

    /// Keep the record `Flagged` and remember why its side effect failed.
    pub fn record_side_effect_failure(&mut self, message: String) {
        self.status = Status::Flagged;
        self.action_error = Some(message);
    }

    pub fn side_effect_failed(&self) -> bool {
        self.action_error.is_some()
    }

    /// Settle an evaluated record into `Flagged` or `Clear`.
    pub fn settle(&mut self) {
        self.status = if self.is_flagged() {
            Status::Flagged
        } else {
            Status::Clear
        };
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned()
    }
}

/// Open and decode an image, sniffing the format from content first.
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    let reader = ImageReader::open(path)
        .map_err(|e| Error::io(path, e))?
        .with_guessed_format()
        .map_err(|e| Error::io(path, e))?;

    reader.decode().map_err(|source| Error::UnreadableImage {
        path: path.to_path_buf(),
        source,
    })
}
