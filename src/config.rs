use crate::core::blur::{DEFAULT_BLUR_THRESHOLD, UnreadablePolicy};
use crate::core::discovery::default_extensions;
use crate::core::duplicate::DuplicatePolicy;
use crate::core::face::{DEFAULT_OUTPUT_FOLDER, DEFAULT_TOLERANCE};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for a sweep. Every field has a default, so a config file only
/// needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Policy for the standalone duplicate scan.
    pub duplicates: DuplicatePolicy,

    /// Policy for the combined analysis.
    pub analyze_duplicates: DuplicatePolicy,

    /// Laplacian variance below which an image is blurry.
    pub blur_threshold: f64,

    pub unreadable: UnreadablePolicy,

    /// Age in days past which the combined analysis calls a file stale when
    /// no explicit cutoff is given.
    pub stale_after_days: u64,

    /// Face distance below which a candidate matches the reference.
    pub tolerance: f64,

    /// Where matched faces are copied; relative paths sit inside the scanned
    /// folder.
    pub output_folder: PathBuf,

    /// SeetaFace frontal detector model.
    pub face_model: Option<PathBuf>,

    /// File extensions treated as images (case-insensitive).
    pub extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            duplicates: DuplicatePolicy::Exact,
            analyze_duplicates: DuplicatePolicy::Hamming { below: 5 },
            blur_threshold: DEFAULT_BLUR_THRESHOLD,
            unreadable: UnreadablePolicy::Skip,
            stale_after_days: 365,
            tolerance: DEFAULT_TOLERANCE,
            output_folder: PathBuf::from(DEFAULT_OUTPUT_FOLDER),
            face_model: None,
            extensions: default_extensions(),
        }
    }
}

impl Config {
    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config: Config = toml::from_str(&text)
            .map_err(|e| Error::Configuration(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.blur_threshold.is_finite() || self.blur_threshold < 0.0 {
            return Err(Error::Configuration(format!(
                "blur_threshold must be a non-negative number, got {}",
                self.blur_threshold
            )));
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(Error::Configuration(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        for policy in [self.duplicates, self.analyze_duplicates] {
            if let DuplicatePolicy::Hamming { below: 0 } = policy {
                return Err(Error::Configuration(
                    "hamming threshold of 0 never matches; use mode = \"exact\"".to_string(),
                ));
            }
        }
        if self.extensions.is_empty() {
            return Err(Error::Configuration("extensions must not be empty".to_string()));
        }
        if self.output_folder.as_os_str().is_empty() {
            return Err(Error::Configuration("output_folder must not be empty".to_string()));
        }
        Ok(())
    }

    /// Resolve the match output folder against the scanned folder.
    pub fn output_folder_for(&self, scanned: &Path) -> PathBuf {
        if self.output_folder.is_absolute() {
            self.output_folder.clone()
        } else {
            scanned.join(&self.output_folder)
        }
    }
}
