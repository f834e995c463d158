use crate::actions::copy_matches;
use crate::config::Config;
use crate::core::blur::{self, UnreadablePolicy};
use crate::core::discovery::list_images;
use crate::core::duplicate::{DuplicateIndex, DuplicatePolicy};
use crate::core::face::{FaceEncoder, FaceEncoding, FaceMatchRecord, encode_reference};
use crate::core::hash::PerceptualHasher;
use crate::core::image::{ImageRecord, Status, load_image};
use crate::core::stale::{self, cutoff_days_before};
use crate::error::{Error, Result};
use crate::report::{Criterion, FaceReport, ScanReport};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

/// Runs scans over a single folder.
///
/// Per-file evaluation (decode, hash, Laplacian) runs on the rayon pool.
/// Classification and side effects then run in sorted path order, so the
/// outcome does not depend on thread scheduling.
pub struct Sweeper {
    config: Config,
    show_progress: bool,
}

impl Sweeper {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Flag later copies of perceptually identical (or close) images.
    pub fn find_duplicates(&self, dir: &Path, policy: DuplicatePolicy) -> Result<ScanReport> {
        let paths = list_images(dir, &self.config.extensions)?;
        log::info!("Hashing {} image(s) in {}", paths.len(), dir.display());

        let hasher = PerceptualHasher::new();
        let mut records = self.evaluate("Hashing", &paths, |record| {
            match hasher.hash_file(&record.path) {
                Ok(hash) => record.perceptual_hash = Some(hash),
                Err(e) => record.mark_unreadable(&e),
            }
        });

        let mut index = DuplicateIndex::new(policy);
        for record in &mut records {
            classify_duplicate(&mut index, record);
            record.settle();
        }

        Ok(ScanReport::new(dir, Criterion::Duplicates, records))
    }

    /// Flag images whose Laplacian variance falls below the blur threshold.
    pub fn scan_for_blur(&self, dir: &Path) -> Result<ScanReport> {
        let paths = list_images(dir, &self.config.extensions)?;
        let threshold = self.config.blur_threshold;
        let policy = self.config.unreadable;
        log::info!(
            "Checking {} image(s) for blur (threshold {})",
            paths.len(),
            threshold
        );

        let records = self.evaluate("Measuring sharpness", &paths, |record| {
            match blur::sharpness_of_file(&record.path) {
                Ok(score) => record.sharpness = Some(score),
                Err(e) => record.mark_unreadable(&e),
            }
            classify_blur(record, threshold, policy);
            record.settle();
        });

        Ok(ScanReport::new(dir, Criterion::Blur, records))
    }

    /// Flag images last modified strictly before `cutoff`.
    pub fn scan_for_stale(&self, dir: &Path, cutoff: SystemTime) -> Result<ScanReport> {
        let paths = list_images(dir, &self.config.extensions)?;
        log::info!("Checking {} image(s) against cutoff", paths.len());

        let records = self.evaluate("Reading timestamps", &paths, |record| {
            classify_stale(record, cutoff);
            record.settle();
        });

        Ok(ScanReport::new(dir, Criterion::Stale, records))
    }

    /// Run all three checks on every image, decoding each file once.
    ///
    /// Without `cutoff`, anything untouched for `stale_after_days` is stale.
    pub fn analyze(&self, dir: &Path, cutoff: Option<SystemTime>) -> Result<ScanReport> {
        let cutoff = cutoff
            .unwrap_or_else(|| cutoff_days_before(SystemTime::now(), self.config.stale_after_days));
        let paths = list_images(dir, &self.config.extensions)?;
        log::info!("Analyzing {} image(s) in {}", paths.len(), dir.display());

        let hasher = PerceptualHasher::new();
        let mut records = self.evaluate("Analyzing", &paths, |record| {
            match load_image(&record.path) {
                Ok(image) => {
                    record.perceptual_hash = Some(hasher.hash_image(&image));
                    record.sharpness = Some(blur::sharpness(&image));
                }
                Err(e) => record.mark_unreadable(&e),
            }
        });

        let mut index = DuplicateIndex::new(self.config.analyze_duplicates);
        for record in &mut records {
            classify_stale(record, cutoff);
            classify_duplicate(&mut index, record);
            classify_blur(record, self.config.blur_threshold, self.config.unreadable);
            record.settle();
        }

        Ok(ScanReport::new(dir, Criterion::Combined, records))
    }

    /// Compare every image against `reference` and copy matches into the
    /// configured output folder.
    ///
    /// Encoding is sequential because encoders hold mutable detector state.
    pub fn scan_for_matches(
        &self,
        dir: &Path,
        encoder: &mut dyn FaceEncoder,
        reference: &FaceEncoding,
        reference_path: &Path,
        dry_run: bool,
    ) -> Result<FaceReport> {
        let paths = list_images(dir, &self.config.extensions)?;
        let output = self.config.output_folder_for(dir);
        let tolerance = self.config.tolerance;
        log::info!(
            "Comparing {} image(s) against {} (tolerance {})",
            paths.len(),
            reference_path.display(),
            tolerance
        );

        let bar = self.progress_bar("Matching faces", paths.len());
        let mut records = Vec::with_capacity(paths.len());
        for path in &paths {
            let mut record = FaceMatchRecord::new(path);
            record.evaluate(encoder, reference, tolerance);
            records.push(record);
            bar.inc(1);
        }
        bar.finish_and_clear();

        copy_matches(&mut records, &output, dry_run);

        Ok(FaceReport {
            folder: dir.to_path_buf(),
            reference: reference_path.to_path_buf(),
            output_folder: output,
            records,
        })
    }

    /// Encode the reference and run [`Sweeper::scan_for_matches`]. The
    /// folder is checked and the reference encoded before any candidate is
    /// looked at.
    pub fn match_faces(
        &self,
        dir: &Path,
        reference_path: &Path,
        encoder: &mut dyn FaceEncoder,
        dry_run: bool,
    ) -> Result<FaceReport> {
        if !dir.is_dir() {
            return Err(Error::FolderNotFound(dir.to_path_buf()));
        }
        let reference = encode_reference(encoder, reference_path)?;
        self.scan_for_matches(dir, encoder, &reference, reference_path, dry_run)
    }

    fn evaluate<F>(&self, label: &str, paths: &[PathBuf], step: F) -> Vec<ImageRecord>
    where
        F: Fn(&mut ImageRecord) + Sync,
    {
        let bar = self.progress_bar(label, paths.len());
        let records: Vec<ImageRecord> = benchmark(label, || {
            paths
                .par_iter()
                .map(|path| {
                    let mut record = ImageRecord::new(path);
                    step(&mut record);
                    if record.status == Status::Unprocessed {
                        record.status = Status::Evaluated;
                    }
                    bar.inc(1);
                    record
                })
                .collect()
        });
        bar.finish_and_clear();
        records
    }

    fn progress_bar(&self, label: &str, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len as u64);
        let style = ProgressStyle::with_template("{spinner:.green} {msg} [{bar:30}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.set_message(label.to_string());
        bar
    }
}

fn classify_duplicate(index: &mut DuplicateIndex, record: &mut ImageRecord) {
    let Some(hash) = record.perceptual_hash.as_ref() else {
        return;
    };
    if let Some(original) = index.check_and_insert(&record.path, hash) {
        log::debug!(
            "Duplicate found: {} is similar to {}",
            record.path.display(),
            original.display()
        );
        record.is_duplicate = true;
        record.duplicate_of = Some(original);
    }
}

fn classify_blur(record: &mut ImageRecord, threshold: f64, policy: UnreadablePolicy) {
    record.is_blurry = match record.sharpness {
        Some(score) => blur::is_below_threshold(score, threshold),
        None => record.unreadable && policy == UnreadablePolicy::Flag,
    };
}

fn classify_stale(record: &mut ImageRecord, cutoff: SystemTime) {
    if let Some(modified) = record.modified() {
        record.is_stale = stale::is_before(modified, cutoff);
    }
}

/// Run `f()`, log how long it took (with `label`), and return its result.
fn benchmark<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
    let start = Instant::now();
    let result = f();
    log::debug!("{} took {:.2?}", label, start.elapsed());
    result
}
