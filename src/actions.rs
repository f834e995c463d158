use crate::core::face::FaceMatchRecord;
use crate::core::image::{ImageRecord, Status};
use crate::error::Error;
use std::fs;
use std::path::Path;

/// Delete every flagged record's file, one at a time.
///
/// A failure is logged and attached to its record; the remaining files are
/// still processed. With `dry_run` nothing is touched.
pub fn delete_flagged(records: &mut [ImageRecord], dry_run: bool) {
    for record in records.iter_mut().filter(|r| r.status == Status::Flagged) {
        if dry_run {
            log::info!("[dry-run] would delete {}", record.path.display());
            continue;
        }

        match fs::remove_file(&record.path) {
            Ok(()) => {
                log::info!("Deleted {}", record.path.display());
                record.status = Status::Deleted;
            }
            Err(e) => {
                let err = Error::io(&record.path, e);
                log::warn!("Unable to delete: {}", err);
                record.record_side_effect_failure(err.to_string());
            }
        }
    }
}

/// Copy every matched record's file into `output`, creating it if needed.
///
/// Originals are left in place. Name clashes in `output` are overwritten.
pub fn copy_matches(records: &mut [FaceMatchRecord], output: &Path, dry_run: bool) {
    let mut folder_ready = false;

    for record in records.iter_mut().filter(|r| r.status == Status::Flagged) {
        let Some(file_name) = record.path.file_name() else {
            continue;
        };
        let dest = output.join(file_name);

        if dry_run {
            log::info!(
                "[dry-run] would copy {} -> {}",
                record.path.display(),
                dest.display()
            );
            continue;
        }

        if !folder_ready {
            if let Err(e) = fs::create_dir_all(output) {
                let err = Error::io(output, e);
                log::warn!("Unable to create output folder: {}", err);
                record.errors.push(err.to_string());
                continue;
            }
            folder_ready = true;
        }

        // fs::copy truncates the destination first, so a file copied onto
        // itself would be emptied
        if is_same_file(&record.path, &dest) {
            let err = Error::SameFile(record.path.clone());
            log::warn!("{}", err);
            record.errors.push(err.to_string());
            continue;
        }

        match fs::copy(&record.path, &dest) {
            Ok(_) => {
                log::info!("Copied {} -> {}", record.path.display(), dest.display());
                record.status = Status::Copied;
                record.copied_to = Some(dest);
            }
            Err(e) => {
                let err = Error::io(&record.path, e);
                log::warn!("Unable to copy: {}", err);
                record.errors.push(err.to_string());
            }
        }
    }
}

fn is_same_file(source: &Path, dest: &Path) -> bool {
    match (fs::canonicalize(source), fs::canonicalize(dest)) {
        (Ok(source), Ok(dest)) => source == dest,
        _ => false,
    }
}
