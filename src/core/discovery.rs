use crate::error::{Error, Result};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const DEFAULT_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// List the image files directly inside `dir`, sorted by file name.
///
/// Subdirectories are not descended into. A missing folder, or one that
/// cannot be read at all, is fatal; unreadable individual entries are
/// logged and skipped.
pub fn list_images(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::FolderNotFound(dir.to_path_buf()));
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                let source = err
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::other("failed to read directory"));
                return Err(Error::io(dir, source));
            }
            Err(err) => {
                log::warn!("Skipping entry in {}: {}", dir.display(), err);
                continue;
            }
        };

        let path = entry.path();
        if path.is_file() && has_extension(path, extensions) {
            images.push(entry.into_path());
        }
    }

    log::debug!("Found {} image(s) in {}", images.len(), dir.display());
    Ok(images)
}

/// Case-insensitive extension check.
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
}

pub fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_filters_and_sorts() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["c.PNG", "a.jpg", "notes.txt", "b.JpEg", "d.gif", "noext"] {
            fs::write(temp_dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(temp_dir.path().join("nested.jpg")).unwrap();
        fs::write(temp_dir.path().join("nested.jpg").join("z.jpg"), b"x").unwrap();

        let images = list_images(temp_dir.path(), &default_extensions()).unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.JpEg", "c.PNG"]);
    }

    #[test]
    fn test_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        assert!(list_images(temp_dir.path(), &default_extensions())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_missing_folder_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let err = list_images(&temp_dir.path().join("missing"), &default_extensions()).unwrap_err();
        assert!(matches!(err, Error::FolderNotFound(_)));
    }

    #[test]
    fn test_file_is_not_a_folder() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.jpg");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(
            list_images(&file, &default_extensions()),
            Err(Error::FolderNotFound(_))
        ));
    }

    #[test]
    fn test_has_extension() {
        let exts = default_extensions();
        assert!(has_extension(Path::new("x/IMG_001.JPG"), &exts));
        assert!(!has_extension(Path::new("x/IMG_001.jpg.bak"), &exts));
        assert!(!has_extension(Path::new("x/jpg"), &exts));
    }
}
