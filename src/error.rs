use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while scanning and sweeping a folder.
///
/// Folder-level variants abort a scan before any side effect. Per-file
/// variants are attached to the record they concern and the scan goes on.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Folder not found: {}", .0.display())]
    FolderNotFound(PathBuf),

    #[error("Permission denied: {}", .path.display())]
    PermissionDenied { path: PathBuf },

    #[error("Unreadable image {}: {source}", .path.display())]
    UnreadableImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("No face detected in {}", .0.display())]
    NoFaceDetected(PathBuf),

    #[error("Refusing to copy {} onto itself", .0.display())]
    SameFile(PathBuf),

    #[error("Invalid cutoff '{input}': expected YYYY-MM-DD HH:MM:SS")]
    InvalidCutoffFormat { input: String },

    #[error("Failed to load face model {}: {message}", .path.display())]
    FaceModel { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Wrap an IO failure on `path`, promoting permission failures to
    /// [`Error::PermissionDenied`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Error::PermissionDenied { path },
            _ => Error::Io { path, source },
        }
    }

    /// True for errors that end the whole run rather than a single file.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::FolderNotFound(_)
                | Error::InvalidCutoffFormat { .. }
                | Error::FaceModel { .. }
                | Error::Configuration(_)
        )
    }
}
