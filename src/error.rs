use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

/// Application-wide result type alias.
pub type Result<T> = std::result::Result<T, ViewerError>;

/// Application error types.
///
/// Cloneable so that a single memoized listing can hand the same outcome to
/// every caller awaiting it.
#[derive(Debug, Clone, Error)]
pub enum ViewerError {
    /// A folder or file vanished between resolution and access.
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The process lacks permission to read a folder or file.
    #[error("Access denied: {}", .0.display())]
    AccessDenied(PathBuf),

    /// Image bytes could not be decoded.
    #[error("Cannot decode {}: {message}", .path.display())]
    Decode { path: PathBuf, message: String },

    /// Any other I/O error.
    #[error("I/O error: {0}")]
    Io(Arc<io::Error>),

    /// Invalid path provided by the user.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Unusable configuration value.
    #[error("Config error: {0}")]
    Config(String),
}

impl ViewerError {
    /// Classify an I/O error raised while accessing `path`.
    pub fn at(err: io::Error, path: &Path) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => ViewerError::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => ViewerError::AccessDenied(path.to_path_buf()),
            _ => ViewerError::Io(Arc::new(err)),
        }
    }

    /// Whether this error is one the user gets told about instead of one that
    /// aborts the caller.
    pub fn is_access_error(&self) -> bool {
        matches!(self, ViewerError::NotFound(_) | ViewerError::AccessDenied(_))
    }
}

impl From<io::Error> for ViewerError {
    fn from(err: io::Error) -> Self {
        ViewerError::Io(Arc::new(err))
    }
}
