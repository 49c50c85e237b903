//! Directory provider abstraction: folders, files, byte streams and the
//! listing capability the paging engine is built on.

use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use futures::future::BoxFuture;

use crate::error::{Result, ViewerError};
use crate::fs::sorting::SortOrder;

/// Extensions excluded from every listing: shell shortcuts and internet links.
pub const SHORTCUT_EXTENSIONS: &[&str] = &["lnk", "url"];

/// Default image extensions a folder listing includes.
pub const DEFAULT_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "webp"];

/// A folder handle. Identity, equality and hashing are by path.
#[derive(Debug, Clone)]
pub struct Folder {
    path: PathBuf,
    pub modified: Option<SystemTime>,
}

impl Folder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            modified: None,
        }
    }

    pub fn with_modified(mut self, modified: Option<SystemTime>) -> Self {
        self.modified = modified;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last path component, or the whole path for a filesystem root.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.to_string_lossy().to_string())
    }

    /// Cache key for this folder.
    pub fn key(&self) -> String {
        self.path.to_string_lossy().to_string()
    }
}

impl PartialEq for Folder {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for Folder {}

impl Hash for Folder {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

/// A file inside a folder listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    path: PathBuf,
    pub modified: Option<SystemTime>,
}

impl FileHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            modified: None,
        }
    }

    pub fn with_modified(mut self, modified: Option<SystemTime>) -> Self {
        self.modified = modified;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(test)]
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Lowercased extension without the dot.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    }

    /// Whether this is a shortcut or link file that must never be opened.
    pub fn is_shortcut(&self) -> bool {
        self.extension()
            .is_some_and(|ext| SHORTCUT_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Whether the extension is one of `extensions` (case-insensitive).
    pub fn matches_extension(&self, extensions: &[String]) -> bool {
        match self.extension() {
            Some(ext) => extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)),
            None => false,
        }
    }
}

/// Readable contents of an opened file.
#[derive(Debug, Clone)]
pub enum ByteStream {
    /// Opened on disk; contents are read when the stream is consumed.
    File(PathBuf),
    /// Bytes already in memory.
    #[cfg(test)]
    Memory(Arc<Vec<u8>>),
}

impl ByteStream {
    /// Read the whole stream.
    pub async fn read_all(&self) -> Result<Vec<u8>> {
        match self {
            ByteStream::File(path) => tokio::fs::read(path)
                .await
                .map_err(|e| ViewerError::at(e, path)),
            #[cfg(test)]
            ByteStream::Memory(bytes) => Ok(bytes.as_ref().clone()),
        }
    }
}

/// A sorted, range-addressable listing of one folder's files.
pub trait FileListing: Send + Sync {
    /// Total number of files in the listing.
    #[allow(dead_code)]
    fn count(&self) -> BoxFuture<'_, Result<usize>>;

    /// Up to `count` files starting at `start`. `count` may be `usize::MAX`.
    fn get_range(&self, start: usize, count: usize) -> BoxFuture<'_, Result<Vec<FileHandle>>>;
}

/// Filesystem capability consumed by the paging engine.
pub trait DirectoryProvider: Send + Sync {
    /// The folder's parent, or `None` at a filesystem root.
    fn parent(&self, folder: &Folder) -> BoxFuture<'_, Result<Option<Folder>>>;

    /// Immediate child folders, sorted by `order`.
    fn list_child_folders(
        &self,
        folder: &Folder,
        order: SortOrder,
    ) -> BoxFuture<'_, Result<Vec<Folder>>>;

    /// Every folder below `folder`, at any depth, in no particular order.
    fn list_subfolders(&self, folder: &Folder) -> BoxFuture<'_, Result<Vec<Folder>>>;

    /// A lazy listing of `folder`'s files whose extension is in `extensions`.
    fn list_files(
        &self,
        folder: &Folder,
        extensions: &[String],
        order: SortOrder,
    ) -> Arc<dyn FileListing>;

    /// Open a file for reading.
    fn open(&self, file: &FileHandle) -> BoxFuture<'_, Result<ByteStream>>;
}

/// Default extension list as owned strings.
pub fn default_extensions() -> Vec<String> {
    DEFAULT_IMAGE_EXTENSIONS
        .iter()
        .map(|s| s.to_string())
        .collect()
}
