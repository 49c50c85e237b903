//! In-memory directory provider and decoder used by the unit tests.
//!
//! Every listing and subfolder walk is recorded so tests can assert how much
//! work actually reached the "filesystem".

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use image::DynamicImage;

use crate::error::{Result, ViewerError};
use crate::fs::provider::{ByteStream, DirectoryProvider, FileHandle, FileListing, Folder};
use crate::fs::sorting::SortOrder;
use crate::source::image::ImageDecoder;

/// A folder and the file names directly inside it.
#[derive(Debug, Clone)]
pub struct FakeFolder {
    path: PathBuf,
    files: Vec<String>,
    denied: bool,
    walk_denied: bool,
    broken: bool,
}

impl FakeFolder {
    pub fn new(path: &str) -> Self {
        Self {
            path: PathBuf::from(path),
            files: Vec::new(),
            denied: false,
            walk_denied: false,
            broken: false,
        }
    }

    pub fn with_files(mut self, names: &[&str]) -> Self {
        self.files.extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub fn with_numbered_files(mut self, n: usize) -> Self {
        self.files.extend((0..n).map(Self::numbered_name));
        self
    }

    pub fn numbered_name(i: usize) -> String {
        format!("img_{:04}.png", i)
    }

    /// Reading this folder fails with AccessDenied.
    pub fn denied(mut self) -> Self {
        self.denied = true;
        self
    }

    /// Walking below this folder fails with AccessDenied; its own files
    /// still list.
    pub fn walk_denied(mut self) -> Self {
        self.walk_denied = true;
        self
    }

    /// Walking below this folder fails with a plain I/O error.
    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }
}

#[derive(Debug, Default)]
struct Calls {
    ranges: Vec<(PathBuf, usize, usize)>,
    subfolders: HashMap<PathBuf, usize>,
}

#[derive(Default)]
pub struct FakeProvider {
    folders: BTreeMap<PathBuf, FakeFolder>,
    vanished: HashSet<PathBuf>,
    delay: Option<Duration>,
    calls: Arc<Mutex<Calls>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_folder(mut self, folder: FakeFolder) -> Self {
        self.folders.insert(folder.path.clone(), folder);
        self
    }

    /// Listed, but gone by the time it is opened.
    pub fn with_vanished_file(mut self, path: &str) -> Self {
        self.vanished.insert(PathBuf::from(path));
        self
    }

    /// Make every subfolder walk and listing take this long.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// `(start, count)` of every listing range requested for `path`.
    pub fn range_calls(&self, path: &str) -> Vec<(usize, usize)> {
        let calls = self.calls.lock().unwrap();
        calls
            .ranges
            .iter()
            .filter(|(p, _, _)| p == Path::new(path))
            .map(|(_, s, c)| (*s, *c))
            .collect()
    }

    /// How many recursive subfolder walks were made from `path`.
    pub fn subfolder_calls(&self, path: &str) -> usize {
        let calls = self.calls.lock().unwrap();
        calls.subfolders.get(Path::new(path)).copied().unwrap_or(0)
    }

    fn check(&self, path: &Path) -> Result<()> {
        if self.folders.get(path).is_some_and(|f| f.denied) {
            return Err(ViewerError::AccessDenied(path.to_path_buf()));
        }
        if !self.folders.keys().any(|p| p.starts_with(path)) {
            return Err(ViewerError::NotFound(path.to_path_buf()));
        }
        Ok(())
    }

    /// Every folder strictly below `path`, registered or implied.
    fn descendants(&self, path: &Path) -> BTreeSet<PathBuf> {
        let mut found = BTreeSet::new();
        for key in self.folders.keys() {
            for ancestor in key.ancestors() {
                if ancestor != path && ancestor.starts_with(path) {
                    found.insert(ancestor.to_path_buf());
                }
            }
        }
        found
    }
}

impl DirectoryProvider for FakeProvider {
    fn parent(&self, folder: &Folder) -> BoxFuture<'_, Result<Option<Folder>>> {
        let path = folder.path().to_path_buf();
        Box::pin(async move {
            self.check(&path)?;
            Ok(path.parent().map(Folder::new))
        })
    }

    fn list_child_folders(
        &self,
        folder: &Folder,
        order: SortOrder,
    ) -> BoxFuture<'_, Result<Vec<Folder>>> {
        let path = folder.path().to_path_buf();
        Box::pin(async move {
            self.check(&path)?;
            let mut children: Vec<Folder> = self
                .descendants(&path)
                .into_iter()
                .filter(|p| p.parent() == Some(path.as_path()))
                .map(Folder::new)
                .collect();
            order.sort(&mut children);
            Ok(children)
        })
    }

    fn list_subfolders(&self, folder: &Folder) -> BoxFuture<'_, Result<Vec<Folder>>> {
        let path = folder.path().to_path_buf();
        Box::pin(async move {
            *self
                .calls
                .lock()
                .unwrap()
                .subfolders
                .entry(path.clone())
                .or_insert(0) += 1;
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.check(&path)?;
            match self.folders.get(&path) {
                Some(f) if f.walk_denied => return Err(ViewerError::AccessDenied(path)),
                Some(f) if f.broken => {
                    return Err(std::io::Error::other("device not ready").into());
                }
                _ => {}
            }
            // Deliberately unsorted.
            Ok(self.descendants(&path).into_iter().rev().map(Folder::new).collect())
        })
    }

    fn list_files(
        &self,
        folder: &Folder,
        extensions: &[String],
        order: SortOrder,
    ) -> Arc<dyn FileListing> {
        let path = folder.path().to_path_buf();
        let contents = self.folders.get(&path).map(|f| {
            let mut files: Vec<FileHandle> = f
                .files
                .iter()
                .map(|name| FileHandle::new(path.join(name)))
                .filter(|h| extensions.is_empty() || h.matches_extension(extensions))
                .collect();
            order.sort(&mut files);
            (f.denied, files)
        });
        Arc::new(FakeListing {
            path,
            contents,
            delay: self.delay,
            calls: self.calls.clone(),
        })
    }

    fn open(&self, file: &FileHandle) -> BoxFuture<'_, Result<ByteStream>> {
        let path = file.path().to_path_buf();
        Box::pin(async move {
            if self.vanished.contains(&path) {
                return Err(ViewerError::NotFound(path));
            }
            let bytes = path.to_string_lossy().as_bytes().to_vec();
            Ok(ByteStream::Memory(Arc::new(bytes)))
        })
    }
}

struct FakeListing {
    path: PathBuf,
    contents: Option<(bool, Vec<FileHandle>)>,
    delay: Option<Duration>,
    calls: Arc<Mutex<Calls>>,
}

impl FakeListing {
    fn files(&self) -> Result<&[FileHandle]> {
        match &self.contents {
            None => Err(ViewerError::NotFound(self.path.clone())),
            Some((true, _)) => Err(ViewerError::AccessDenied(self.path.clone())),
            Some((false, files)) => Ok(files),
        }
    }
}

impl FileListing for FakeListing {
    fn count(&self) -> BoxFuture<'_, Result<usize>> {
        Box::pin(async move { Ok(self.files()?.len()) })
    }

    fn get_range(&self, start: usize, count: usize) -> BoxFuture<'_, Result<Vec<FileHandle>>> {
        self.calls
            .lock()
            .unwrap()
            .ranges
            .push((self.path.clone(), start, count));
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let files = self.files()?;
            let start = start.min(files.len());
            let end = start.saturating_add(count).min(files.len());
            Ok(files[start..end].to_vec())
        })
    }
}

/// Decodes anything except bytes mentioning "corrupt" into a 2x1 image.
pub struct FakeDecoder;

impl ImageDecoder for FakeDecoder {
    fn decode(&self, path: &Path, bytes: &[u8]) -> Result<DynamicImage> {
        if String::from_utf8_lossy(bytes).contains("corrupt") {
            return Err(ViewerError::Decode {
                path: path.to_path_buf(),
                message: "not an image".into(),
            });
        }
        Ok(DynamicImage::new_rgb8(2, 1))
    }
}
