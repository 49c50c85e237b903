use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::OnceCell;

use crate::error::{Result, ViewerError};
use crate::fs::provider::{ByteStream, DirectoryProvider, FileHandle, FileListing, Folder};
use crate::fs::sorting::SortOrder;

/// Directory provider backed by the local filesystem.
#[derive(Debug, Default, Clone)]
pub struct LocalDirectoryProvider;

impl LocalDirectoryProvider {
    pub fn new() -> Self {
        Self
    }
}

/// Read the immediate entries of `dir`, split into folders and files.
///
/// Unreadable entries are silently skipped; only failing to open `dir` itself
/// is an error. Symlinked directories are not followed.
async fn read_entries(dir: &Path) -> Result<(Vec<Folder>, Vec<FileHandle>)> {
    let mut folders = Vec::new();
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| ViewerError::at(e, dir))?;

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(e)) => e,
            Ok(None) | Err(_) => break,
        };
        let file_type = match entry.file_type().await {
            Ok(t) => t,
            Err(_) => continue,
        };
        let path = entry.path();
        if file_type.is_dir() {
            let modified = entry.metadata().await.ok().and_then(|m| m.modified().ok());
            folders.push(Folder::new(&path).with_modified(modified));
        } else if file_type.is_file() || file_type.is_symlink() {
            // Symlinked files are followed; symlinked directories are not.
            let meta = match tokio::fs::metadata(&path).await {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };
            files.push(FileHandle::new(path).with_modified(meta.modified().ok()));
        }
    }

    Ok((folders, files))
}

impl DirectoryProvider for LocalDirectoryProvider {
    fn parent(&self, folder: &Folder) -> BoxFuture<'_, Result<Option<Folder>>> {
        let path = folder.path().to_path_buf();
        Box::pin(async move {
            tokio::fs::metadata(&path)
                .await
                .map_err(|e| ViewerError::at(e, &path))?;
            Ok(path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Folder::new))
        })
    }

    fn list_child_folders(
        &self,
        folder: &Folder,
        order: SortOrder,
    ) -> BoxFuture<'_, Result<Vec<Folder>>> {
        let path = folder.path().to_path_buf();
        Box::pin(async move {
            let (mut folders, _) = read_entries(&path).await?;
            order.sort(&mut folders);
            Ok(folders)
        })
    }

    fn list_subfolders(&self, folder: &Folder) -> BoxFuture<'_, Result<Vec<Folder>>> {
        let root = folder.path().to_path_buf();
        Box::pin(async move {
            let (top, _) = read_entries(&root).await?;
            let mut found = Vec::new();
            let mut stack = top;

            while let Some(dir) = stack.pop() {
                // Folders deeper down that vanish or deny access are skipped.
                match read_entries(dir.path()).await {
                    Ok((children, _)) => stack.extend(children),
                    Err(e) if e.is_access_error() => {
                        log::debug!("skipping {}: {}", dir.path().display(), e);
                    }
                    Err(e) => return Err(e),
                }
                found.push(dir);
            }

            Ok(found)
        })
    }

    fn list_files(
        &self,
        folder: &Folder,
        extensions: &[String],
        order: SortOrder,
    ) -> Arc<dyn FileListing> {
        Arc::new(LocalFileListing {
            dir: folder.path().to_path_buf(),
            extensions: extensions.to_vec(),
            order,
            files: OnceCell::new(),
        })
    }

    fn open(&self, file: &FileHandle) -> BoxFuture<'_, Result<ByteStream>> {
        let path = file.path().to_path_buf();
        Box::pin(async move {
            tokio::fs::File::open(&path)
                .await
                .map_err(|e| ViewerError::at(e, &path))?;
            Ok(ByteStream::File(path))
        })
    }
}

/// One folder's matching files, read and sorted on first use.
struct LocalFileListing {
    dir: PathBuf,
    extensions: Vec<String>,
    order: SortOrder,
    files: OnceCell<Vec<FileHandle>>,
}

impl LocalFileListing {
    async fn files(&self) -> Result<&[FileHandle]> {
        let files = self
            .files
            .get_or_try_init(|| async {
                let (_, mut files) = read_entries(&self.dir).await?;
                files.retain(|f| {
                    self.extensions.is_empty() || f.matches_extension(&self.extensions)
                });
                self.order.sort(&mut files);
                Ok::<_, ViewerError>(files)
            })
            .await?;
        Ok(files.as_slice())
    }
}

impl FileListing for LocalFileListing {
    fn count(&self) -> BoxFuture<'_, Result<usize>> {
        Box::pin(async move { Ok(self.files().await?.len()) })
    }

    fn get_range(&self, start: usize, count: usize) -> BoxFuture<'_, Result<Vec<FileHandle>>> {
        Box::pin(async move {
            let files = self.files().await?;
            let start = start.min(files.len());
            let end = start.saturating_add(count).min(files.len());
            Ok(files[start..end].to_vec())
        })
    }
}
