//! Per-folder file queries.
//!
//! A query lists one folder's image files and opens their byte streams. Two
//! variants exist: [`StagedFolderQuery`] returns a small prefix fast and the
//! rest later, [`ShuffledFolderQuery`] lists everything and shuffles it once.
//!
//! Listing work is memoized in a [`LazyBatch`]: a shared future created under
//! a lock and awaited outside it, so every caller waits on the same single
//! listing.

pub mod shuffled;
pub mod staged;

use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{join_all, BoxFuture, FutureExt, Shared};

use crate::error::Result;
use crate::fs::provider::{ByteStream, DirectoryProvider, FileHandle, FileListing, Folder};
use crate::notice::{guard_access, Notices};
use crate::timing::WallClock;

pub use shuffled::ShuffledFolderQuery;
pub use staged::StagedFolderQuery;

/// An opened file. `index` is its global position, assigned when pages are
/// aggregated; it is zero until then.
#[derive(Debug, Clone)]
pub struct StreamElement {
    pub index: usize,
    pub file: FileHandle,
    pub stream: ByteStream,
}

/// Common contract of the per-folder query variants.
pub trait FolderQuery: Send + Sync {
    /// Start listing in the background. Idempotent.
    fn launch(&self);

    /// Whether the folder holds at least `n` files, doing as little work as
    /// possible to find out.
    fn has_at_least(&self, n: usize) -> BoxFuture<'_, Result<bool>>;

    fn count(&self) -> BoxFuture<'_, Result<usize>>;

    /// Elements in `[start, end)`, clipped to what the folder holds.
    fn get_files(&self, start: usize, end: usize) -> BoxFuture<'_, Result<Vec<StreamElement>>>;
}

pub(crate) type Batch = Arc<Vec<StreamElement>>;
pub(crate) type SharedBatch = Shared<BoxFuture<'static, Result<Batch>>>;

/// A listing that is started at most once and shared by every awaiting caller.
pub(crate) struct LazyBatch {
    slot: Mutex<Option<SharedBatch>>,
}

impl LazyBatch {
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Return the batch, starting it with `start` if nobody has yet.
    ///
    /// The started future is also spawned, so it runs to completion even if
    /// every caller loses interest.
    pub(crate) fn get_or_launch<F>(&self, start: F) -> SharedBatch
    where
        F: FnOnce() -> BoxFuture<'static, Result<Batch>>,
    {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(batch) = slot.as_ref() {
            return batch.clone();
        }
        let batch = start().shared();
        tokio::spawn(batch.clone());
        *slot = Some(batch.clone());
        batch
    }
}

/// Opens the streams for a range of one folder's listing.
#[derive(Clone)]
pub(crate) struct StreamOpener {
    folder: Folder,
    listing: Arc<dyn FileListing>,
    provider: Arc<dyn DirectoryProvider>,
    notices: Arc<Notices>,
}

impl StreamOpener {
    pub(crate) fn new(
        folder: Folder,
        listing: Arc<dyn FileListing>,
        provider: Arc<dyn DirectoryProvider>,
        notices: Arc<Notices>,
    ) -> Self {
        Self {
            folder,
            listing,
            provider,
            notices,
        }
    }

    pub(crate) fn folder(&self) -> &Folder {
        &self.folder
    }

    /// List up to `count` files from `start` and open them all concurrently.
    ///
    /// Shortcut files are dropped. A folder that vanished or denies access
    /// yields an empty batch plus a notice; a single file that vanished since
    /// listing is skipped.
    pub(crate) async fn open(self, start: usize, count: usize) -> Result<Batch> {
        let mut clock = WallClock::start();
        let path = self.folder.path();
        let files = match guard_access(&self.notices, path, self.listing.get_range(start, count))
            .await?
        {
            Some(files) => files,
            None => return Ok(Arc::new(Vec::new())),
        };

        let opens = files
            .into_iter()
            .filter(|f| !f.is_shortcut())
            .map(|file| {
                let provider = self.provider.clone();
                async move {
                    let stream = provider.open(&file).await;
                    (file, stream)
                }
            });

        let mut elements = Vec::new();
        for (file, stream) in join_all(opens).await {
            match stream {
                Ok(stream) => elements.push(StreamElement {
                    index: 0,
                    file,
                    stream,
                }),
                Err(e) if e.is_access_error() => {
                    log::warn!("skipping {}: {}", file.path().display(), e);
                }
                Err(e) => return Err(e),
            }
        }

        clock.report(
            100,
            &format!("opening {} streams in {}", elements.len(), path.display()),
        );
        Ok(Arc::new(elements))
    }
}

/// Copy `[start, end)` of `items` into `out`, clipped to the slice.
pub(crate) fn extend_clipped(
    out: &mut Vec<StreamElement>,
    items: &[StreamElement],
    start: usize,
    end: usize,
) {
    let end = end.min(items.len());
    if start < end {
        out.extend_from_slice(&items[start..end]);
    }
}
