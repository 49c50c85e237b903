use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use crate::error::Result;
use crate::query::{extend_clipped, Batch, FolderQuery, LazyBatch, StreamElement, StreamOpener};

/// Default size of the fast first batch.
pub const DEFAULT_INITIAL_BATCH: usize = 25;

/// Folder query that opens the first `num_initial` files as soon as it is
/// launched and the rest only once the first batch turns out to be full.
///
/// A short first batch means the folder has nothing more, so the remaining
/// listing is never issued.
pub struct StagedFolderQuery {
    opener: StreamOpener,
    num_initial: usize,
    initial: LazyBatch,
    remaining: LazyBatch,
    remaining_unnecessary: AtomicBool,
}

impl StagedFolderQuery {
    pub(crate) fn new(opener: StreamOpener, num_initial: usize) -> Self {
        Self {
            opener,
            num_initial: num_initial.max(1),
            initial: LazyBatch::new(),
            remaining: LazyBatch::new(),
            remaining_unnecessary: AtomicBool::new(false),
        }
    }

    fn launch_initial(&self) -> BoxFuture<'static, Result<Batch>> {
        let opener = self.opener.clone();
        let count = self.num_initial;
        self.initial
            .get_or_launch(move || opener.open(0, count).boxed())
            .boxed()
    }

    fn launch_remaining(&self) -> BoxFuture<'static, Result<Batch>> {
        let opener = self.opener.clone();
        let start = self.num_initial;
        self.remaining
            .get_or_launch(move || opener.open(start, usize::MAX).boxed())
            .boxed()
    }

    async fn initial_batch(&self) -> Result<Batch> {
        let batch = self.launch_initial().await?;
        if batch.len() < self.num_initial {
            self.remaining_unnecessary.store(true, Ordering::Release);
        } else {
            // A full first batch means there may be more; start on it now.
            drop(self.launch_remaining());
        }
        Ok(batch)
    }

    async fn remaining_batch(&self) -> Result<Batch> {
        self.initial_batch().await?;
        if self.remaining_unnecessary.load(Ordering::Acquire) {
            return Ok(Arc::new(Vec::new()));
        }
        self.launch_remaining().await
    }
}

impl FolderQuery for StagedFolderQuery {
    fn launch(&self) {
        drop(self.launch_initial());
    }

    fn has_at_least(&self, n: usize) -> BoxFuture<'_, Result<bool>> {
        Box::pin(async move {
            let initial = self.initial_batch().await?.len();
            if initial >= n {
                return Ok(true);
            }
            let remaining = self.remaining_batch().await?.len();
            Ok(initial + remaining >= n)
        })
    }

    fn count(&self) -> BoxFuture<'_, Result<usize>> {
        Box::pin(async move {
            let initial = self.initial_batch().await?.len();
            let remaining = self.remaining_batch().await?.len();
            Ok(initial + remaining)
        })
    }

    fn get_files(&self, start: usize, end: usize) -> BoxFuture<'_, Result<Vec<StreamElement>>> {
        Box::pin(async move {
            let mut files = Vec::new();
            let initial = self.initial_batch().await?;
            extend_clipped(&mut files, &initial, start, end);
            if end <= initial.len() {
                return Ok(files);
            }

            let remaining = self.remaining_batch().await?;
            let base = initial.len();
            extend_clipped(
                &mut files,
                &remaining,
                start.saturating_sub(base),
                end - base,
            );
            log::trace!(
                "{}: files [{}, {}) -> {}",
                self.opener.folder().path().display(),
                start,
                end,
                files.len()
            );
            Ok(files)
        })
    }
}
