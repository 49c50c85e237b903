use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use rand::seq::SliceRandom;

use crate::error::Result;
use crate::query::{extend_clipped, Batch, FolderQuery, LazyBatch, StreamElement, StreamOpener};

/// Folder query that lists every file once, shuffles the result, and then
/// serves pages from that fixed permutation.
pub struct ShuffledFolderQuery {
    opener: StreamOpener,
    all: LazyBatch,
}

impl ShuffledFolderQuery {
    pub(crate) fn new(opener: StreamOpener) -> Self {
        Self {
            opener,
            all: LazyBatch::new(),
        }
    }

    fn launch_all(&self) -> BoxFuture<'static, Result<Batch>> {
        let opener = self.opener.clone();
        self.all
            .get_or_launch(move || {
                async move {
                    let batch = opener.open(0, usize::MAX).await?;
                    Ok(Arc::new(shuffled(&batch)))
                }
                .boxed()
            })
            .boxed()
    }
}

fn shuffled(batch: &[StreamElement]) -> Vec<StreamElement> {
    let mut elements = batch.to_vec();
    elements.shuffle(&mut rand::rng());
    elements
}

impl FolderQuery for ShuffledFolderQuery {
    fn launch(&self) {
        drop(self.launch_all());
    }

    fn has_at_least(&self, n: usize) -> BoxFuture<'_, Result<bool>> {
        Box::pin(async move { Ok(self.launch_all().await?.len() >= n) })
    }

    fn count(&self) -> BoxFuture<'_, Result<usize>> {
        Box::pin(async move { Ok(self.launch_all().await?.len()) })
    }

    fn get_files(&self, start: usize, end: usize) -> BoxFuture<'_, Result<Vec<StreamElement>>> {
        Box::pin(async move {
            let all = self.launch_all().await?;
            let mut files = Vec::new();
            extend_clipped(&mut files, &all, start, end);
            Ok(files)
        })
    }
}
