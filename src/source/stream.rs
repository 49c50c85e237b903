use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::ViewerSettings;
use crate::error::Result;
use crate::fs::provider::{DirectoryProvider, Folder};
use crate::notice::Notices;
use crate::query::{
    FolderQuery, ShuffledFolderQuery, StagedFolderQuery, StreamElement, StreamOpener,
};

/// One globally indexed sequence of file streams over several folders.
///
/// Folders keep their order, and files keep their order within each folder.
/// Only the first folder's query starts at construction. The others start
/// when a page first reaches them.
pub struct PagedFileAggregator {
    queries: Vec<Box<dyn FolderQuery>>,
    loaded: AtomicUsize,
}

impl PagedFileAggregator {
    pub fn new(
        folders: &[Folder],
        provider: Arc<dyn DirectoryProvider>,
        notices: Arc<Notices>,
        settings: &ViewerSettings,
    ) -> Self {
        let queries: Vec<Box<dyn FolderQuery>> = folders
            .iter()
            .map(|folder| query_for(folder, &provider, &notices, settings))
            .collect();
        if let Some(first) = queries.first() {
            first.launch();
        }
        Self {
            queries,
            loaded: AtomicUsize::new(0),
        }
    }

    /// An aggregator over no folders; every page is empty.
    pub fn empty() -> Self {
        Self {
            queries: Vec::new(),
            loaded: AtomicUsize::new(0),
        }
    }

    pub fn folder_count(&self) -> usize {
        self.queries.len()
    }

    /// Total number of elements handed out so far.
    pub fn loaded_count(&self) -> usize {
        self.loaded.load(Ordering::Relaxed)
    }

    /// Elements `[page * page_size, page * page_size + page_size)`, each
    /// carrying its absolute index. A short page marks the end.
    pub async fn get_paged_items(
        &self,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<StreamElement>> {
        if page_size == 0 {
            return Ok(Vec::new());
        }
        // A start past `usize::MAX` lies beyond any folder.
        let Some(start) = page.checked_mul(page_size) else {
            return Ok(Vec::new());
        };

        // Find the query holding `start`, summing the sizes of those before it.
        let mut base = 0;
        let mut first = None;
        for (i, query) in self.queries.iter().enumerate() {
            query.launch();
            let Some(needed) = (start - base).checked_add(1) else {
                return Ok(Vec::new());
            };
            if query.has_at_least(needed).await? {
                first = Some(i);
                break;
            }
            base += query.count().await?;
        }
        let Some(first) = first else {
            return Ok(Vec::new());
        };

        let mut items = Vec::new();
        let mut offset = start - base;
        for query in &self.queries[first..] {
            let wanted = page_size - items.len();
            if wanted == 0 {
                break;
            }
            query.launch();
            items.extend(query.get_files(offset, offset.saturating_add(wanted)).await?);
            offset = 0;
        }
        items.truncate(page_size);

        for (i, item) in items.iter_mut().enumerate() {
            item.index = start + i;
        }
        self.loaded.fetch_add(items.len(), Ordering::Relaxed);
        log::trace!("page {} ({} per page): {} items", page, page_size, items.len());
        Ok(items)
    }
}

fn query_for(
    folder: &Folder,
    provider: &Arc<dyn DirectoryProvider>,
    notices: &Arc<Notices>,
    settings: &ViewerSettings,
) -> Box<dyn FolderQuery> {
    let order = settings.file_order;
    let listing = provider.list_files(folder, &settings.extensions, order.listing_order());
    let opener = StreamOpener::new(folder.clone(), listing, provider.clone(), notices.clone());
    if order.is_random() {
        Box::new(ShuffledFolderQuery::new(opener))
    } else {
        Box::new(StagedFolderQuery::new(opener, settings.initial_batch))
    }
}
