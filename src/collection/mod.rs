//! Folder collections and everything that keeps them warm: the LRU of built
//! collections, the background populator and the sibling-aware navigator.

pub mod cache;
pub mod navigator;
pub mod populator;

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ViewerSettings;
use crate::error::Result;
use crate::fs::provider::{DirectoryProvider, Folder};
use crate::notice::{guard_access, Notices};
use crate::source::{
    ImageCrateDecoder, ImageDecoder, ImageElement, PagedFileAggregator, PagedImageDecoder,
};
use crate::timing::WallClock;

pub use cache::CollectionCache;
pub use navigator::CollectionNavigator;
pub use populator::CachePopulator;

/// The images of one folder and everything below it.
///
/// Subfolders come first in path order and the folder's own files last.
pub struct FolderCollection {
    name: String,
    root: Option<Folder>,
    images: PagedImageDecoder,
}

impl FolderCollection {
    /// The "no folder" collection: empty name, no root, no images.
    pub fn empty() -> Self {
        Self {
            name: String::new(),
            root: None,
            images: PagedImageDecoder::new(
                PagedFileAggregator::empty(),
                Arc::new(ImageCrateDecoder),
                Arc::new(Notices::silent()),
            ),
        }
    }

    /// The root folder's path, or `""` for the empty collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> Option<&Folder> {
        self.root.as_ref()
    }

    pub fn is_empty_collection(&self) -> bool {
        self.root.is_none()
    }

    pub async fn get_paged_items(
        &self,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<ImageElement>> {
        self.images.get_paged_items(page, page_size).await
    }

    pub fn path_for_index(&self, index: usize) -> Option<PathBuf> {
        self.images.path_for_index(index)
    }

    pub fn images_decoded(&self) -> usize {
        self.images.images_decoded()
    }

    pub fn files_loaded(&self) -> usize {
        self.images.files_loaded()
    }

    /// Number of folders contributing files, the root included.
    pub fn folder_count(&self) -> usize {
        self.images.folder_count()
    }
}

impl std::fmt::Debug for FolderCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderCollection")
            .field("name", &self.name)
            .field("folders", &self.folder_count())
            .finish()
    }
}

/// Builds [`FolderCollection`]s with one fixed set of settings.
pub struct CollectionFactory {
    provider: Arc<dyn DirectoryProvider>,
    decoder: Arc<dyn ImageDecoder>,
    notices: Arc<Notices>,
    settings: ViewerSettings,
}

impl CollectionFactory {
    pub fn new(
        provider: Arc<dyn DirectoryProvider>,
        decoder: Arc<dyn ImageDecoder>,
        notices: Arc<Notices>,
        settings: ViewerSettings,
    ) -> Self {
        Self {
            provider,
            decoder,
            notices,
            settings,
        }
    }

    /// Collect `folder`'s subfolders recursively and bind them, followed by
    /// `folder` itself, to a new collection.
    ///
    /// When the subfolder walk is refused or the folder vanished, a notice is
    /// raised and the collection holds only `folder` itself, which pages as
    /// empty if its files cannot be listed either.
    pub async fn build(&self, folder: &Folder) -> Result<FolderCollection> {
        let mut clock = WallClock::start();
        let listed = guard_access(
            &self.notices,
            folder.path(),
            self.provider.list_subfolders(folder),
        )
        .await?;

        let folders = match listed {
            Some(mut folders) => {
                folders.sort_by(|a, b| a.path().cmp(b.path()));
                folders.push(folder.clone());
                folders
            }
            // The root's own files may still be readable.
            None => vec![folder.clone()],
        };

        let files = PagedFileAggregator::new(
            &folders,
            self.provider.clone(),
            self.notices.clone(),
            &self.settings,
        );
        clock.report(50, &format!("listing {} folders under {}", folders.len(), folder.key()));

        Ok(FolderCollection {
            name: folder.key(),
            root: Some(folder.clone()),
            images: PagedImageDecoder::new(files, self.decoder.clone(), self.notices.clone()),
        })
    }
}
