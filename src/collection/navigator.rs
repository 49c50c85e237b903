use std::sync::Arc;

use crate::collection::{CachePopulator, CollectionCache, CollectionFactory, FolderCollection};
use crate::config::ViewerSettings;
use crate::error::Result;
use crate::fs::provider::{DirectoryProvider, Folder};
use crate::navigation::FolderSiblingNavigator;
use crate::notice::Notices;
use crate::source::ImageDecoder;

/// Moves between sibling folders and keeps the folders around the current
/// one built in the background.
///
/// Navigation calls take `&mut self`; callers serialize them.
pub struct CollectionNavigator {
    provider: Arc<dyn DirectoryProvider>,
    decoder: Arc<dyn ImageDecoder>,
    notices: Arc<Notices>,
    settings: ViewerSettings,
    siblings: FolderSiblingNavigator,
    cache: CollectionCache,
    populator: CachePopulator,
    current: Arc<FolderCollection>,
}

impl CollectionNavigator {
    pub fn new(
        provider: Arc<dyn DirectoryProvider>,
        decoder: Arc<dyn ImageDecoder>,
        notices: Arc<Notices>,
        settings: ViewerSettings,
    ) -> Self {
        let siblings = FolderSiblingNavigator::new(provider.clone(), settings.folder_order);
        let (cache, populator) = build_cache(&provider, &decoder, &notices, &settings);
        Self {
            provider,
            decoder,
            notices,
            settings,
            siblings,
            cache,
            populator,
            current: Arc::new(FolderCollection::empty()),
        }
    }

    pub fn current(&self) -> Arc<FolderCollection> {
        self.current.clone()
    }

    pub fn settings(&self) -> &ViewerSettings {
        &self.settings
    }

    pub fn notices(&self) -> &Arc<Notices> {
        &self.notices
    }

    pub fn siblings(&self) -> &FolderSiblingNavigator {
        &self.siblings
    }

    pub fn cache(&self) -> &CollectionCache {
        &self.cache
    }

    pub fn populator(&self) -> &CachePopulator {
        &self.populator
    }

    pub fn can_go_next(&self) -> bool {
        self.siblings.has_next()
    }

    pub fn can_go_previous(&self) -> bool {
        self.siblings.has_previous()
    }

    /// Make `folder` current and prefetch the window around it.
    pub async fn set_current_collection(
        &mut self,
        folder: &Folder,
    ) -> Result<Arc<FolderCollection>> {
        let (position, collection) = tokio::join!(
            self.siblings.set_current(folder),
            self.cache.get_or_create(folder)
        );
        position?;
        self.current = collection?;
        log::debug!("current collection is {}", self.current.name());

        for k in 1..=self.settings.look_ahead {
            self.populator.enqueue(self.siblings.current_offset(k as isize).as_ref());
        }
        for k in 1..=self.settings.look_behind {
            self.populator.enqueue(self.siblings.current_offset(-(k as isize)).as_ref());
        }
        Ok(self.current.clone())
    }

    /// Step to the next sibling. Returns `false` at the last one.
    pub async fn move_next(&mut self) -> Result<bool> {
        let moved = self.step(1, self.settings.look_ahead as isize).await?;
        if moved {
            log::debug!("moved forward to {}", self.current.name());
        }
        Ok(moved)
    }

    /// Step to the previous sibling. Returns `false` at the first one.
    pub async fn move_previous(&mut self) -> Result<bool> {
        let moved = self.step(-1, -(self.settings.look_behind as isize)).await?;
        if moved {
            log::debug!("moved back to {}", self.current.name());
        }
        Ok(moved)
    }

    /// Load the sibling at `direction` and only then move the cursor onto it,
    /// so a failed load leaves both the cursor and `current` untouched. The
    /// window edge `edge` places past the target is queued first.
    async fn step(&mut self, direction: isize, edge: isize) -> Result<bool> {
        let Some(target) = self.siblings.current_offset(direction) else {
            return Ok(false);
        };
        if edge != 0 {
            let edge = self.siblings.current_offset(direction + edge);
            self.populator.enqueue(edge.as_ref());
        }
        let collection = self.cache.get_or_create(&target).await?;
        if direction > 0 {
            self.siblings.go_next();
        } else {
            self.siblings.go_previous();
        }
        self.current = collection;
        Ok(true)
    }

    /// Adopt `settings`, drop every cached collection and reopen the current
    /// folder with the new settings.
    pub async fn reset(&mut self, settings: ViewerSettings) -> Result<Arc<FolderCollection>> {
        log::debug!("resetting navigator with {:?}", settings);
        self.cache.flush();
        let (cache, populator) =
            build_cache(&self.provider, &self.decoder, &self.notices, &settings);
        self.siblings = FolderSiblingNavigator::new(self.provider.clone(), settings.folder_order);
        self.cache = cache;
        self.populator = populator;
        self.settings = settings;

        match self.current.root().cloned() {
            Some(folder) => self.set_current_collection(&folder).await,
            None => Ok(self.current.clone()),
        }
    }
}

fn build_cache(
    provider: &Arc<dyn DirectoryProvider>,
    decoder: &Arc<dyn ImageDecoder>,
    notices: &Arc<Notices>,
    settings: &ViewerSettings,
) -> (CollectionCache, CachePopulator) {
    let factory = CollectionFactory::new(
        provider.clone(),
        decoder.clone(),
        notices.clone(),
        settings.clone(),
    );
    let cache = CollectionCache::new(factory, settings.cache_capacity());
    let populator = CachePopulator::new(cache.clone());
    (cache, populator)
}
