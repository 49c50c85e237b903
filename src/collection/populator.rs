use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tokio::sync::watch;

use crate::collection::CollectionCache;
use crate::fs::provider::Folder;
use crate::timing::WallClock;

/// A folder waiting to be built in the background.
#[derive(Debug, Clone)]
struct WorkItem {
    folder: Folder,
    queued_at: Instant,
}

#[derive(Debug, Default)]
struct Queue {
    items: VecDeque<WorkItem>,
    draining: bool,
}

/// Builds collections for folders the user is likely to open next.
///
/// Folders are queued at most once while pending. A single drain task is
/// spawned when the queue goes from idle to busy and exits once it is empty.
#[derive(Clone)]
pub struct CachePopulator {
    cache: CollectionCache,
    queue: Arc<Mutex<Queue>>,
    busy: Arc<watch::Sender<bool>>,
}

impl CachePopulator {
    pub fn new(cache: CollectionCache) -> Self {
        let (busy, _) = watch::channel(false);
        Self {
            cache,
            queue: Arc::new(Mutex::new(Queue::default())),
            busy: Arc::new(busy),
        }
    }

    /// Queue `folder` for a background build. Returns whether it was queued;
    /// nothing happens for `None`, a cached folder, or one already pending.
    pub fn enqueue(&self, folder: Option<&Folder>) -> bool {
        let Some(folder) = folder else {
            return false;
        };
        if self.cache.contains(folder) {
            return false;
        }

        let start_drain = {
            let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
            if queue.items.iter().any(|item| item.folder == *folder) {
                return false;
            }
            queue.items.push_back(WorkItem {
                folder: folder.clone(),
                queued_at: Instant::now(),
            });
            log::debug!("queued {} for background creation", folder.key());
            let idle = !queue.draining;
            if idle {
                queue.draining = true;
                self.busy.send_replace(true);
            }
            idle
        };

        if start_drain {
            tokio::spawn(self.clone().drain());
        }
        true
    }

    async fn drain(self) {
        while let Some(item) = self.next_item() {
            if self.cache.contains(&item.folder) {
                continue;
            }
            log::debug!(
                "servicing {} after {}ms in queue",
                item.folder.key(),
                item.queued_at.elapsed().as_millis()
            );
            let mut clock = WallClock::start();
            match self.cache.get_or_create(&item.folder).await {
                Ok(_) => {
                    clock.report(0, &format!("background creation for {}", item.folder.key()));
                }
                Err(e) => log::warn!("background creation for {} failed: {}", item.folder.key(), e),
            }
        }
    }

    /// Pop the next item, or mark the queue idle when there is none.
    fn next_item(&self) -> Option<WorkItem> {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let item = queue.items.pop_front();
        if item.is_none() {
            queue.draining = false;
            self.busy.send_replace(false);
        }
        item
    }

    pub fn pending(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .items
            .len()
    }

    pub fn is_idle(&self) -> bool {
        !*self.busy.borrow()
    }

    /// Resolve once the queue is empty and no drain task is running.
    pub async fn wait_idle(&self) {
        let mut busy = self.busy.subscribe();
        let _ = busy.wait_for(|busy| !*busy).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::CollectionFactory;
    use crate::config::ViewerSettings;
    use crate::notice::Notices;
    use crate::testing::{FakeDecoder, FakeFolder, FakeProvider};
    use std::time::Duration;

    fn setup(delay: Option<Duration>) -> (Arc<FakeProvider>, CollectionCache, CachePopulator) {
        let mut provider = FakeProvider::new()
            .with_folder(FakeFolder::new("/lib/a").with_files(&["1.png"]))
            .with_folder(FakeFolder::new("/lib/b").with_files(&["1.png"]));
        if let Some(delay) = delay {
            provider = provider.with_delay(delay);
        }
        let provider = Arc::new(provider);
        let factory = CollectionFactory::new(
            provider.clone(),
            Arc::new(FakeDecoder),
            Arc::new(Notices::silent()),
            ViewerSettings::default(),
        );
        let cache = CollectionCache::new(factory, 8);
        let populator = CachePopulator::new(cache.clone());
        (provider, cache, populator)
    }

    #[tokio::test]
    async fn builds_queued_folders_in_the_background() {
        let (_provider, cache, populator) = setup(None);
        assert!(populator.enqueue(Some(&Folder::new("/lib/a"))));
        assert!(populator.enqueue(Some(&Folder::new("/lib/b"))));
        populator.wait_idle().await;
        assert!(cache.contains(&Folder::new("/lib/a")));
        assert!(cache.contains(&Folder::new("/lib/b")));
        assert_eq!(populator.pending(), 0);
        assert!(populator.is_idle());
    }

    #[tokio::test]
    async fn duplicate_enqueue_builds_once() {
        let (provider, _cache, populator) = setup(Some(Duration::from_millis(20)));
        let a = Folder::new("/lib/a");
        let b = Folder::new("/lib/b");
        // The drain task cannot run before this test yields, so "/lib/b"
        // stays pending while it is queued again.
        assert!(populator.enqueue(Some(&b)));
        assert!(populator.enqueue(Some(&a)));
        assert!(!populator.enqueue(Some(&a)));
        assert_eq!(populator.pending(), 2);
        populator.wait_idle().await;
        assert_eq!(provider.subfolder_calls("/lib/a"), 1);
    }

    #[tokio::test]
    async fn cached_and_missing_folders_are_skipped() {
        let (provider, cache, populator) = setup(None);
        let a = Folder::new("/lib/a");
        cache.get_or_create(&a).await.unwrap();
        assert!(!populator.enqueue(Some(&a)));
        assert!(!populator.enqueue(None));
        populator.wait_idle().await;
        assert_eq!(provider.subfolder_calls("/lib/a"), 1);
    }

    #[tokio::test]
    async fn enqueue_after_drain_restarts_it() {
        let (_provider, cache, populator) = setup(None);
        populator.enqueue(Some(&Folder::new("/lib/a")));
        populator.wait_idle().await;
        populator.enqueue(Some(&Folder::new("/lib/b")));
        populator.wait_idle().await;
        assert!(cache.contains(&Folder::new("/lib/b")));
    }

    #[tokio::test]
    async fn wait_idle_returns_immediately_when_idle() {
        let (_provider, _cache, populator) = setup(None);
        tokio::time::timeout(Duration::from_millis(100), populator.wait_idle())
            .await
            .unwrap();
    }
}
