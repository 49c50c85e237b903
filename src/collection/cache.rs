use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::cache::BoundedCache;
use crate::collection::{CollectionFactory, FolderCollection};
use crate::error::Result;
use crate::fs::provider::Folder;

type SharedBuild = Shared<BoxFuture<'static, Result<Arc<FolderCollection>>>>;

/// Built collections keyed by folder path, with get-or-create.
///
/// At most one build runs per folder at a time: a miss while a build for the
/// same folder is in flight waits for that build instead of starting another.
/// Cloning is cheap and every clone shares the same cache.
#[derive(Clone)]
pub struct CollectionCache {
    factory: Arc<CollectionFactory>,
    entries: Arc<BoundedCache<String, Arc<FolderCollection>>>,
    in_flight: Arc<Mutex<HashMap<String, SharedBuild>>>,
}

impl CollectionCache {
    pub fn new(factory: CollectionFactory, capacity: usize) -> Self {
        Self {
            factory: Arc::new(factory),
            entries: Arc::new(BoundedCache::new(capacity)),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The cached collection for `folder`, building it on a miss.
    pub async fn get_or_create(&self, folder: &Folder) -> Result<Arc<FolderCollection>> {
        let key = folder.key();
        if let Some(hit) = self.entries.try_get(&key) {
            return Ok(hit);
        }

        let build = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            // A build may have finished between the lookup and taking the lock.
            if let Some(hit) = self.entries.try_get(&key) {
                return Ok(hit);
            }
            match in_flight.get(&key) {
                Some(build) => build.clone(),
                None => {
                    log::debug!("cache miss for {}", key);
                    let build = self.start_build(key.clone(), folder.clone());
                    in_flight.insert(key, build.clone());
                    build
                }
            }
        };
        build.await
    }

    /// Spawn the build for `key`. The result is inserted before the in-flight
    /// entry is removed, so a concurrent caller always finds one or the other.
    fn start_build(&self, key: String, folder: Folder) -> SharedBuild {
        let this = self.clone();
        let build = async move {
            let result = this.factory.build(&folder).await.map(Arc::new);
            let result = match result {
                Ok(collection) => {
                    if this.entries.insert_if_absent(key.clone(), collection.clone()) {
                        Ok(collection)
                    } else {
                        Ok(this.entries.try_get(&key).unwrap_or(collection))
                    }
                }
                Err(e) => Err(e),
            };
            this.in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&key);
            result
        }
        .boxed()
        .shared();
        tokio::spawn(build.clone());
        build
    }

    pub fn contains(&self, folder: &Folder) -> bool {
        self.entries.contains(&folder.key())
    }

    /// Drop every cached collection. Builds still in flight complete into
    /// the emptied cache.
    pub fn flush(&self) {
        self.entries.flush();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }
}
