use std::sync::{Arc, Mutex, PoisonError};

use crate::error::Result;
use crate::fs::provider::{DirectoryProvider, Folder};
use crate::fs::sorting::SortOrder;

/// A folder's siblings and its position among them. `index` is `None` while
/// no folder is resolved.
#[derive(Debug, Clone, Default)]
struct Cursor {
    siblings: Arc<Vec<Folder>>,
    index: Option<usize>,
}

impl Cursor {
    fn offset(&self, k: isize) -> Option<usize> {
        let target = self.index?.checked_add_signed(k)?;
        (target < self.siblings.len()).then_some(target)
    }
}

/// Tracks the current folder among the children of its parent.
///
/// `set_current` rebuilds the whole cursor and swaps it in under the lock,
/// so readers see either the old position or the new one.
pub struct FolderSiblingNavigator {
    provider: Arc<dyn DirectoryProvider>,
    order: SortOrder,
    cursor: Mutex<Cursor>,
}

impl FolderSiblingNavigator {
    pub fn new(provider: Arc<dyn DirectoryProvider>, order: SortOrder) -> Self {
        Self {
            provider,
            order: order.listing_order(),
            cursor: Mutex::new(Cursor::default()),
        }
    }

    /// Resolve `folder` among its parent's children.
    ///
    /// A root folder, or one whose parent no longer lists it, leaves the
    /// navigator unresolved. So does a folder that vanished or cannot be read.
    pub async fn set_current(&self, folder: &Folder) -> Result<()> {
        let cursor = match self.resolve(folder).await {
            Ok(cursor) => cursor,
            Err(e) if e.is_access_error() => {
                log::debug!("cannot resolve siblings of {}: {}", folder.key(), e);
                Cursor::default()
            }
            Err(e) => return Err(e),
        };
        *self.lock() = cursor;
        Ok(())
    }

    async fn resolve(&self, folder: &Folder) -> Result<Cursor> {
        let Some(parent) = self.provider.parent(folder).await? else {
            return Ok(Cursor::default());
        };
        let siblings = self.provider.list_child_folders(&parent, self.order).await?;
        let name = folder.name();
        let index = siblings.iter().position(|s| s.name() == name);
        Ok(Cursor {
            siblings: Arc::new(siblings),
            index,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Cursor> {
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[allow(dead_code)]
    pub fn current(&self) -> Option<Folder> {
        self.current_offset(0)
    }

    /// The sibling `k` places from the current one, without moving.
    pub fn current_offset(&self, k: isize) -> Option<Folder> {
        let cursor = self.lock();
        cursor.offset(k).map(|i| cursor.siblings[i].clone())
    }

    pub fn has_next(&self) -> bool {
        self.lock().offset(1).is_some()
    }

    pub fn has_previous(&self) -> bool {
        self.lock().offset(-1).is_some()
    }

    pub fn go_next(&self) -> Option<Folder> {
        self.step(1)
    }

    pub fn go_previous(&self) -> Option<Folder> {
        self.step(-1)
    }

    fn step(&self, k: isize) -> Option<Folder> {
        let mut cursor = self.lock();
        let target = cursor.offset(k)?;
        cursor.index = Some(target);
        Some(cursor.siblings[target].clone())
    }

    /// Position and sibling count, for status display.
    pub fn position(&self) -> Option<(usize, usize)> {
        let cursor = self.lock();
        cursor.index.map(|i| (i, cursor.siblings.len()))
    }
}
