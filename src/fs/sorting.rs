use std::cmp::Ordering;
use std::path::Path;
use std::time::SystemTime;

use crate::fs::provider::{FileHandle, Folder};

/// Sort criteria for files within a folder or for sibling folders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Alphabetical (case-insensitive), default.
    #[default]
    NameAscending,
    NameDescending,
    /// Oldest first.
    ModifiedAscending,
    /// Newest first.
    ModifiedDescending,
    /// Listed by name, then shuffled once per folder query.
    Random,
}

impl SortOrder {
    /// Parse a sort order from a config or command string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" | "name_asc" | "name_ascending" => Some(SortOrder::NameAscending),
            "name_desc" | "name_descending" => Some(SortOrder::NameDescending),
            "modified" | "modified_asc" | "modified_ascending" => {
                Some(SortOrder::ModifiedAscending)
            }
            "modified_desc" | "modified_descending" => Some(SortOrder::ModifiedDescending),
            "random" | "shuffle" => Some(SortOrder::Random),
            _ => None,
        }
    }

    /// Get the display label for the current sort.
    pub fn label(&self) -> &'static str {
        match self {
            SortOrder::NameAscending => "Name ↑",
            SortOrder::NameDescending => "Name ↓",
            SortOrder::ModifiedAscending => "Modified ↑",
            SortOrder::ModifiedDescending => "Modified ↓",
            SortOrder::Random => "Random",
        }
    }

    /// Cycle to the next sort option.
    pub fn next(&self) -> Self {
        match self {
            SortOrder::NameAscending => SortOrder::NameDescending,
            SortOrder::NameDescending => SortOrder::ModifiedAscending,
            SortOrder::ModifiedAscending => SortOrder::ModifiedDescending,
            SortOrder::ModifiedDescending => SortOrder::Random,
            SortOrder::Random => SortOrder::NameAscending,
        }
    }

    pub fn is_random(&self) -> bool {
        *self == SortOrder::Random
    }

    /// The deterministic order a listing uses. Random is applied later by the
    /// shuffled query, so the listing itself stays name-ordered.
    pub fn listing_order(&self) -> Self {
        match self {
            SortOrder::Random => SortOrder::NameAscending,
            other => *other,
        }
    }

    /// Sort items in place.
    pub fn sort<T: Sortable>(&self, items: &mut [T]) {
        let order = self.listing_order();
        items.sort_by(|a, b| order.compare(a, b));
    }

    fn compare<T: Sortable>(&self, a: &T, b: &T) -> Ordering {
        let by_name = || {
            name_key(a.sort_path())
                .cmp(&name_key(b.sort_path()))
                .then_with(|| a.sort_path().cmp(b.sort_path()))
        };
        match self {
            SortOrder::NameAscending | SortOrder::Random => by_name(),
            SortOrder::NameDescending => by_name().reverse(),
            SortOrder::ModifiedAscending => a.modified().cmp(&b.modified()).then_with(by_name),
            SortOrder::ModifiedDescending => b.modified().cmp(&a.modified()).then_with(by_name),
        }
    }
}

/// Anything with a path and an optional modification time.
pub trait Sortable {
    fn sort_path(&self) -> &Path;
    fn modified(&self) -> Option<SystemTime>;
}

impl Sortable for Folder {
    fn sort_path(&self) -> &Path {
        self.path()
    }
    fn modified(&self) -> Option<SystemTime> {
        self.modified
    }
}

impl Sortable for FileHandle {
    fn sort_path(&self) -> &Path {
        self.path()
    }
    fn modified(&self) -> Option<SystemTime> {
        self.modified
    }
}

fn name_key(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
