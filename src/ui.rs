use std::io::{self, Write};

use crate::app::App;
use crate::collection::{CollectionNavigator, FolderCollection};
use crate::notice::Notice;
use crate::source::ImageElement;

/// Write everything the app has queued for display.
pub fn render(app: &mut App, out: &mut impl Write) -> io::Result<()> {
    for line in app.output.drain(..) {
        writeln!(out, "{}", line)?;
    }
    if let Some(msg) = app.status_message.take() {
        writeln!(out, "-- {}", msg)?;
    }
    out.flush()
}

/// `name [index] path (counters)`, the title of the current view.
pub fn title_line(collection: &FolderCollection, index: Option<usize>) -> String {
    let name = if collection.is_empty_collection() {
        "(no folder)"
    } else {
        collection.name()
    };
    let shown = index
        .and_then(|i| collection.path_for_index(i).map(|p| (i, p)))
        .map(|(i, p)| format!(" [{}] {}", i, p.display()))
        .unwrap_or_default();
    format!(
        "== {}{}  ({} files loaded, {} images decoded)",
        name,
        shown,
        collection.files_loaded(),
        collection.images_decoded()
    )
}

pub fn page_lines(
    collection: &FolderCollection,
    page: usize,
    items: &[ImageElement],
) -> Vec<String> {
    let mut lines = Vec::with_capacity(items.len() + 1);
    if let Some(first) = items.first() {
        lines.push(title_line(collection, Some(first.index)));
    }
    lines.push(format!("-- page {}", page));
    for item in items {
        let size = match item.dimensions() {
            Some((w, h)) => format!("{}x{}", w, h),
            None => "unreadable".to_string(),
        };
        lines.push(format!("{:>6}  {}  {}", item.index, item.file.path().display(), size));
    }
    lines
}

pub fn end_line(collection: &FolderCollection) -> String {
    format!("-- end of {} ({} images)", collection.name(), collection.files_loaded())
}

pub fn notice_line(notice: &Notice) -> String {
    match notice {
        Notice::NotFound(path) => format!("!! {} no longer exists", path.display()),
        Notice::AccessDenied(path) => format!(
            "!! Permission denied for {}; grant read access and reopen it",
            path.display()
        ),
        Notice::DecodeFailure { path, message } => format!(
            "!! Cannot decode {}: {} (type `silence` to hide these)",
            path.display(),
            message
        ),
    }
}

pub fn status_line(collection: &FolderCollection, navigator: &CollectionNavigator) -> String {
    let position = match navigator.siblings().position() {
        Some((i, n)) => format!(
            "{}folder {}/{}{}",
            if navigator.can_go_previous() { "< " } else { "" },
            i + 1,
            n,
            if navigator.can_go_next() { " >" } else { "" }
        ),
        None => "no siblings".to_string(),
    };
    let settings = navigator.settings();
    let populator = navigator.populator();
    let cache = navigator.cache();
    format!(
        "{} | {} | sort {} | cache {}/{} | prefetch {}",
        title_line(collection, None),
        position,
        settings.file_order.label(),
        cache.len(),
        cache.capacity(),
        if populator.is_idle() {
            "idle".to_string()
        } else {
            format!("{} pending", populator.pending())
        }
    )
}

pub fn help_lines() -> Vec<String> {
    [
        "n, next        next sibling folder",
        "p, prev        previous sibling folder",
        "m, more        next page (or just press enter)",
        "page <k>       show page k",
        "open <path>    open another folder",
        "sort [order]   name, name_desc, modified, modified_desc, random",
        "silence        hide decode errors for this session",
        "status         show position, cache and prefetch state",
        "wait           report when background prefetch is done",
        "q, quit        exit",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
