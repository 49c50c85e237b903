use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::collection::{CollectionNavigator, FolderCollection};
use crate::config::ViewerSettings;
use crate::error::{Result, ViewerError};
use crate::event::{Event, Navigation, NavigationOutcome, PageResult};
use crate::fs::provider::Folder;
use crate::fs::sorting::SortOrder;
use crate::notice::{Notice, Notices};
use crate::ui;

/// Main application state.
pub struct App {
    navigator: Arc<Mutex<CollectionNavigator>>,
    notices: Arc<Notices>,
    events: mpsc::UnboundedSender<Event>,
    pub current: Arc<FolderCollection>,
    pub page_size: usize,
    /// Page `more` shows next; `None` once the collection is exhausted.
    pub next_page: Option<usize>,
    file_order: SortOrder,
    pub should_quit: bool,
    /// Lines waiting to be written by `ui::render`.
    pub output: Vec<String>,
    pub status_message: Option<String>,
}

impl App {
    pub fn new(
        navigator: CollectionNavigator,
        page_size: usize,
        events: mpsc::UnboundedSender<Event>,
    ) -> Self {
        let notices = navigator.notices().clone();
        let file_order = navigator.settings().file_order;
        let current = navigator.current();
        Self {
            navigator: Arc::new(Mutex::new(navigator)),
            notices,
            events,
            current,
            page_size: page_size.max(1),
            next_page: None,
            file_order,
            should_quit: false,
            output: Vec::new(),
            status_message: None,
        }
    }

    pub fn file_order(&self) -> SortOrder {
        self.file_order
    }

    pub fn set_status_message(&mut self, msg: String) {
        self.status_message = Some(msg);
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Make `path` absolute against the current collection's root.
    pub fn resolve_path(&self, path: &Path) -> Result<PathBuf> {
        let joined = match self.current.root() {
            Some(root) if path.is_relative() => root.path().join(path),
            _ => path.to_path_buf(),
        };
        joined
            .canonicalize()
            .map_err(|_| ViewerError::InvalidPath(format!("{} does not exist", joined.display())))
    }

    /// Run `request` on the navigator in the background.
    ///
    /// Only one navigation runs at a time. A request arriving while another
    /// is in flight is dropped, not queued.
    pub fn navigate(&mut self, request: Navigation) {
        let Ok(mut navigator) = self.navigator.clone().try_lock_owned() else {
            self.set_status_message("Busy: navigation in progress, command dropped".into());
            return;
        };
        log::debug!("navigation {:?}", request);
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = match &request {
                Navigation::Next => navigator
                    .move_next()
                    .await
                    .map(|moved| moved.then(|| navigator.current())),
                Navigation::Previous => navigator
                    .move_previous()
                    .await
                    .map(|moved| moved.then(|| navigator.current())),
                Navigation::Open(path) => navigator
                    .set_current_collection(&Folder::new(path.clone()))
                    .await
                    .map(Some),
                Navigation::Sort(order) => {
                    let settings = ViewerSettings {
                        file_order: *order,
                        ..navigator.settings().clone()
                    };
                    navigator.reset(settings).await.map(Some)
                }
            };
            drop(navigator);
            let _ = tx.send(Event::Navigated(NavigationOutcome { request, result }));
        });
    }

    pub fn handle_navigation(&mut self, outcome: NavigationOutcome) {
        match outcome.result {
            Ok(Some(collection)) => {
                if let Navigation::Sort(order) = outcome.request {
                    self.file_order = order;
                    self.set_status_message(format!("Sort: {}", order.label()));
                }
                self.current = collection;
                self.output.push(ui::title_line(&self.current, None));
                self.show_page(0);
            }
            Ok(None) => {
                let edge = match outcome.request {
                    Navigation::Previous => "first",
                    _ => "last",
                };
                self.set_status_message(format!("Already at the {} folder", edge));
            }
            Err(e) => {
                log::error!("{:?} failed: {}", outcome.request, e);
                self.set_status_message(format!("Error: {}", e));
            }
        }
    }

    pub fn show_next_page(&mut self) {
        match self.next_page {
            Some(page) => self.show_page(page),
            None => self.set_status_message("End of collection".into()),
        }
    }

    /// Fetch page `page` of the current collection in the background.
    pub fn show_page(&mut self, page: usize) {
        let collection = self.current.clone();
        let page_size = self.page_size;
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = collection.get_paged_items(page, page_size).await;
            let _ = tx.send(Event::Page(PageResult {
                collection,
                page,
                result,
            }));
        });
    }

    pub fn handle_page(&mut self, page: PageResult) {
        if !Arc::ptr_eq(&page.collection, &self.current) {
            log::debug!("dropping page {} of {}", page.page, page.collection.name());
            return;
        }
        match page.result {
            Ok(items) => {
                self.next_page = (items.len() == self.page_size).then_some(page.page + 1);
                self.output.extend(ui::page_lines(&self.current, page.page, &items));
                if self.next_page.is_none() {
                    self.output.push(ui::end_line(&self.current));
                }
            }
            Err(e) => self.set_status_message(format!("Error: {}", e)),
        }
    }

    pub fn handle_notice(&mut self, notice: Notice) {
        self.output.push(ui::notice_line(&notice));
    }

    pub fn silence_decode_failures(&mut self) {
        self.notices.suppress_decode_failures();
        self.set_status_message("Decode errors silenced for this session".into());
    }

    pub fn show_status(&mut self) {
        let line = match self.navigator.try_lock() {
            Ok(navigator) => ui::status_line(&self.current, &navigator),
            Err(_) => format!("{} (navigation in progress)", ui::title_line(&self.current, None)),
        };
        self.output.push(line);
    }

    /// Report once background prefetch has drained.
    pub fn wait_for_prefetch(&mut self) {
        let populator = self
            .navigator
            .try_lock()
            .map(|navigator| navigator.populator().clone());
        let populator = match populator {
            Ok(populator) => populator,
            Err(_) => {
                self.set_status_message("Busy: navigation in progress".into());
                return;
            }
        };
        let tx = self.events.clone();
        tokio::spawn(async move {
            populator.wait_idle().await;
            let _ = tx.send(Event::PrefetchIdle);
        });
    }

    pub fn show_help(&mut self) {
        self.output.extend(ui::help_lines());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDecoder, FakeFolder, FakeProvider};

    fn app() -> (App, mpsc::UnboundedReceiver<Event>) {
        let provider = FakeProvider::new()
            .with_folder(FakeFolder::new("/lib/a").with_numbered_files(5))
            .with_folder(FakeFolder::new("/lib/b").with_numbered_files(1));
        let navigator = CollectionNavigator::new(
            Arc::new(provider),
            Arc::new(FakeDecoder),
            Arc::new(Notices::silent()),
            ViewerSettings::default(),
        );
        let (tx, rx) = mpsc::unbounded_channel();
        (App::new(navigator, 4, tx), rx)
    }

    async fn next_navigation(rx: &mut mpsc::UnboundedReceiver<Event>) -> NavigationOutcome {
        loop {
            if let Some(Event::Navigated(outcome)) = rx.recv().await {
                return outcome;
            }
        }
    }

    async fn next_page(rx: &mut mpsc::UnboundedReceiver<Event>) -> PageResult {
        loop {
            if let Some(Event::Page(page)) = rx.recv().await {
                return page;
            }
        }
    }

    #[tokio::test]
    async fn open_shows_the_first_page() {
        let (mut app, mut rx) = app();
        app.navigate(Navigation::Open(PathBuf::from("/lib/a")));
        let outcome = next_navigation(&mut rx).await;
        app.handle_navigation(outcome);
        assert_eq!(app.current.name(), "/lib/a");

        let page = next_page(&mut rx).await;
        app.handle_page(page);
        assert_eq!(app.next_page, Some(1));
        app.show_next_page();
        let page = next_page(&mut rx).await;
        assert_eq!(page.page, 1);
        app.handle_page(page);
        assert_eq!(app.next_page, None);
    }

    #[tokio::test]
    async fn second_navigation_is_dropped_while_busy() {
        let (mut app, mut rx) = app();
        app.navigate(Navigation::Open(PathBuf::from("/lib/a")));
        app.navigate(Navigation::Next);
        assert!(app
            .status_message
            .as_deref()
            .is_some_and(|m| m.contains("dropped")));
        let outcome = next_navigation(&mut rx).await;
        assert_eq!(outcome.request, Navigation::Open(PathBuf::from("/lib/a")));
    }

    #[tokio::test]
    async fn pages_of_a_stale_collection_are_ignored() {
        let (mut app, _rx) = app();
        let stale = Arc::new(FolderCollection::empty());
        app.handle_page(PageResult {
            collection: stale,
            page: 0,
            result: Ok(Vec::new()),
        });
        assert!(app.output.is_empty());
    }

    #[tokio::test]
    async fn boundary_sets_a_status_message() {
        let (mut app, _rx) = app();
        app.handle_navigation(NavigationOutcome {
            request: Navigation::Previous,
            result: Ok(None),
        });
        assert_eq!(app.status_message.as_deref(), Some("Already at the first folder"));
    }

    #[tokio::test]
    async fn wait_reports_when_prefetch_is_idle() {
        let (mut app, mut rx) = app();
        app.navigate(Navigation::Open(PathBuf::from("/lib/a")));
        let outcome = next_navigation(&mut rx).await;
        app.handle_navigation(outcome);
        app.wait_for_prefetch();
        loop {
            if let Some(Event::PrefetchIdle) = rx.recv().await {
                break;
            }
        }
    }

    #[tokio::test]
    async fn wait_during_navigation_sets_busy_status() {
        let (mut app, _rx) = app();
        app.navigate(Navigation::Open(PathBuf::from("/lib/a")));
        app.wait_for_prefetch();
        assert_eq!(
            app.status_message.as_deref(),
            Some("Busy: navigation in progress")
        );
    }

    #[tokio::test]
    async fn sort_change_updates_the_order() {
        let (mut app, mut rx) = app();
        app.navigate(Navigation::Sort(SortOrder::Random));
        let outcome = next_navigation(&mut rx).await;
        app.handle_navigation(outcome);
        assert_eq!(app.file_order(), SortOrder::Random);
    }
}
