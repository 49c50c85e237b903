use std::io;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::collection::FolderCollection;
use crate::error::Result;
use crate::fs::sorting::SortOrder;
use crate::notice::Notice;
use crate::source::ImageElement;

/// A navigation request handed to the navigator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Next,
    Previous,
    Open(std::path::PathBuf),
    /// Change the file order, rebuilding every collection.
    Sort(SortOrder),
}

/// Result of a navigation run in the background.
#[derive(Debug)]
pub struct NavigationOutcome {
    pub request: Navigation,
    /// The new current collection, or `None` when already at the boundary.
    pub result: Result<Option<Arc<FolderCollection>>>,
}

/// A page fetched from a collection.
#[derive(Debug)]
pub struct PageResult {
    pub collection: Arc<FolderCollection>,
    pub page: usize,
    pub result: Result<Vec<ImageElement>>,
}

/// Application events.
#[derive(Debug)]
pub enum Event {
    /// A line typed on stdin.
    Input(String),
    /// Stdin reached end of file.
    InputClosed,
    /// A navigation finished.
    Navigated(NavigationOutcome),
    /// A page finished loading.
    Page(PageResult),
    /// Something the user should be told about.
    Notice(Notice),
    /// Background prefetch has drained.
    PrefetchIdle,
}

/// Merges stdin lines, notices and background results into one channel.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    tx: mpsc::UnboundedSender<Event>,
}

impl EventHandler {
    /// Start reading stdin and forwarding `notices`.
    pub fn new(mut notices: mpsc::UnboundedReceiver<Notice>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let input_tx = tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if input_tx.send(Event::Input(line)).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        let _ = input_tx.send(Event::InputClosed);
                        break;
                    }
                    Err(e) => {
                        log::error!("failed to read stdin: {}", e);
                        let _ = input_tx.send(Event::InputClosed);
                        break;
                    }
                }
            }
        });

        let notice_tx = tx.clone();
        tokio::spawn(async move {
            while let Some(notice) = notices.recv().await {
                if notice_tx.send(Event::Notice(notice)).is_err() {
                    break;
                }
            }
        });

        Self { rx, tx }
    }

    /// Get a sender clone for background tasks to report results.
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    /// Receive the next event (waits until one is available).
    pub async fn next(&mut self) -> Result<Event> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "event channel closed").into())
    }
}
