mod app;
mod cache;
mod collection;
mod config;
mod error;
mod event;
mod fs;
mod handler;
mod navigation;
mod notice;
mod query;
mod source;
#[cfg(test)]
mod testing;
mod timing;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;

use crate::app::App;
use crate::collection::CollectionNavigator;
use crate::config::{AppConfig, DisplayConfig, PrefetchConfig, SortConfig};
use crate::event::{Event, EventHandler, Navigation};
use crate::fs::local::LocalDirectoryProvider;
use crate::fs::sorting::SortOrder;
use crate::notice::Notices;
use crate::source::ImageCrateDecoder;

/// Page through the images of a folder tree, one folder at a time.
#[derive(Parser, Debug)]
#[command(name = "ipg", version, about)]
struct Cli {
    /// Folder to open (defaults to the configured default_path, then the current directory)
    path: Option<PathBuf>,

    /// Path to a config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// File order: name, name_desc, modified, modified_desc, random
    #[arg(long)]
    sort: Option<String>,

    /// Sibling folder order, same values as --sort
    #[arg(long)]
    folder_sort: Option<String>,

    /// Sibling folders to prefetch ahead
    #[arg(long)]
    look_ahead: Option<usize>,

    /// Sibling folders to prefetch behind
    #[arg(long)]
    look_behind: Option<usize>,

    /// Images per page
    #[arg(long)]
    page_size: Option<usize>,
}

impl Cli {
    /// Reject sort orders that would otherwise silently fall back to name.
    fn validate(&self) -> error::Result<()> {
        for value in [&self.sort, &self.folder_sort].into_iter().flatten() {
            if SortOrder::parse(value).is_none() {
                return Err(error::ViewerError::Config(format!(
                    "unknown sort order {:?}",
                    value
                )));
            }
        }
        Ok(())
    }

    /// CLI flags as a partial config that overrides every file.
    fn overrides(&self) -> AppConfig {
        AppConfig {
            sort: SortConfig {
                files: self.sort.clone(),
                folders: self.folder_sort.clone(),
            },
            prefetch: PrefetchConfig {
                look_ahead: self.look_ahead,
                look_behind: self.look_behind,
            },
            display: DisplayConfig {
                page_size: self.page_size,
            },
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> error::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    cli.validate()?;
    let config = AppConfig::load(cli.config.as_deref(), Some(&cli.overrides()));

    let path = cli
        .path
        .clone()
        .or_else(|| config.default_path().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    let path = path.canonicalize().map_err(|_| {
        error::ViewerError::InvalidPath(format!("{} does not exist", path.display()))
    })?;

    let (notice_tx, notice_rx) = mpsc::unbounded_channel();
    let notices = Arc::new(Notices::new(notice_tx));
    if config.suppress_decode_errors() {
        notices.suppress_decode_failures();
    }

    let navigator = CollectionNavigator::new(
        Arc::new(LocalDirectoryProvider::new()),
        Arc::new(ImageCrateDecoder),
        notices,
        config.viewer_settings(),
    );
    let mut events = EventHandler::new(notice_rx);
    let mut app = App::new(navigator, config.page_size(), events.sender());
    app.navigate(Navigation::Open(path));

    let mut stdout = std::io::stdout();
    loop {
        match events.next().await? {
            Event::Input(line) => handler::handle_input(&mut app, &line),
            Event::InputClosed => app.quit(),
            Event::Navigated(outcome) => app.handle_navigation(outcome),
            Event::Page(page) => app.handle_page(page),
            Event::Notice(notice) => app.handle_notice(notice),
            Event::PrefetchIdle => app.set_status_message("Prefetch idle".into()),
        }

        ui::render(&mut app, &mut stdout)?;

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
