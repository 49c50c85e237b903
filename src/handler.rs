use std::path::PathBuf;

use crate::app::App;
use crate::event::Navigation;
use crate::fs::sorting::SortOrder;

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    More,
    Page(usize),
    Open(PathBuf),
    Sort(SortOrder),
    /// Switch to the next file order in the cycle.
    CycleSort,
    Silence,
    Status,
    Wait,
    Help,
    Quit,
}

/// Parse one input line. Blank lines mean "more".
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    match word {
        "" | "m" | "more" => Ok(Command::More),
        "n" | "next" => Ok(Command::Next),
        "p" | "prev" | "previous" => Ok(Command::Previous),
        "page" => rest
            .parse()
            .map(Command::Page)
            .map_err(|_| format!("page expects a number, got {:?}", rest)),
        "open" | "o" if !rest.is_empty() => Ok(Command::Open(PathBuf::from(rest))),
        "open" | "o" => Err("open expects a path".into()),
        "sort" if rest.is_empty() => Ok(Command::CycleSort),
        "sort" => SortOrder::parse(rest)
            .map(Command::Sort)
            .ok_or_else(|| format!("unknown sort order {:?}", rest)),
        "silence" => Ok(Command::Silence),
        "status" | "s" => Ok(Command::Status),
        "wait" => Ok(Command::Wait),
        "help" | "h" | "?" => Ok(Command::Help),
        "q" | "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command {:?} (try help)", other)),
    }
}

/// Handle a line typed by the user.
pub fn handle_input(app: &mut App, line: &str) {
    match parse_command(line) {
        Ok(command) => handle_command(app, command),
        Err(message) => app.set_status_message(message),
    }
}

pub fn handle_command(app: &mut App, command: Command) {
    match command {
        Command::Next => app.navigate(Navigation::Next),
        Command::Previous => app.navigate(Navigation::Previous),
        Command::Open(path) => match app.resolve_path(&path) {
            Ok(path) => app.navigate(Navigation::Open(path)),
            Err(e) => app.set_status_message(e.to_string()),
        },
        Command::Sort(order) => app.navigate(Navigation::Sort(order)),
        Command::CycleSort => {
            let order = app.file_order().next();
            app.navigate(Navigation::Sort(order));
        }
        Command::More => app.show_next_page(),
        Command::Page(page) => app.show_page(page),
        Command::Silence => app.silence_decode_failures(),
        Command::Status => app.show_status(),
        Command::Wait => app.wait_for_prefetch(),
        Command::Help => app.show_help(),
        Command::Quit => app.quit(),
    }
}
