//! Command parsing and dispatch for the browse loop.

use std::time::Duration;
use tokio::sync::mpsc;

use crate::app::{App, AppEvent, LoadMore, View};
use crate::catalog::ListKind;

/// A line typed at the browse prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Next page of the active list
    More,
    /// Reload the active list from page 1
    Refresh,
    /// Show popular movies
    Popular,
    /// Show top rated movies
    TopRated,
    Search(String),
    /// Open the detail of the n-th item shown (1-based)
    Open(usize),
    /// Return from search or detail to the active list
    Back,
    Help,
    Quit,
}

/// What the loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Continue,
    /// Print the command reference.
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    // `/query` is shorthand for `search query`
    if let Some(query) = line.strip_prefix('/') {
        return Ok(Some(Command::Search(query.trim().to_string())));
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "more" | "m" | "next" => Command::More,
        "refresh" | "r" => Command::Refresh,
        "list" | "l" | "popular" => Command::Popular,
        "top" | "t" => Command::TopRated,
        "search" | "s" => Command::Search(rest.to_string()),
        "open" | "o" => Command::Open(parse_index(rest)?),
        "back" | "b" => Command::Back,
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        _ if rest.is_empty() && word.chars().all(|c| c.is_ascii_digit()) => {
            Command::Open(parse_index(word)?)
        }
        other => return Err(format!("Unknown command: {other} (type `help`)")),
    };

    if !rest.is_empty() && !matches!(command, Command::Search(_) | Command::Open(_)) {
        return Err(format!("`{word}` takes no arguments"));
    }
    Ok(Some(command))
}

fn parse_index(s: &str) -> Result<usize, String> {
    if s.is_empty() {
        return Err("Usage: open <number>".to_string());
    }
    s.parse::<usize>()
        .map_err(|_| format!("Not an item number: {s}"))
}

/// Apply a command to the app.
///
/// Searches are queued for `debounce` so that a quick correction replaces
/// the previous query before it reaches the network.
pub(super) fn handle_command(
    app: &mut App,
    command: Command,
    event_tx: &mpsc::Sender<AppEvent>,
    debounce: Duration,
) -> Action {
    match command {
        Command::More => {
            let list = app.active_list;
            app.show_list(list);
            match app.load_more(list, event_tx) {
                LoadMore::Started(page) => app.set_status(format!("Loading page {page}...")),
                LoadMore::Busy => app.set_status("Already loading, please wait"),
                LoadMore::Exhausted => app.set_status("No more pages"),
            }
        }
        Command::Refresh => {
            let list = app.active_list;
            app.show_list(list);
            app.refresh(list, event_tx);
            app.set_status("Refreshing...");
        }
        Command::Popular => app.show_list(ListKind::Popular),
        Command::TopRated => app.show_list(ListKind::TopRated),
        Command::Search(query) => {
            if query.trim().is_empty() {
                app.pending_search = None;
                app.search(query, event_tx);
            } else {
                app.queue_search(query, debounce);
            }
        }
        Command::Open(index) => {
            if let Err(e) = app.open_detail(index, event_tx) {
                app.set_status(e.to_string());
            }
        }
        Command::Back => {
            if let Some(handle) = app.detail_handle.take() {
                handle.abort();
            }
            match app.view {
                // Back from a detail opened out of search results
                View::Detail if app.search_query.is_some() => app.view = View::Search,
                _ => app.show_list(app.active_list),
            }
        }
        Command::Help => return Action::Help,
        Command::Quit => return Action::Quit,
    }
    Action::Continue
}
