//! Plain-text rendering of lists, search results and details.
//!
//! Every function here is pure: it takes state and a width in columns and
//! returns the text to print.

use crate::app::{App, DetailState, View};
use crate::catalog::links::{backdrop_url, poster_url, tmdb_page_url};
use crate::catalog::{ListKind, MediaDetail, MediaSummary, MediaType};
use crate::collection::{CollectionView, FetchStatus};
use crate::util::{display_width, fit_to_width, strip_control_chars, wrap_to_width};

/// Index column ("123. ") plus a space and the rating column.
const ROW_CHROME: usize = 5 + 1 + 5;

pub fn list_title(list: ListKind) -> &'static str {
    match list {
        ListKind::Popular => "Popular movies",
        ListKind::TopRated => "Top rated movies",
        ListKind::NowPlaying => "Now playing",
        ListKind::Upcoming => "Upcoming",
    }
}

/// Render whatever the app is showing.
pub fn render(app: &App, width: usize) -> String {
    match app.view {
        View::List(list) => match app.list_view(list) {
            Some(view) => render_list(list_title(list), &view, width),
            None => format!("{} is not available\n", list_title(list)),
        },
        View::Search => match (&app.search_handle, app.search_query.as_deref()) {
            (Some(_), Some(query)) => {
                format!("Searching for \"{}\"...\n", strip_control_chars(query))
            }
            _ => render_search(app.search_query.as_deref(), &app.search_results, width),
        },
        View::Detail => render_detail_state(&app.detail, width),
    }
}

/// One numbered row per item.
pub fn render_rows(items: &[MediaSummary], width: usize) -> String {
    let title_width = width.saturating_sub(ROW_CHROME).max(10);
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        let mut label = strip_control_chars(&item.title).into_owned();
        if let Some(year) = item.year() {
            label.push_str(&format!(" ({year})"));
        }
        if item.media_type == MediaType::Tv {
            label.push_str(" [TV]");
        }
        out.push_str(&format!(
            "{:>3}. {} {:>5}\n",
            i + 1,
            fit_to_width(&label, title_width),
            item.rating_label()
        ));
    }
    out
}

pub fn render_list(title: &str, view: &CollectionView<'_, MediaSummary>, width: usize) -> String {
    let mut out = format!(
        "{title} (page {}/{}, {} items)\n",
        view.current_page,
        view.total_pages,
        view.items.len()
    );
    out.push_str(&rule(width));
    if view.items.is_empty() && view.status != FetchStatus::Error {
        out.push_str("  Loading...\n");
    } else {
        out.push_str(&render_rows(view.items, width));
    }
    if let Some(line) = render_status_line(view) {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Footer describing fetch progress, if there is anything to say.
pub fn render_status_line(view: &CollectionView<'_, MediaSummary>) -> Option<String> {
    match view.status {
        FetchStatus::Fetching => Some("  ... loading".to_string()),
        FetchStatus::Error => Some(format!(
            "  ! {} (`more` or `refresh` to retry)",
            view.last_error.unwrap_or("Failed to load page")
        )),
        FetchStatus::Idle if view.has_more() => Some("  `more` for the next page".to_string()),
        FetchStatus::Idle => None,
    }
}

pub fn render_search(query: Option<&str>, results: &[MediaSummary], width: usize) -> String {
    let Some(query) = query else {
        return "Type `search <title>` to find movies and TV shows\n".to_string();
    };
    let mut out = format!("Results for \"{}\" ({})\n", strip_control_chars(query), results.len());
    out.push_str(&rule(width));
    if results.is_empty() {
        out.push_str("  No results\n");
    } else {
        out.push_str(&render_rows(results, width));
    }
    out
}

fn render_detail_state(state: &DetailState, width: usize) -> String {
    match state {
        DetailState::Empty => "Nothing selected. Use `open <n>`\n".to_string(),
        DetailState::Loading { title, .. } => {
            format!("Loading {}...\n", strip_control_chars(title))
        }
        DetailState::Loaded(detail) => render_detail(detail, width),
        DetailState::Failed { error, .. } => format!("Could not load details: {error}\n"),
    }
}

pub fn render_detail(detail: &MediaDetail, width: usize) -> String {
    let mut heading = strip_control_chars(&detail.title).into_owned();
    if let Some(year) = detail.year() {
        heading.push_str(&format!(" ({year})"));
    }
    let mut out = format!("{heading}\n");
    out.push_str(&"=".repeat(display_width(&heading).min(width)));
    out.push('\n');

    if let Some(tagline) = detail.tagline.as_deref().filter(|t| !t.is_empty()) {
        out.push_str(&format!("\"{tagline}\"\n"));
    }

    let mut facts = vec![format!("Rating {}", detail.rating_label())];
    if let Some(runtime) = detail.runtime.filter(|&m| m > 0) {
        facts.push(format!("{}h{:02}", runtime / 60, runtime % 60));
    }
    if !detail.genres.is_empty() {
        facts.push(detail.genres.join(", "));
    }
    out.push_str(&facts.join(" | "));
    out.push_str("\n\n");

    match detail.overview.as_deref().filter(|o| !o.trim().is_empty()) {
        Some(overview) => {
            for line in wrap_to_width(overview, width) {
                out.push_str(&line);
                out.push('\n');
            }
        }
        None => out.push_str("No overview available.\n"),
    }
    out.push('\n');

    out.push_str(&format!("Poster:   {}\n", poster_url(detail.poster_path.as_deref())));
    out.push_str(&format!(
        "Backdrop: {}\n",
        backdrop_url(detail.backdrop_path.as_deref())
    ));
    out.push_str(&format!(
        "TMDB:     {}\n",
        tmdb_page_url(detail.media_type, detail.id)
    ));
    if let Some(url) = detail.trailer.as_ref().and_then(|t| t.watch_url()) {
        out.push_str(&format!("Trailer:  {url}\n"));
    }
    if let Some(homepage) = detail.homepage.as_deref().filter(|h| !h.is_empty()) {
        out.push_str(&format!("Website:  {homepage}\n"));
    }
    out
}

pub fn render_help() -> String {
    [
        "Commands:",
        "  more, m          load the next page of the current list",
        "  refresh, r       reload the current list from page 1",
        "  list, l          popular movies",
        "  top, t           top rated movies",
        "  search <title>   search movies and TV shows (also /title)",
        "  open <n>, <n>    details of item n",
        "  back, b          leave details or search",
        "  help, ?          this help",
        "  quit, q          save and exit",
        "",
    ]
    .join("\n")
}

fn rule(width: usize) -> String {
    let mut line = "-".repeat(width.min(60));
    line.push('\n');
    line
}
