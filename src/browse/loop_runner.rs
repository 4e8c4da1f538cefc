//! Main loop of the interactive browser.
//!
//! This module multiplexes input lines, background task events, the search
//! debounce timer and shutdown signals.

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use crate::app::{App, AppEvent};

use super::events::handle_app_event;
use super::helpers::terminal_width;
use super::input::{handle_command, parse_command, Action};
use super::render::{render, render_help};

const PROMPT: &str = "marquee> ";

/// Knobs for [`run`].
#[derive(Debug, Clone)]
pub struct BrowseOptions {
    /// Delay before a typed search is sent.
    pub search_debounce: Duration,
    /// Output width in columns.
    pub width: usize,
}

impl Default for BrowseOptions {
    fn default() -> Self {
        Self {
            search_debounce: Duration::from_millis(500),
            width: terminal_width(),
        }
    }
}

/// Runs the browser until `quit`, end of input or a shutdown signal.
///
/// Uses `tokio::select!` to multiplex four event sources:
/// - **Signals**: SIGTERM/SIGINT end the session (Unix only)
/// - **Input lines**: one command per line
/// - **Background tasks**: page, search and detail completions via `AppEvent`
/// - **Debounce timer**: fires the queued search once typing settles
///
/// Persisted lists are restored before the first refresh, and saved again on
/// the way out.
pub async fn run<R, W>(
    app: &mut App,
    input: R,
    out: &mut W,
    options: BrowseOptions,
    event_tx: mpsc::Sender<AppEvent>,
    mut event_rx: mpsc::Receiver<AppEvent>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    #[cfg(unix)]
    let mut sigterm = signal(SignalKind::terminate())?;
    #[cfg(unix)]
    let mut sigint = signal(SignalKind::interrupt())?;

    app.restore_snapshots().await;
    app.refresh_all(&event_tx);

    let mut needs_redraw = true;
    loop {
        // Drain pending events before reading more input
        while let Ok(event) = event_rx.try_recv() {
            needs_redraw |= handle_app_event(app, event);
        }

        if needs_redraw {
            write_screen(out, app, options.width).await?;
            needs_redraw = false;
        }

        #[cfg(unix)]
        let sigterm_fut = sigterm.recv();
        #[cfg(not(unix))]
        let sigterm_fut = std::future::pending::<Option<()>>();

        #[cfg(unix)]
        let sigint_fut = sigint.recv();
        #[cfg(not(unix))]
        let sigint_fut = std::future::pending::<Option<()>>();

        let deadline = app.search_deadline();
        let debounce = async {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;

            _ = sigterm_fut => {
                tracing::info!("Received SIGTERM, shutting down gracefully");
                break;
            }

            _ = sigint_fut => {
                tracing::info!("Received SIGINT, shutting down gracefully");
                break;
            }

            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    tracing::debug!("End of input");
                    break;
                };
                match parse_command(&line) {
                    Ok(Some(command)) => {
                        match handle_command(app, command, &event_tx, options.search_debounce) {
                            Action::Quit => break,
                            Action::Help => write_text(out, &render_help()).await?,
                            Action::Continue => needs_redraw = true,
                        }
                    }
                    Ok(None) => needs_redraw = true,
                    Err(message) => {
                        app.set_status(message);
                        write_status(out, app).await?;
                    }
                }
                if !needs_redraw {
                    write_text(out, PROMPT).await?;
                }
            }

            Some(event) = event_rx.recv() => {
                needs_redraw |= handle_app_event(app, event);
                if !needs_redraw && app.status.is_some() {
                    write_status(out, app).await?;
                    write_text(out, PROMPT).await?;
                }
            }

            _ = debounce => {
                app.flush_pending_search(&event_tx);
                needs_redraw = true;
            }
        }
    }

    app.shutdown();
    if let Err(e) = app.save_snapshots().await {
        tracing::warn!(error = %e, "Failed to save collection snapshots");
    }
    write_text(out, "\n").await?;
    Ok(())
}

async fn write_screen<W: AsyncWrite + Unpin>(out: &mut W, app: &mut App, width: usize) -> Result<()> {
    let mut screen = String::from("\n");
    screen.push_str(&render(app, width));
    if let Some(status) = app.take_status() {
        screen.push_str(&status);
        screen.push('\n');
    }
    screen.push_str(PROMPT);
    write_text(out, &screen).await
}

async fn write_status<W: AsyncWrite + Unpin>(out: &mut W, app: &mut App) -> Result<()> {
    if let Some(status) = app.take_status() {
        write_text(out, &format!("{status}\n")).await?;
    }
    Ok(())
}

async fn write_text<W: AsyncWrite + Unpin>(out: &mut W, text: &str) -> Result<()> {
    out.write_all(text.as_bytes())
        .await
        .context("Failed to write output")?;
    out.flush().await.context("Failed to flush output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        CatalogError, DetailService, ListKind, ListingService, MediaDetail, MediaSummary,
        MediaType, SearchService,
    };
    use crate::collection::PageResult;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::io::BufReader;

    struct TwoPages;

    #[async_trait]
    impl ListingService for TwoPages {
        async fn fetch_page(
            &self,
            list: ListKind,
            page: u32,
        ) -> Result<PageResult<MediaSummary>, CatalogError> {
            let title = match list {
                ListKind::TopRated => "The Godfather",
                _ => "Oppenheimer",
            };
            Ok(PageResult {
                items: vec![MediaSummary {
                    id: u64::from(page),
                    media_type: MediaType::Movie,
                    title: format!("{title} {page}"),
                    poster_path: None,
                    vote_average: None,
                    release_date: None,
                    overview: None,
                }],
                page_number: page,
                total_pages: 2,
            })
        }
    }

    #[async_trait]
    impl DetailService for TwoPages {
        async fn fetch_detail(
            &self,
            _id: u64,
            _media_type: MediaType,
        ) -> Result<MediaDetail, CatalogError> {
            Err(CatalogError::HttpStatus(404))
        }
    }

    #[async_trait]
    impl SearchService for TwoPages {
        async fn search(&self, _query: &str) -> Result<Vec<MediaSummary>, CatalogError> {
            Ok(Vec::new())
        }
    }

    fn options() -> BrowseOptions {
        BrowseOptions {
            search_debounce: Duration::from_millis(500),
            width: 60,
        }
    }

    #[tokio::test]
    async fn test_help_and_unknown_command() {
        let mut app = App::new(Arc::new(TwoPages), None);
        let (tx, rx) = mpsc::channel(16);
        let mut out = Vec::new();

        run(&mut app, &b"help\nbogus\nquit\n"[..], &mut out, options(), tx, rx)
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Popular movies"));
        assert!(text.contains("Commands:"));
        assert!(text.contains("Unknown command: bogus"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_more_after_first_page() {
        let mut app = App::new(Arc::new(TwoPages), None);
        let (tx, rx) = mpsc::channel(16);
        let (mut client, server) = tokio::io::duplex(1024);
        let mut out = Vec::new();

        let driver = async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            client.write_all(b"more\n").await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
            client.write_all(b"top\n").await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
            client.write_all(b"quit\n").await.unwrap();
        };

        let (result, ()) = tokio::join!(
            run(&mut app, BufReader::new(server), &mut out, options(), tx, rx),
            driver
        );
        result.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Popular movies (page 2/2, 2 items)"));
        assert!(text.contains("Oppenheimer 2"));
        assert!(text.contains("The Godfather 1"));
        assert_eq!(app.popular.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_is_debounced() {
        let mut app = App::new(Arc::new(TwoPages), None);
        let (tx, rx) = mpsc::channel(16);
        let (mut client, server) = tokio::io::duplex(1024);
        let mut out = Vec::new();

        let driver = async move {
            client.write_all(b"search dun\n").await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
            client.write_all(b"search dune\n").await.unwrap();
            tokio::time::sleep(Duration::from_secs(1)).await;
            client.write_all(b"quit\n").await.unwrap();
        };

        let (result, ()) = tokio::join!(
            run(&mut app, BufReader::new(server), &mut out, options(), tx, rx),
            driver
        );
        result.unwrap();

        assert_eq!(app.search_generation, 1);
        assert_eq!(app.search_query.as_deref(), Some("dune"));
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Results for \"dune\" (0)"));
    }
}
