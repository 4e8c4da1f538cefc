//! Application event handling.
//!
//! Completions from background fetches land here. Each handler decides
//! whether the outcome is still current and whether the screen needs to be
//! printed again.

use crate::app::{App, AppEvent, DetailState, View};
use crate::catalog::{ListKind, MediaDetail, MediaSummary, MediaType};
use crate::collection::{ApplyOutcome, PageRequest, PageResult};

use super::render::list_title;

/// Process one event. Returns `true` when the visible view changed.
pub(super) fn handle_app_event(app: &mut App, event: AppEvent) -> bool {
    match event {
        AppEvent::PageLoaded {
            list,
            request,
            result,
        } => handle_page_loaded(app, list, request, result),
        AppEvent::SearchCompleted {
            query,
            generation,
            results,
        } => handle_search_completed(app, query, generation, results),
        AppEvent::DetailLoaded {
            id,
            media_type,
            generation,
            result,
        } => handle_detail_loaded(app, id, media_type, generation, result),
        AppEvent::TaskPanicked { task, error } => {
            tracing::error!(task, error = %error, "Background task panicked");
            app.set_status(format!("Internal error in {task}: {error}"));
            true
        }
    }
}

fn handle_page_loaded(
    app: &mut App,
    list: ListKind,
    request: PageRequest,
    result: Result<PageResult<MediaSummary>, String>,
) -> bool {
    let failed = result.is_err();
    match app.apply_page(list, request, result) {
        ApplyOutcome::Superseded => false,
        ApplyOutcome::Applied => {
            if failed && app.view != View::List(list) {
                app.set_status(format!("{} failed to load", list_title(list)));
                return true;
            }
            app.view == View::List(list)
        }
    }
}

fn handle_search_completed(
    app: &mut App,
    query: String,
    generation: u64,
    results: Result<Vec<MediaSummary>, String>,
) -> bool {
    // Check generation to prevent stale search results
    if generation != app.search_generation {
        tracing::debug!(
            expected = app.search_generation,
            got = generation,
            query = %query,
            "Ignoring stale search result (generation mismatch)"
        );
        return false;
    }
    app.search_handle = None;

    match results {
        Ok(items) => {
            tracing::debug!(query = %query, count = items.len(), "Search completed");
            app.search_results = items;
        }
        Err(e) => {
            tracing::warn!(query = %query, error = %e, "Search failed");
            app.set_status(format!("Search failed: {e}"));
        }
    }
    app.view == View::Search
}

fn handle_detail_loaded(
    app: &mut App,
    id: u64,
    media_type: MediaType,
    generation: u64,
    result: Result<MediaDetail, String>,
) -> bool {
    if generation != app.detail_generation {
        tracing::debug!(id, %media_type, "Ignoring stale detail");
        return false;
    }
    app.detail_handle = None;

    app.detail = match result {
        Ok(detail) => DetailState::Loaded(Box::new(detail)),
        Err(error) => {
            tracing::warn!(id, %media_type, error = %error, "Detail fetch failed");
            DetailState::Failed { id, error }
        }
    };
    app.view == View::Detail
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogError, CatalogService, DetailService, ListingService, SearchService};
    use crate::collection::FetchStatus;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct NoCatalog;

    #[async_trait]
    impl ListingService for NoCatalog {
        async fn fetch_page(
            &self,
            _list: ListKind,
            _page: u32,
        ) -> Result<PageResult<MediaSummary>, CatalogError> {
            Err(CatalogError::HttpStatus(503))
        }
    }

    #[async_trait]
    impl DetailService for NoCatalog {
        async fn fetch_detail(
            &self,
            _id: u64,
            _media_type: MediaType,
        ) -> Result<MediaDetail, CatalogError> {
            Err(CatalogError::HttpStatus(404))
        }
    }

    #[async_trait]
    impl SearchService for NoCatalog {
        async fn search(&self, _query: &str) -> Result<Vec<MediaSummary>, CatalogError> {
            Ok(Vec::new())
        }
    }

    fn app() -> App {
        let catalog: Arc<dyn CatalogService> = Arc::new(NoCatalog);
        App::new(catalog, None)
    }

    fn amelie() -> MediaSummary {
        MediaSummary {
            id: 194,
            media_type: MediaType::Movie,
            title: "Le Fabuleux Destin d'Amélie Poulain".to_string(),
            poster_path: None,
            vote_average: Some(7.9),
            release_date: Some("2001-04-25".to_string()),
            overview: None,
        }
    }

    #[test]
    fn test_stale_search_generation_ignored() {
        let mut app = app();
        app.search_generation = 3;
        app.view = View::Search;

        let changed = handle_app_event(
            &mut app,
            AppEvent::SearchCompleted {
                query: "ame".to_string(),
                generation: 2,
                results: Ok(vec![amelie()]),
            },
        );
        assert!(!changed);
        assert!(app.search_results.is_empty());

        let changed = handle_app_event(
            &mut app,
            AppEvent::SearchCompleted {
                query: "amelie".to_string(),
                generation: 3,
                results: Ok(vec![amelie()]),
            },
        );
        assert!(changed);
        assert_eq!(app.search_results.len(), 1);
    }

    #[test]
    fn test_search_failure_sets_status() {
        let mut app = app();
        app.search_generation = 1;
        handle_app_event(
            &mut app,
            AppEvent::SearchCompleted {
                query: "x".to_string(),
                generation: 1,
                results: Err("HTTP error: 500".to_string()),
            },
        );
        assert_eq!(app.take_status().as_deref(), Some("Search failed: HTTP error: 500"));
    }

    #[test]
    fn test_superseded_page_does_not_redraw() {
        let mut app = app();
        let stale = app.popular.reset();
        let _latest = app.popular.reset();

        let changed = handle_app_event(
            &mut app,
            AppEvent::PageLoaded {
                list: ListKind::Popular,
                request: stale,
                result: Ok(PageResult {
                    items: vec![amelie()],
                    page_number: 1,
                    total_pages: 2,
                }),
            },
        );
        assert!(!changed);
        assert!(app.popular.is_empty());
        assert_eq!(app.popular.status(), FetchStatus::Fetching);
    }

    #[test]
    fn test_failed_page_for_hidden_list_reports_status() {
        let mut app = app();
        let request = app.top_rated.reset();

        let changed = handle_app_event(
            &mut app,
            AppEvent::PageLoaded {
                list: ListKind::TopRated,
                request,
                result: Err("HTTP error: 503".to_string()),
            },
        );
        assert!(changed);
        assert_eq!(app.top_rated.status(), FetchStatus::Error);
        assert_eq!(app.top_rated.last_error(), Some("HTTP error: 503"));
        assert!(app.take_status().unwrap().contains("Top rated"));
    }

    #[test]
    fn test_detail_generation_check() {
        let mut app = app();
        app.detail_generation = 2;
        app.view = View::Detail;

        assert!(!handle_app_event(
            &mut app,
            AppEvent::DetailLoaded {
                id: 1,
                media_type: MediaType::Movie,
                generation: 1,
                result: Err("gone".to_string()),
            },
        ));
        assert!(matches!(app.detail, DetailState::Empty));

        assert!(handle_app_event(
            &mut app,
            AppEvent::DetailLoaded {
                id: 2,
                media_type: MediaType::Tv,
                generation: 2,
                result: Err("HTTP error: 404".to_string()),
            },
        ));
        assert!(matches!(app.detail, DetailState::Failed { id: 2, .. }));
    }
}
