//! Application state for the interactive browser.
//!
//! `App` owns one [`PaginatedCollectionCache`] per movie listing and routes
//! every fetch through a background task that reports back with an
//! [`AppEvent`]. The browse loop is the only writer of `App`, so cache
//! mutations never race; ordering between concurrent fetches is decided by
//! request sequence numbers (lists) or generation counters (search, detail).

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::catalog::{
    CatalogService, DetailService, ListKind, ListingService, MediaDetail,
    MediaSummary, MediaType, SearchService,
};
use crate::collection::{
    ApplyOutcome, CollectionView, PageRequest, PageResult, PaginatedCollectionCache,
};
use crate::storage::Database;
use crate::util::MAX_SEARCH_QUERY_LENGTH;

/// Listings restored from and saved to the local database.
pub const PERSISTED_LISTS: [ListKind; 1] = [ListKind::Popular];

// ============================================================================
// Events
// ============================================================================

/// Completion events sent by background tasks to the browse loop.
#[derive(Debug)]
pub enum AppEvent {
    /// A listing page fetch finished.
    ///
    /// `request` is the ticket issued by the list's cache; the cache decides
    /// whether the outcome is still current.
    PageLoaded {
        list: ListKind,
        request: PageRequest,
        result: Result<PageResult<MediaSummary>, String>,
    },
    /// Search finished. Results with a stale `generation` are ignored.
    SearchCompleted {
        query: String,
        generation: u64,
        results: Result<Vec<MediaSummary>, String>,
    },
    /// Detail fetch finished. Results with a stale `generation` are ignored.
    DetailLoaded {
        id: u64,
        media_type: MediaType,
        generation: u64,
        result: Result<MediaDetail, String>,
    },
    /// A background task panicked.
    ///
    /// Fields:
    /// - `task`: Name of the task that panicked (e.g., "search")
    /// - `error`: The panic message extracted from the panic payload
    TaskPanicked { task: &'static str, error: String },
}

// ============================================================================
// View State
// ============================================================================

/// What the browser is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    List(ListKind),
    Search,
    Detail,
}

/// State of the detail panel.
#[derive(Debug, Clone, Default)]
pub enum DetailState {
    #[default]
    Empty,
    Loading {
        id: u64,
        title: String,
    },
    Loaded(Box<MediaDetail>),
    Failed {
        id: u64,
        error: String,
    },
}

/// Result of asking for the next page of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMore {
    /// A fetch for this page was started.
    Started(u32),
    /// A fetch is already running for this list.
    Busy,
    /// Every page has been loaded.
    Exhausted,
}

/// Why a detail could not be opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenError {
    /// No item at this 1-based position in the current view.
    OutOfRange { index: usize, len: usize },
    /// The current view has no items to open.
    NothingToOpen,
}

impl std::fmt::Display for OpenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpenError::OutOfRange { index, len } => {
                write!(f, "No item #{index} (showing {len} items)")
            }
            OpenError::NothingToOpen => f.write_str("Nothing to open here"),
        }
    }
}

// ============================================================================
// App
// ============================================================================

pub struct App {
    pub catalog: Arc<dyn CatalogService>,
    pub db: Option<Database>,

    pub popular: PaginatedCollectionCache<MediaSummary>,
    pub top_rated: PaginatedCollectionCache<MediaSummary>,

    pub view: View,
    /// Listing shown by `list`/`top`, and the one `more` extends.
    pub active_list: ListKind,

    // Search
    pub search_query: Option<String>,
    pub search_results: Vec<MediaSummary>,
    pub search_generation: u64,
    pub search_handle: Option<JoinHandle<()>>,
    /// Query waiting for the debounce delay to elapse, with its deadline.
    pub pending_search: Option<(String, tokio::time::Instant)>,

    // Detail
    pub detail: DetailState,
    pub detail_generation: u64,
    pub detail_handle: Option<JoinHandle<()>>,

    /// One-line message for the user, replaced by the next one.
    pub status: Option<String>,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("popular", &self.popular)
            .field("top_rated", &self.top_rated)
            .field("view", &self.view)
            .field("search_generation", &self.search_generation)
            .field("detail_generation", &self.detail_generation)
            .finish_non_exhaustive()
    }
}

impl App {
    pub fn new(catalog: Arc<dyn CatalogService>, db: Option<Database>) -> Self {
        Self {
            catalog,
            db,
            popular: PaginatedCollectionCache::new(),
            top_rated: PaginatedCollectionCache::new(),
            view: View::List(ListKind::Popular),
            active_list: ListKind::Popular,
            search_query: None,
            search_results: Vec::new(),
            search_generation: 0,
            search_handle: None,
            pending_search: None,
            detail: DetailState::Empty,
            detail_generation: 0,
            detail_handle: None,
            status: None,
        }
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status = Some(msg.into());
    }

    pub fn take_status(&mut self) -> Option<String> {
        self.status.take()
    }

    /// Cache backing a listing, if the app tracks it.
    pub fn cache(&self, list: ListKind) -> Option<&PaginatedCollectionCache<MediaSummary>> {
        match list {
            ListKind::Popular => Some(&self.popular),
            ListKind::TopRated => Some(&self.top_rated),
            ListKind::NowPlaying | ListKind::Upcoming => None,
        }
    }

    pub fn cache_mut(
        &mut self,
        list: ListKind,
    ) -> Option<&mut PaginatedCollectionCache<MediaSummary>> {
        match list {
            ListKind::Popular => Some(&mut self.popular),
            ListKind::TopRated => Some(&mut self.top_rated),
            ListKind::NowPlaying | ListKind::Upcoming => None,
        }
    }

    pub fn list_view(&self, list: ListKind) -> Option<CollectionView<'_, MediaSummary>> {
        self.cache(list).map(|c| c.snapshot())
    }

    /// Items of the current view, in display order.
    pub fn visible_items(&self) -> &[MediaSummary] {
        match self.view {
            View::List(list) => self.cache(list).map(|c| c.items()).unwrap_or_default(),
            View::Search => &self.search_results,
            View::Detail => &[],
        }
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Restore persisted listings from the database. Failures only log.
    pub async fn restore_snapshots(&mut self) {
        let Some(db) = self.db.clone() else {
            return;
        };
        for list in PERSISTED_LISTS {
            match db.load_snapshot::<MediaSummary>(list.id()).await {
                Ok(Some(snapshot)) => {
                    tracing::info!(
                        list = list.id(),
                        items = snapshot.items.len(),
                        current_page = snapshot.current_page,
                        "Restored collection snapshot"
                    );
                    if let Some(cache) = self.cache_mut(list) {
                        *cache = PaginatedCollectionCache::restore(snapshot);
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(list = list.id(), error = %e, "Failed to load snapshot"),
            }
        }
    }

    /// Persist listings to the database.
    pub async fn save_snapshots(&self) -> anyhow::Result<()> {
        let Some(db) = &self.db else {
            return Ok(());
        };
        for list in PERSISTED_LISTS {
            if let Some(cache) = self.cache(list) {
                if cache.is_empty() {
                    continue;
                }
                db.save_snapshot(list.id(), &cache.to_snapshot()).await?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Listing Fetches
    // ========================================================================

    /// Reset every tracked listing and fetch page 1 of each.
    pub fn refresh_all(&mut self, event_tx: &mpsc::Sender<AppEvent>) {
        for list in [ListKind::Popular, ListKind::TopRated] {
            self.refresh(list, event_tx);
        }
    }

    /// Reset one listing and fetch its first page. Items stay visible until
    /// the new page arrives.
    pub fn refresh(&mut self, list: ListKind, event_tx: &mpsc::Sender<AppEvent>) {
        let Some(cache) = self.cache_mut(list) else {
            return;
        };
        let request = cache.reset();
        self.spawn_page_fetch(list, request, event_tx);
    }

    /// Ask for the next page of `list`.
    pub fn load_more(&mut self, list: ListKind, event_tx: &mpsc::Sender<AppEvent>) -> LoadMore {
        let Some(cache) = self.cache_mut(list) else {
            return LoadMore::Exhausted;
        };
        match cache.load_more() {
            Some(request) => {
                let page = request.page();
                self.spawn_page_fetch(list, request, event_tx);
                LoadMore::Started(page)
            }
            None if cache.in_flight().is_some() => LoadMore::Busy,
            None => LoadMore::Exhausted,
        }
    }

    fn spawn_page_fetch(
        &self,
        list: ListKind,
        request: PageRequest,
        event_tx: &mpsc::Sender<AppEvent>,
    ) {
        let catalog = Arc::clone(&self.catalog);
        let tx = event_tx.clone();

        tracing::debug!(
            list = list.id(),
            page = request.page(),
            seq = request.seq(),
            kind = ?request.kind(),
            "Spawning page fetch"
        );

        tokio::spawn(async move {
            let fetch = async { catalog.fetch_page(list, request.page()).await };
            // A panicked fetch still completes its ticket, or the list
            // would stay Fetching and refuse every later load_more.
            let result = match crate::browse::catch_task_panic(fetch).await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(panic_msg) => {
                    tracing::error!(list = list.id(), error = %panic_msg, "Page fetch panicked");
                    Err(format!("Internal error: {panic_msg}"))
                }
            };
            let event = AppEvent::PageLoaded {
                list,
                request,
                result,
            };
            if let Err(e) = tx.send(event).await {
                tracing::warn!(error = %e, "Failed to send page result (receiver dropped)");
            }
        });
    }

    /// Hand a page outcome back to its cache.
    pub fn apply_page(
        &mut self,
        list: ListKind,
        request: PageRequest,
        result: Result<PageResult<MediaSummary>, String>,
    ) -> ApplyOutcome {
        let Some(cache) = self.cache_mut(list) else {
            return ApplyOutcome::Superseded;
        };
        if let Err(e) = &result {
            tracing::warn!(list = list.id(), page = request.page(), error = %e, "Page fetch failed");
        }
        cache.complete(request, result)
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Queue `query` to run once `delay` passes without another search.
    pub fn queue_search(&mut self, query: String, delay: std::time::Duration) {
        self.pending_search = Some((query, tokio::time::Instant::now() + delay));
    }

    /// Deadline of the queued search, if any.
    pub fn search_deadline(&self) -> Option<tokio::time::Instant> {
        self.pending_search.as_ref().map(|(_, at)| *at)
    }

    /// Run the queued search now.
    pub fn flush_pending_search(&mut self, event_tx: &mpsc::Sender<AppEvent>) {
        if let Some((query, _)) = self.pending_search.take() {
            self.search(query, event_tx);
        }
    }

    /// Start a search, superseding any running one.
    ///
    /// An empty query clears the results without a request.
    pub fn search(&mut self, query: String, event_tx: &mpsc::Sender<AppEvent>) {
        if let Some(handle) = self.search_handle.take() {
            handle.abort();
            tracing::debug!("Aborted previous search task");
        }
        self.search_generation = self.search_generation.wrapping_add(1);
        let generation = self.search_generation;

        let query = query.trim().to_string();
        self.view = View::Search;
        if query.is_empty() {
            self.search_query = None;
            self.search_results.clear();
            return;
        }
        if query.chars().count() > MAX_SEARCH_QUERY_LENGTH {
            self.set_status(format!(
                "Search query too long (max {MAX_SEARCH_QUERY_LENGTH} chars)"
            ));
            return;
        }

        self.search_query = Some(query.clone());
        self.set_status("Searching...");

        let catalog = Arc::clone(&self.catalog);
        let tx = event_tx.clone();

        tracing::debug!(query = %query, generation, "Spawning search task");

        self.search_handle = Some(tokio::spawn(async move {
            let search = async { catalog.search(&query).await };
            let event = match crate::browse::catch_task_panic(search).await {
                Ok(results) => AppEvent::SearchCompleted {
                    query,
                    generation,
                    results: results.map_err(|e| e.to_string()),
                },
                Err(panic_msg) => AppEvent::TaskPanicked {
                    task: "search",
                    error: panic_msg,
                },
            };
            if let Err(e) = tx.send(event).await {
                tracing::warn!(error = %e, "Failed to send search results (receiver dropped)");
            }
        }));
    }

    // ========================================================================
    // Detail
    // ========================================================================

    /// Fetch the detail of the item at 1-based `index` in the current view.
    pub fn open_detail(
        &mut self,
        index: usize,
        event_tx: &mpsc::Sender<AppEvent>,
    ) -> Result<(), OpenError> {
        let items = self.visible_items();
        if items.is_empty() {
            return Err(OpenError::NothingToOpen);
        }
        let item = index
            .checked_sub(1)
            .and_then(|i| items.get(i))
            .ok_or(OpenError::OutOfRange {
                index,
                len: items.len(),
            })?;
        let (id, media_type, title) = (item.id, item.media_type, item.title.clone());

        if let Some(handle) = self.detail_handle.take() {
            handle.abort();
        }
        self.detail_generation = self.detail_generation.wrapping_add(1);
        let generation = self.detail_generation;
        self.detail = DetailState::Loading { id, title };
        self.view = View::Detail;

        let catalog = Arc::clone(&self.catalog);
        let tx = event_tx.clone();

        self.detail_handle = Some(tokio::spawn(async move {
            let fetch = async { catalog.fetch_detail(id, media_type).await };
            let event = match crate::browse::catch_task_panic(fetch).await {
                Ok(result) => AppEvent::DetailLoaded {
                    id,
                    media_type,
                    generation,
                    result: result.map_err(|e| e.to_string()),
                },
                Err(panic_msg) => {
                    tracing::error!(id, error = %panic_msg, "Detail fetch panicked");
                    AppEvent::DetailLoaded {
                        id,
                        media_type,
                        generation,
                        result: Err(format!("Internal error: {panic_msg}")),
                    }
                }
            };
            if let Err(e) = tx.send(event).await {
                tracing::warn!(error = %e, "Failed to send detail (receiver dropped)");
            }
        }));
        Ok(())
    }

    /// Leave the detail or search view and return to the active listing.
    pub fn show_list(&mut self, list: ListKind) {
        self.active_list = list;
        self.view = View::List(list);
    }

    /// Abort background tasks whose results nobody will read.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.search_handle.take() {
            handle.abort();
        }
        if let Some(handle) = self.detail_handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogError;
    use crate::collection::{FetchStatus, PageResult};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// Catalog that serves `pages_total` pages of three movies each.
    struct FakeCatalog {
        pages_total: u32,
        requested: Mutex<Vec<(ListKind, u32)>>,
    }

    impl FakeCatalog {
        fn new(pages_total: u32) -> Self {
            Self {
                pages_total,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    fn movie(id: u64, title: &str) -> MediaSummary {
        MediaSummary {
            id,
            media_type: MediaType::Movie,
            title: title.to_string(),
            poster_path: None,
            vote_average: Some(7.0),
            release_date: Some("1999-03-31".to_string()),
            overview: None,
        }
    }

    #[async_trait]
    impl ListingService for FakeCatalog {
        async fn fetch_page(
            &self,
            list: ListKind,
            page: u32,
        ) -> Result<PageResult<MediaSummary>, CatalogError> {
            self.requested.lock().unwrap().push((list, page));
            let base = u64::from(page) * 10;
            Ok(PageResult {
                items: (0..3).map(|i| movie(base + i, &format!("Film {}", base + i))).collect(),
                page_number: page,
                total_pages: self.pages_total,
            })
        }
    }

    #[async_trait]
    impl DetailService for FakeCatalog {
        async fn fetch_detail(
            &self,
            id: u64,
            media_type: MediaType,
        ) -> Result<MediaDetail, CatalogError> {
            if id == 404 {
                return Err(CatalogError::HttpStatus(404));
            }
            Ok(MediaDetail {
                id,
                media_type,
                title: format!("Film {id}"),
                tagline: None,
                overview: Some("A hacker learns the truth.".to_string()),
                poster_path: None,
                backdrop_path: None,
                vote_average: Some(8.2),
                release_date: Some("1999-03-31".to_string()),
                runtime: Some(136),
                genres: vec!["Action".to_string()],
                homepage: None,
                trailer: None,
            })
        }
    }

    #[async_trait]
    impl SearchService for FakeCatalog {
        async fn search(&self, query: &str) -> Result<Vec<MediaSummary>, CatalogError> {
            Ok(vec![movie(603, query)])
        }
    }

    fn app(pages_total: u32) -> App {
        App::new(Arc::new(FakeCatalog::new(pages_total)), None)
    }

    async fn next_event(rx: &mut mpsc::Receiver<AppEvent>) -> AppEvent {
        tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .expect("event timed out")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn test_refresh_then_load_more() {
        let mut app = app(2);
        let (tx, mut rx) = mpsc::channel(16);

        app.refresh(ListKind::Popular, &tx);
        assert_eq!(app.load_more(ListKind::Popular, &tx), LoadMore::Busy);

        let event = next_event(&mut rx).await;
        let AppEvent::PageLoaded {
            list,
            request,
            result,
        } = event
        else {
            panic!("expected PageLoaded, got {event:?}");
        };
        assert_eq!(app.apply_page(list, request, result), ApplyOutcome::Applied);
        assert_eq!(app.popular.len(), 3);

        assert_eq!(app.load_more(ListKind::Popular, &tx), LoadMore::Started(2));
        let event = next_event(&mut rx).await;
        if let AppEvent::PageLoaded {
            list,
            request,
            result,
        } = event
        {
            app.apply_page(list, request, result);
        }
        assert_eq!(app.popular.len(), 6);
        assert_eq!(app.popular.current_page(), 2);
        assert_eq!(app.load_more(ListKind::Popular, &tx), LoadMore::Exhausted);
    }

    #[tokio::test]
    async fn test_reset_supersedes_running_load_more() {
        let mut app = app(5);
        let (tx, mut rx) = mpsc::channel(16);

        app.refresh(ListKind::Popular, &tx);
        let first = next_event(&mut rx).await;
        if let AppEvent::PageLoaded {
            list,
            request,
            result,
        } = first
        {
            app.apply_page(list, request, result);
        }

        assert_eq!(app.load_more(ListKind::Popular, &tx), LoadMore::Started(2));
        app.refresh(ListKind::Popular, &tx);

        let mut outcomes = Vec::new();
        for _ in 0..2 {
            if let AppEvent::PageLoaded {
                list,
                request,
                result,
            } = next_event(&mut rx).await
            {
                outcomes.push((request.page(), app.apply_page(list, request, result)));
            }
        }
        outcomes.sort_by_key(|(page, _)| *page);
        assert_eq!(
            outcomes,
            vec![(1, ApplyOutcome::Applied), (2, ApplyOutcome::Superseded)]
        );
        assert_eq!(app.popular.current_page(), 1);
        assert_eq!(app.popular.status(), FetchStatus::Idle);
    }

    #[tokio::test]
    async fn test_lists_are_independent() {
        let mut app = app(3);
        let (tx, mut rx) = mpsc::channel(16);

        app.refresh_all(&tx);
        for _ in 0..2 {
            let event = next_event(&mut rx).await;
            if let AppEvent::PageLoaded {
                list,
                request,
                result,
            } = event
            {
                app.apply_page(list, request, result);
            }
        }

        assert_eq!(app.popular.len(), 3);
        assert_eq!(app.top_rated.len(), 3);
        assert_eq!(app.load_more(ListKind::TopRated, &tx), LoadMore::Started(2));
        assert_eq!(app.popular.status(), FetchStatus::Idle);
    }

    #[tokio::test]
    async fn test_search_generation_increments() {
        let mut app = app(1);
        let (tx, mut rx) = mpsc::channel(16);

        app.search("matrix".to_string(), &tx);
        app.search("alien".to_string(), &tx);
        assert_eq!(app.search_generation, 2);
        assert_eq!(app.search_query.as_deref(), Some("alien"));

        let event = next_event(&mut rx).await;
        let AppEvent::SearchCompleted {
            query, generation, ..
        } = event
        else {
            panic!("expected SearchCompleted, got {event:?}");
        };
        // The first task was aborted, so only the latest one reports.
        assert_eq!(query, "alien");
        assert_eq!(generation, 2);
    }

    #[tokio::test]
    async fn test_empty_search_clears_results_without_request() {
        let mut app = app(1);
        let (tx, mut rx) = mpsc::channel(16);
        app.search_results = vec![movie(1, "Old")];

        app.search("   ".to_string(), &tx);

        assert!(app.search_results.is_empty());
        assert!(app.search_handle.is_none());
        assert_eq!(app.view, View::Search);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_too_long_search_is_rejected() {
        let mut app = app(1);
        let (tx, _rx) = mpsc::channel(16);
        app.search("x".repeat(MAX_SEARCH_QUERY_LENGTH + 1), &tx);
        assert!(app.search_handle.is_none());
        assert!(app.take_status().unwrap().contains("too long"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_search_deadline() {
        let mut app = app(1);
        let (tx, mut rx) = mpsc::channel(16);
        let delay = std::time::Duration::from_millis(500);

        app.queue_search("mat".to_string(), delay);
        app.queue_search("matrix".to_string(), delay);
        let deadline = app.search_deadline().unwrap();
        assert_eq!(deadline, tokio::time::Instant::now() + delay);

        tokio::time::sleep_until(deadline).await;
        app.flush_pending_search(&tx);
        assert!(app.search_deadline().is_none());

        let AppEvent::SearchCompleted { query, .. } = next_event(&mut rx).await else {
            panic!("expected SearchCompleted");
        };
        assert_eq!(query, "matrix");
    }

    #[tokio::test]
    async fn test_open_detail_bounds() {
        let mut app = app(1);
        let (tx, mut rx) = mpsc::channel(16);

        assert_eq!(app.open_detail(1, &tx), Err(OpenError::NothingToOpen));

        app.refresh(ListKind::Popular, &tx);
        drain_until_page(&mut app, &mut rx).await;

        assert_eq!(
            app.open_detail(4, &tx),
            Err(OpenError::OutOfRange { index: 4, len: 3 })
        );
        assert_eq!(
            app.open_detail(0, &tx),
            Err(OpenError::OutOfRange { index: 0, len: 3 })
        );

        app.open_detail(2, &tx).unwrap();
        assert_eq!(app.view, View::Detail);
        assert!(matches!(app.detail, DetailState::Loading { id: 11, .. }));

        let AppEvent::DetailLoaded {
            id,
            generation,
            result,
            ..
        } = next_event(&mut rx).await
        else {
            panic!("expected DetailLoaded");
        };
        assert_eq!(id, 11);
        assert_eq!(generation, app.detail_generation);
        assert_eq!(result.unwrap().runtime, Some(136));
    }

    async fn drain_until_page(app: &mut App, rx: &mut mpsc::Receiver<AppEvent>) {
        if let AppEvent::PageLoaded {
            list,
            request,
            result,
        } = next_event(rx).await
        {
            app.apply_page(list, request, result);
        }
    }

    #[tokio::test]
    async fn test_untracked_list_is_exhausted() {
        let mut app = app(1);
        let (tx, _rx) = mpsc::channel(16);
        assert_eq!(app.load_more(ListKind::Upcoming, &tx), LoadMore::Exhausted);
        assert!(app.list_view(ListKind::Upcoming).is_none());
    }

    #[tokio::test]
    async fn test_snapshot_round_trip_through_database() {
        let db = Database::open(":memory:").await.unwrap();
        let (tx, mut rx) = mpsc::channel(16);

        let mut app = App::new(Arc::new(FakeCatalog::new(4)), Some(db.clone()));
        app.refresh(ListKind::Popular, &tx);
        drain_until_page(&mut app, &mut rx).await;
        app.save_snapshots().await.unwrap();

        let mut restored = App::new(Arc::new(FakeCatalog::new(4)), Some(db));
        restored.restore_snapshots().await;
        assert_eq!(restored.popular.items(), app.popular.items());
        assert_eq!(restored.popular.current_page(), 1);
        assert_eq!(restored.popular.total_pages(), 4);
        assert_eq!(restored.popular.status(), FetchStatus::Idle);
    }
}
