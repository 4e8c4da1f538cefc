use std::collections::HashSet;
use std::fmt::Display;

use super::types::{
    ApplyOutcome, CollectionSnapshot, CollectionView, FetchStatus, Keyed, PageRequest, PageResult,
    PageSource, RequestKind,
};

/// Message recorded when a failure renders as an empty string.
const FALLBACK_ERROR: &str = "Failed to load page";

// ============================================================================
// PaginatedCollectionCache
// ============================================================================

/// Accumulates pages of a remote listing into one ordered, deduplicated
/// collection.
///
/// The cache is a state machine driven by two issuing operations and one
/// completion:
///
/// - [`reset`](Self::reset) always issues a request for page 1 and supersedes
///   whatever was in flight
/// - [`load_more`](Self::load_more) issues a request for the next page, unless
///   a fetch is already running or the last page has been merged
/// - [`complete`](Self::complete) applies a fetch outcome, but only if its
///   ticket is the one currently in flight
///
/// Because `load_more` refuses to issue while `Fetching`, at most one request
/// is ever outstanding from the cache's point of view; a reset simply replaces
/// it. Older tickets that come back late are reported as
/// [`ApplyOutcome::Superseded`] and leave the state untouched.
///
/// Invariants:
/// - no two items share a key (keep-first)
/// - `current_page <= total_pages` and `total_pages >= 1`
/// - `status == Fetching` exactly when a request is in flight
/// - `last_error` is set exactly when `status == Error`
pub struct PaginatedCollectionCache<T: Keyed> {
    items: Vec<T>,
    keys: HashSet<T::Key>,
    current_page: u32,
    total_pages: u32,
    status: FetchStatus,
    last_error: Option<String>,
    /// Ticket of the latest issued request that has not completed yet.
    in_flight: Option<PageRequest>,
    next_seq: u64,
}

impl<T: Keyed> Default for PaginatedCollectionCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Keyed> std::fmt::Debug for PaginatedCollectionCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginatedCollectionCache")
            .field("items", &self.items.len())
            .field("current_page", &self.current_page)
            .field("total_pages", &self.total_pages)
            .field("status", &self.status)
            .field("last_error", &self.last_error)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

impl<T: Keyed> PaginatedCollectionCache<T> {
    /// Create an empty collection: no items, page 0 of 1, idle.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            keys: HashSet::new(),
            current_page: 0,
            total_pages: 1,
            status: FetchStatus::Idle,
            last_error: None,
            in_flight: None,
            next_seq: 0,
        }
    }

    /// Rebuild a collection from a persisted snapshot.
    ///
    /// Duplicate keys in the snapshot are dropped (keep-first) and the page
    /// counters are repaired so the invariants hold.
    pub fn restore(snapshot: CollectionSnapshot<T>) -> Self {
        let mut cache = Self::new();
        cache.extend_unique(snapshot.items);
        cache.total_pages = snapshot.total_pages.max(1).max(snapshot.current_page);
        cache.current_page = snapshot.current_page;
        cache
    }

    /// Capture the persistable part of the collection.
    pub fn to_snapshot(&self) -> CollectionSnapshot<T>
    where
        T: Clone,
    {
        CollectionSnapshot {
            items: self.items.clone(),
            current_page: self.current_page,
            total_pages: self.total_pages,
        }
    }

    // ========================================================================
    // Issuing
    // ========================================================================

    /// Start a refresh from page 1.
    ///
    /// Callable in any state. Any request still in flight becomes stale: its
    /// outcome will be discarded when it arrives. Existing items stay visible
    /// until the new page 1 is merged.
    pub fn reset(&mut self) -> PageRequest {
        if let Some(stale) = self.in_flight {
            tracing::debug!(
                seq = stale.seq,
                kind = ?stale.kind,
                "Reset supersedes in-flight page request"
            );
        }
        self.issue(RequestKind::Reset, 1)
    }

    /// Request the next page.
    ///
    /// Returns `None` without touching any state when a fetch is already
    /// running or when every page has been merged.
    pub fn load_more(&mut self) -> Option<PageRequest> {
        if self.status == FetchStatus::Fetching {
            tracing::trace!(page = self.current_page, "load_more ignored: fetch in progress");
            return None;
        }
        if self.current_page >= self.total_pages {
            tracing::trace!(
                page = self.current_page,
                total = self.total_pages,
                "load_more ignored: last page reached"
            );
            return None;
        }
        Some(self.issue(RequestKind::LoadMore, self.current_page + 1))
    }

    fn issue(&mut self, kind: RequestKind, page: u32) -> PageRequest {
        self.next_seq += 1;
        let request = PageRequest {
            seq: self.next_seq,
            kind,
            page,
        };
        self.in_flight = Some(request);
        self.status = FetchStatus::Fetching;
        tracing::debug!(seq = request.seq, ?kind, page, "Issued page request");
        request
    }

    // ========================================================================
    // Completion
    // ========================================================================

    /// Apply the outcome of a previously issued request.
    ///
    /// The outcome is applied only when `request` is the ticket currently in
    /// flight. A successful page whose number differs from the requested one
    /// is treated as a malformed response.
    pub fn complete<E: Display>(
        &mut self,
        request: PageRequest,
        outcome: Result<PageResult<T>, E>,
    ) -> ApplyOutcome {
        if self.in_flight != Some(request) {
            tracing::debug!(
                seq = request.seq,
                kind = ?request.kind,
                latest = ?self.in_flight.map(|r| r.seq),
                "Ignoring superseded page result"
            );
            return ApplyOutcome::Superseded;
        }
        self.in_flight = None;

        let outcome = match outcome {
            Ok(page) if page.page_number != request.page => Err(format!(
                "Unexpected page in response: requested {}, received {}",
                request.page, page.page_number
            )),
            Ok(page) => Ok(page),
            Err(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(page) => self.merge(request.kind, page),
            Err(message) => self.fail(request, message),
        }
        ApplyOutcome::Applied
    }

    fn merge(&mut self, kind: RequestKind, page: PageResult<T>) {
        let received = page.items.len();
        if kind == RequestKind::Reset {
            self.items.clear();
            self.keys.clear();
        }
        let added = self.extend_unique(page.items);

        self.current_page = page.page_number;
        self.total_pages = page.total_pages.max(1).max(page.page_number);
        self.status = FetchStatus::Idle;
        self.last_error = None;

        tracing::debug!(
            ?kind,
            page = self.current_page,
            total = self.total_pages,
            received,
            added,
            len = self.items.len(),
            "Merged page"
        );
    }

    fn fail(&mut self, request: PageRequest, message: String) {
        tracing::warn!(
            seq = request.seq,
            kind = ?request.kind,
            page = request.page,
            error = %message,
            "Page fetch failed"
        );
        self.status = FetchStatus::Error;
        self.last_error = Some(if message.trim().is_empty() {
            FALLBACK_ERROR.to_string()
        } else {
            message
        });
    }

    /// Append items whose key is not present yet. Returns how many were added.
    fn extend_unique(&mut self, items: Vec<T>) -> usize {
        let before = self.items.len();
        for item in items {
            if self.keys.insert(item.key()) {
                self.items.push(item);
            }
        }
        self.items.len() - before
    }

    // ========================================================================
    // Driving a Source Directly
    // ========================================================================

    /// Reset and fetch page 1 from `source` in one step.
    pub async fn refresh_from<S>(&mut self, source: &S) -> ApplyOutcome
    where
        S: PageSource<T> + ?Sized,
    {
        let request = self.reset();
        let outcome = source.fetch(request.page()).await;
        self.complete(request, outcome)
    }

    /// Fetch the next page from `source`, if [`load_more`](Self::load_more)
    /// allows one.
    pub async fn load_more_from<S>(&mut self, source: &S) -> Option<ApplyOutcome>
    where
        S: PageSource<T> + ?Sized,
    {
        let request = self.load_more()?;
        let outcome = source.fetch(request.page()).await;
        Some(self.complete(request, outcome))
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Read-only view of the whole state at call time.
    pub fn snapshot(&self) -> CollectionView<'_, T> {
        CollectionView {
            items: &self.items,
            current_page: self.current_page,
            total_pages: self.total_pages,
            status: self.status,
            last_error: self.last_error.as_deref(),
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn status(&self) -> FetchStatus {
        self.status
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The ticket currently awaiting completion, if any.
    pub fn in_flight(&self) -> Option<PageRequest> {
        self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: u32,
        label: String,
    }

    impl Keyed for Row {
        type Key = u32;

        fn key(&self) -> u32 {
            self.id
        }
    }

    fn row(id: u32) -> Row {
        Row {
            id,
            label: format!("row-{id}"),
        }
    }

    fn page(ids: impl IntoIterator<Item = u32>, page_number: u32, total_pages: u32) -> PageResult<Row> {
        PageResult {
            items: ids.into_iter().map(row).collect(),
            page_number,
            total_pages,
        }
    }

    fn ok(p: PageResult<Row>) -> Result<PageResult<Row>, String> {
        Ok(p)
    }

    fn ids(cache: &PaginatedCollectionCache<Row>) -> Vec<u32> {
        cache.items().iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_new_cache_is_empty_and_idle() {
        let cache: PaginatedCollectionCache<Row> = PaginatedCollectionCache::new();
        let view = cache.snapshot();
        assert!(view.items.is_empty());
        assert_eq!(view.current_page, 0);
        assert_eq!(view.total_pages, 1);
        assert_eq!(view.status, FetchStatus::Idle);
        assert_eq!(view.last_error, None);
        assert!(view.has_more());
    }

    #[test]
    fn test_reset_sets_fetching_and_requests_page_one() {
        let mut cache: PaginatedCollectionCache<Row> = PaginatedCollectionCache::new();
        let request = cache.reset();
        assert_eq!(request.page(), 1);
        assert_eq!(request.kind(), RequestKind::Reset);
        assert_eq!(cache.status(), FetchStatus::Fetching);
    }

    #[test]
    fn test_reset_success_replaces_items() {
        let mut cache = PaginatedCollectionCache::new();
        let r = cache.reset();
        cache.complete(r, ok(page(1..=5, 1, 3)));
        let l = cache.load_more().unwrap();
        cache.complete(l, ok(page(6..=10, 2, 3)));
        assert_eq!(cache.len(), 10);

        let r = cache.reset();
        let outcome = cache.complete(r, ok(page([20, 21, 20, 22], 1, 4)));
        assert_eq!(outcome, ApplyOutcome::Applied);
        assert_eq!(ids(&cache), vec![20, 21, 22]);
        assert_eq!(cache.current_page(), 1);
        assert_eq!(cache.total_pages(), 4);
        assert_eq!(cache.status(), FetchStatus::Idle);
    }

    #[test]
    fn test_reset_failure_keeps_stale_items() {
        let mut cache = PaginatedCollectionCache::new();
        let r = cache.reset();
        cache.complete(r, ok(page(1..=3, 1, 2)));

        let r = cache.reset();
        cache.complete(r, Err::<PageResult<Row>, _>("connection refused"));

        let view = cache.snapshot();
        assert_eq!(view.items.len(), 3);
        assert_eq!(view.status, FetchStatus::Error);
        assert_eq!(view.last_error, Some("connection refused"));
        assert_eq!(view.current_page, 1);
    }

    #[test]
    fn test_load_more_appends_and_skips_duplicates() {
        let mut cache = PaginatedCollectionCache::new();
        let r = cache.reset();
        cache.complete(r, ok(page(1..=10, 1, 3)));

        let l = cache.load_more().unwrap();
        assert_eq!(l.page(), 2);
        // 9 and 10 repeat from page 1
        cache.complete(l, ok(page(9..=18, 2, 3)));

        assert_eq!(cache.len(), 18);
        assert_eq!(ids(&cache), (1..=18).collect::<Vec<_>>());
        assert_eq!(cache.current_page(), 2);
        assert_eq!(cache.status(), FetchStatus::Idle);
    }

    #[test]
    fn test_duplicate_keeps_first_occurrence() {
        let mut cache = PaginatedCollectionCache::new();
        let r = cache.reset();
        cache.complete(r, ok(page([1, 2], 1, 2)));

        let mut second = page([2, 3], 2, 2);
        second.items[0].label = "replacement".to_string();
        let l = cache.load_more().unwrap();
        cache.complete(l, ok(second));

        assert_eq!(cache.items()[1].label, "row-2");
    }

    #[test]
    fn test_scenario_page_two_with_overlap_then_exhausted() {
        let mut cache = PaginatedCollectionCache::new();
        let r = cache.reset();
        cache.complete(r, ok(page(1..=10, 1, 3)));

        let l = cache.load_more().unwrap();
        cache.complete(l, ok(page([1, 2, 11, 12, 13, 14, 15, 16, 17, 18], 2, 3)));
        assert_eq!(cache.len(), 18);
        assert_eq!(cache.current_page(), 2);

        let l = cache.load_more().unwrap();
        cache.complete(l, ok(page(19..=28, 3, 3)));
        assert_eq!(cache.current_page(), 3);

        assert!(cache.load_more().is_none());
        assert_eq!(cache.status(), FetchStatus::Idle);
        assert_eq!(cache.len(), 28);
    }

    #[test]
    fn test_load_more_while_fetching_is_noop() {
        let mut cache: PaginatedCollectionCache<Row> = PaginatedCollectionCache::new();
        let first = cache.load_more().unwrap();
        let in_flight = cache.in_flight();

        assert!(cache.load_more().is_none());
        assert_eq!(cache.in_flight(), in_flight);
        assert_eq!(cache.status(), FetchStatus::Fetching);

        // The original request is still the one that applies
        assert_eq!(cache.complete(first, ok(page([1], 1, 2))), ApplyOutcome::Applied);
    }

    #[test]
    fn test_load_more_failure_leaves_pages_untouched_and_retries_same_page() {
        let mut cache = PaginatedCollectionCache::new();
        let r = cache.reset();
        cache.complete(r, ok(page(1..=4, 1, 5)));

        let l = cache.load_more().unwrap();
        assert_eq!(l.page(), 2);
        cache.complete(l, Err::<PageResult<Row>, _>("HTTP error: status 503"));

        let view = cache.snapshot();
        assert_eq!(view.items.len(), 4);
        assert_eq!(view.current_page, 1);
        assert_eq!(view.total_pages, 5);
        assert_eq!(view.status, FetchStatus::Error);
        assert!(view.last_error.is_some_and(|e| !e.is_empty()));

        let retry = cache.load_more().unwrap();
        assert_eq!(retry.page(), 2);
        cache.complete(retry, ok(page(5..=8, 2, 5)));
        assert_eq!(cache.status(), FetchStatus::Idle);
        assert_eq!(cache.last_error(), None);
    }

    #[test]
    fn test_empty_error_message_is_replaced() {
        let mut cache: PaginatedCollectionCache<Row> = PaginatedCollectionCache::new();
        let r = cache.reset();
        cache.complete(r, Err::<PageResult<Row>, _>(""));
        assert_eq!(cache.last_error(), Some(FALLBACK_ERROR));
    }

    #[test]
    fn test_out_of_order_resets_apply_only_latest() {
        let mut cache = PaginatedCollectionCache::new();
        let older = cache.reset();
        let newer = cache.reset();
        assert!(newer.seq() > older.seq());

        assert_eq!(
            cache.complete(newer, ok(page([7, 8], 1, 2))),
            ApplyOutcome::Applied
        );
        assert_eq!(
            cache.complete(older, ok(page([1, 2, 3], 1, 9))),
            ApplyOutcome::Superseded
        );

        assert_eq!(ids(&cache), vec![7, 8]);
        assert_eq!(cache.total_pages(), 2);
        assert_eq!(cache.status(), FetchStatus::Idle);
    }

    #[test]
    fn test_stale_reset_arriving_first_does_not_apply() {
        let mut cache = PaginatedCollectionCache::new();
        let older = cache.reset();
        let newer = cache.reset();

        assert_eq!(
            cache.complete(older, ok(page([1], 1, 1))),
            ApplyOutcome::Superseded
        );
        assert!(cache.is_empty());
        assert_eq!(cache.status(), FetchStatus::Fetching);

        cache.complete(newer, ok(page([2], 1, 1)));
        assert_eq!(ids(&cache), vec![2]);
    }

    #[test]
    fn test_stale_failure_is_not_reported() {
        let mut cache = PaginatedCollectionCache::new();
        let older = cache.reset();
        let newer = cache.reset();
        cache.complete(newer, ok(page([1], 1, 1)));

        let outcome = cache.complete(older, Err::<PageResult<Row>, _>("timeout"));
        assert_eq!(outcome, ApplyOutcome::Superseded);
        assert_eq!(cache.status(), FetchStatus::Idle);
        assert_eq!(cache.last_error(), None);
    }

    #[test]
    fn test_reset_supersedes_in_flight_load_more() {
        let mut cache = PaginatedCollectionCache::new();
        let r = cache.reset();
        cache.complete(r, ok(page(1..=3, 1, 3)));

        let l = cache.load_more().unwrap();
        let r = cache.reset();

        assert_eq!(
            cache.complete(l, ok(page(4..=6, 2, 3))),
            ApplyOutcome::Superseded
        );
        assert_eq!(cache.current_page(), 1);
        assert_eq!(cache.len(), 3);

        cache.complete(r, ok(page(10..=12, 1, 3)));
        assert_eq!(ids(&cache), vec![10, 11, 12]);
    }

    #[test]
    fn test_completed_ticket_cannot_apply_twice() {
        let mut cache = PaginatedCollectionCache::new();
        let r = cache.reset();
        assert_eq!(cache.complete(r, ok(page([1], 1, 2))), ApplyOutcome::Applied);
        assert_eq!(
            cache.complete(r, ok(page([5], 1, 2))),
            ApplyOutcome::Superseded
        );
        assert_eq!(ids(&cache), vec![1]);
    }

    #[test]
    fn test_page_number_mismatch_is_format_failure() {
        let mut cache = PaginatedCollectionCache::new();
        let r = cache.reset();
        cache.complete(r, ok(page([1], 1, 4)));

        let l = cache.load_more().unwrap();
        cache.complete(l, ok(page([2], 3, 4)));

        assert_eq!(cache.status(), FetchStatus::Error);
        assert_eq!(cache.current_page(), 1);
        assert!(cache.last_error().unwrap().contains("requested 2"));
    }

    #[test]
    fn test_total_pages_never_below_current_page() {
        let mut cache = PaginatedCollectionCache::new();
        let r = cache.reset();
        cache.complete(r, ok(page([1], 1, 0)));
        assert_eq!(cache.total_pages(), 1);
        assert!(cache.load_more().is_none());
    }

    #[test]
    fn test_error_state_allows_reset_and_load_more() {
        let mut cache: PaginatedCollectionCache<Row> = PaginatedCollectionCache::new();
        let r = cache.reset();
        cache.complete(r, Err::<PageResult<Row>, _>("offline"));
        assert_eq!(cache.status(), FetchStatus::Error);

        let l = cache.load_more().unwrap();
        assert_eq!(l.page(), 1);
        assert_eq!(cache.status(), FetchStatus::Fetching);
    }

    #[test]
    fn test_snapshot_restore_repairs_invariants() {
        let snapshot = CollectionSnapshot {
            items: vec![row(1), row(2), row(1)],
            current_page: 4,
            total_pages: 2,
        };
        let cache = PaginatedCollectionCache::restore(snapshot);
        assert_eq!(ids(&cache), vec![1, 2]);
        assert_eq!(cache.current_page(), 4);
        assert_eq!(cache.total_pages(), 4);
        assert_eq!(cache.status(), FetchStatus::Idle);

        let round = cache.to_snapshot();
        assert_eq!(round.items.len(), 2);
    }

    struct FakeSource {
        total: u32,
    }

    #[async_trait::async_trait]
    impl PageSource<Row> for FakeSource {
        type Error = String;

        async fn fetch(&self, page: u32) -> Result<PageResult<Row>, String> {
            if page > self.total {
                return Err(format!("no page {page}"));
            }
            Ok(page_of(page, self.total))
        }
    }

    fn page_of(n: u32, total: u32) -> PageResult<Row> {
        page((n - 1) * 2 + 1..=(n - 1) * 2 + 2, n, total)
    }

    #[tokio::test]
    async fn test_drive_source_until_exhausted() {
        let source = FakeSource { total: 3 };
        let mut cache = PaginatedCollectionCache::new();

        assert_eq!(cache.refresh_from(&source).await, ApplyOutcome::Applied);
        while let Some(outcome) = cache.load_more_from(&source).await {
            assert_eq!(outcome, ApplyOutcome::Applied);
        }

        assert_eq!(ids(&cache), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(cache.current_page(), 3);
        assert!(cache.load_more_from(&source).await.is_none());
    }

    proptest! {
        #[test]
        fn prop_items_are_keep_first_union_of_pages(
            pages in prop::collection::vec(prop::collection::vec(0u32..40, 0..12), 1..8)
        ) {
            let total = pages.len() as u32;
            let mut cache = PaginatedCollectionCache::new();

            for (i, ids_in_page) in pages.iter().enumerate() {
                let request = if i == 0 {
                    cache.reset()
                } else {
                    cache.load_more().expect("pages remain")
                };
                let outcome = cache.complete(request, ok(page(ids_in_page.clone(), i as u32 + 1, total)));
                prop_assert_eq!(outcome, ApplyOutcome::Applied);
            }

            let mut seen = HashSet::new();
            let expected: Vec<u32> = pages
                .iter()
                .flatten()
                .copied()
                .filter(|id| seen.insert(*id))
                .collect();

            prop_assert_eq!(ids(&cache), expected);
            prop_assert_eq!(cache.current_page(), total);
            prop_assert!(cache.load_more().is_none());
        }
    }
}
