use std::fmt::Display;
use std::hash::Hash;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ============================================================================
// Items and Pages
// ============================================================================

/// An item that can be identified within a collection.
///
/// The cache never looks inside an item beyond its key.
pub trait Keyed {
    type Key: Eq + Hash + Clone;

    fn key(&self) -> Self::Key;
}

/// One page of items as returned by a listing collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    /// 1-based page number reported by the source.
    pub page_number: u32,
    /// Total number of pages reported by the source (at least 1).
    pub total_pages: u32,
}

/// Something that can produce numbered pages of `T`.
///
/// Implemented by adapters over the catalog's listing service, and by fakes in
/// tests.
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    type Error: Display + Send;

    async fn fetch(&self, page: u32) -> Result<PageResult<T>, Self::Error>;
}

// ============================================================================
// Requests and Outcomes
// ============================================================================

/// Which operation issued a request.
///
/// Resets and load-mores are tracked independently by the sequence gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Reset,
    LoadMore,
}

/// Ticket for an issued page fetch.
///
/// Returned by [`PaginatedCollectionCache::reset`] and
/// [`PaginatedCollectionCache::load_more`]; the owner fetches `page()` and
/// hands the outcome back together with this ticket.
///
/// [`PaginatedCollectionCache::reset`]: super::PaginatedCollectionCache::reset
/// [`PaginatedCollectionCache::load_more`]: super::PaginatedCollectionCache::load_more
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    pub(super) seq: u64,
    pub(super) kind: RequestKind,
    pub(super) page: u32,
}

impl PageRequest {
    /// Monotonically increasing sequence number, unique per cache.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// The page number to fetch.
    pub fn page(&self) -> u32 {
        self.page
    }
}

/// Result of handing a fetch outcome back to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The outcome (success or failure) was applied to the collection state.
    Applied,
    /// A newer request had been issued; the outcome was discarded untouched.
    Superseded,
}

// ============================================================================
// State Views
// ============================================================================

/// Fetch status of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FetchStatus {
    #[default]
    Idle,
    Fetching,
    Error,
}

impl Display for FetchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FetchStatus::Idle => "idle",
            FetchStatus::Fetching => "fetching",
            FetchStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Read-only view of a collection at a point in time.
#[derive(Debug, Clone, Copy)]
pub struct CollectionView<'a, T> {
    pub items: &'a [T],
    pub current_page: u32,
    pub total_pages: u32,
    pub status: FetchStatus,
    /// Present only when `status` is [`FetchStatus::Error`].
    pub last_error: Option<&'a str>,
}

impl<T> CollectionView<'_, T> {
    /// Whether another page can still be requested.
    pub fn has_more(&self) -> bool {
        self.current_page < self.total_pages
    }
}

/// Persisted shape of a collection.
///
/// Fetch status and errors are transient and not part of the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSnapshot<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub total_pages: u32,
}
