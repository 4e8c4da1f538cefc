//! Incremental paginated collections.
//!
//! This module turns a remote, page-at-a-time listing into a single growing
//! sequence of items that a view can render directly:
//!
//! - **Merging**: pages are appended in arrival order, deduplicated by key
//!   (the first occurrence wins)
//! - **Progress**: current page, total pages and fetch status are tracked so
//!   infinite-scroll triggers can be guarded
//! - **Supersession**: every request carries a sequence number, and only the
//!   latest outstanding request of its kind may mutate state
//!
//! # Example
//!
//! ```ignore
//! use marquee::collection::PaginatedCollectionCache;
//!
//! let mut cache = PaginatedCollectionCache::new();
//! let request = cache.reset();
//! let outcome = cache.complete(request, source.fetch(request.page()).await);
//! ```

mod cache;
mod types;

pub use cache::PaginatedCollectionCache;
pub use types::{
    ApplyOutcome, CollectionSnapshot, CollectionView, FetchStatus, Keyed, PageRequest,
    PageResult, PageSource, RequestKind,
};
