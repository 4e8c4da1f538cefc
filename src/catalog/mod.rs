//! TMDB catalog access.
//!
//! - [`TmdbClient`]: HTTPS client with retry, timeout and body size limits
//! - Service traits ([`ListingService`], [`DetailService`], [`SearchService`])
//!   so the browse loop and tests can swap in other implementations
//! - [`Listing`]: adapts one listing to a collection [`PageSource`]
//!
//! [`PageSource`]: crate::collection::PageSource

mod client;
pub mod links;
mod service;
mod types;

pub use client::{CatalogError, CatalogSettings, TmdbClient, DEFAULT_BASE_URL, DEFAULT_LANGUAGE};
pub use service::{CatalogService, DetailService, Listing, ListingService, SearchService};
pub use types::{ListKind, MediaDetail, MediaSummary, MediaType, Video, MAX_TMDB_PAGE};
