use async_trait::async_trait;

use super::client::{CatalogError, TmdbClient};
use super::types::{ListKind, MediaDetail, MediaSummary, MediaType};
use crate::collection::{PageResult, PageSource};

/// Produces pages of a movie listing.
#[async_trait]
pub trait ListingService: Send + Sync {
    async fn fetch_page(
        &self,
        list: ListKind,
        page: u32,
    ) -> Result<PageResult<MediaSummary>, CatalogError>;
}

/// Loads the full record of one catalog entry.
#[async_trait]
pub trait DetailService: Send + Sync {
    async fn fetch_detail(
        &self,
        id: u64,
        media_type: MediaType,
    ) -> Result<MediaDetail, CatalogError>;
}

/// Free-text search over movies and TV shows.
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<MediaSummary>, CatalogError>;
}

/// Everything the browse loop needs from the catalog.
pub trait CatalogService: ListingService + DetailService + SearchService {}

impl<T: ListingService + DetailService + SearchService> CatalogService for T {}

#[async_trait]
impl ListingService for TmdbClient {
    async fn fetch_page(
        &self,
        list: ListKind,
        page: u32,
    ) -> Result<PageResult<MediaSummary>, CatalogError> {
        TmdbClient::fetch_page(self, list, page).await
    }
}

#[async_trait]
impl DetailService for TmdbClient {
    async fn fetch_detail(
        &self,
        id: u64,
        media_type: MediaType,
    ) -> Result<MediaDetail, CatalogError> {
        TmdbClient::fetch_detail(self, id, media_type).await
    }
}

#[async_trait]
impl SearchService for TmdbClient {
    async fn search(&self, query: &str) -> Result<Vec<MediaSummary>, CatalogError> {
        TmdbClient::search(self, query).await
    }
}

/// One listing of a [`ListingService`], viewed as a page source for a
/// collection cache.
pub struct Listing<'a, S: ?Sized> {
    service: &'a S,
    list: ListKind,
}

impl<'a, S: ListingService + ?Sized> Listing<'a, S> {
    pub fn new(service: &'a S, list: ListKind) -> Self {
        Self { service, list }
    }

    pub fn list(&self) -> ListKind {
        self.list
    }
}

#[async_trait]
impl<S: ListingService + ?Sized> PageSource<MediaSummary> for Listing<'_, S> {
    type Error = CatalogError;

    async fn fetch(&self, page: u32) -> Result<PageResult<MediaSummary>, CatalogError> {
        self.service.fetch_page(self.list, page).await
    }
}
