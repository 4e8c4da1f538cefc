use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::types::{
    decode_items, detail_from_raw, pick_trailer, ListKind, MediaDetail, MediaSummary, MediaType,
    RawDetail, RawPage, RawVideos, MAX_TMDB_PAGE,
};
use crate::collection::PageResult;
use crate::util::{
    build_http_client, validate_service_url, UrlValidationError, MAX_SEARCH_QUERY_LENGTH,
};

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_LANGUAGE: &str = "fr-FR";

const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024; // 5MB
const MAX_RETRIES: u32 = 3;

// ============================================================================
// Errors
// ============================================================================

/// Errors that can occur while talking to the catalog API.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    /// Non-2xx response that is not retried (or ran out of retries)
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Server kept answering 429 after the retry budget
    #[error("Rate limited after {0} retries")]
    RateLimited(u32),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    /// The response did not have the expected shape
    #[error("Unexpected response format: {0}")]
    Format(String),
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
    #[error("No TMDB API key configured (set TMDB_API_KEY or tmdb_api_key in config.toml)")]
    MissingApiKey,
}

impl CatalogError {
    /// Returns true if this error is transient and the request should be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            CatalogError::Timeout(_) | CatalogError::Network(_) => true,
            CatalogError::HttpStatus(status) => *status >= 500,
            CatalogError::RateLimited(_)
            | CatalogError::ResponseTooLarge(_)
            | CatalogError::Format(_)
            | CatalogError::InsecureBaseUrl
            | CatalogError::InvalidBaseUrl(_)
            | CatalogError::MissingApiKey => false,
        }
    }

    /// True when the server answered but the payload could not be decoded.
    pub fn is_format(&self) -> bool {
        matches!(self, CatalogError::Format(_))
    }
}

// ============================================================================
// Client
// ============================================================================

/// Connection settings for [`TmdbClient`].
///
/// SEC-015: Custom Debug impl masks the API key.
#[derive(Clone)]
pub struct CatalogSettings {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub language: String,
    pub timeout: Duration,
    /// First retry delay; doubles on each further attempt.
    pub retry_base_delay: Duration,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            language: DEFAULT_LANGUAGE.to_string(),
            timeout: Duration::from_secs(20),
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

impl std::fmt::Debug for CatalogSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("language", &self.language)
            .field("timeout", &self.timeout)
            .field("retry_base_delay", &self.retry_base_delay)
            .finish()
    }
}

/// HTTP client for the TMDB v3 API.
#[derive(Clone)]
pub struct TmdbClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
    language: String,
    timeout: Duration,
    retry_base_delay: Duration,
}

impl std::fmt::Debug for TmdbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TmdbClient")
            .field("base_url", &self.base_url.as_str())
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

/// SEC-002: The API key travels in the query string, so the base must be
/// HTTPS. Plain HTTP is accepted only for loopback mock servers.
fn check_base_url(base: &str) -> Result<Url, CatalogError> {
    validate_service_url(base).map_err(|e| match e {
        UrlValidationError::InvalidUrl(e) => CatalogError::InvalidBaseUrl(e),
        UrlValidationError::Insecure | UrlValidationError::UnsupportedScheme(_) => {
            tracing::error!(base_url = %base, "Rejecting non-HTTPS base URL");
            CatalogError::InsecureBaseUrl
        }
    })
}

impl TmdbClient {
    /// Build a client from settings.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::MissingApiKey`] when no key is configured
    /// - [`CatalogError::InsecureBaseUrl`] for a non-HTTPS, non-localhost base
    pub fn new(settings: CatalogSettings) -> Result<Self, CatalogError> {
        let api_key = settings.api_key.ok_or(CatalogError::MissingApiKey)?;
        let base_url = check_base_url(&settings.base_url)?;

        let http = build_http_client()?;

        Ok(Self {
            http,
            base_url,
            api_key,
            language: settings.language,
            timeout: settings.timeout,
            retry_base_delay: settings.retry_base_delay,
        })
    }

    /// Fetch one page of a movie listing.
    ///
    /// `total_pages` is clamped to [`MAX_TMDB_PAGE`] because TMDB rejects
    /// higher page numbers.
    pub async fn fetch_page(
        &self,
        list: ListKind,
        page: u32,
    ) -> Result<PageResult<MediaSummary>, CatalogError> {
        let raw: RawPage = self
            .get_json(&list.endpoint(), &[("page", page.to_string())])
            .await?;

        let page_number = raw
            .page
            .filter(|p| *p >= 1)
            .ok_or_else(|| CatalogError::Format("missing or invalid `page`".to_string()))?;
        let results = raw
            .results
            .ok_or_else(|| CatalogError::Format("missing `results`".to_string()))?;
        let total_pages = match raw.total_pages {
            Some(0) if !results.is_empty() => {
                return Err(CatalogError::Format(
                    "`total_pages` is 0 but results are present".to_string(),
                ))
            }
            Some(n) => n.clamp(1, MAX_TMDB_PAGE),
            None => return Err(CatalogError::Format("missing `total_pages`".to_string())),
        };

        let decoded = decode_items(results, MediaType::Movie);
        if decoded.skipped > 0 {
            tracing::warn!(
                list = list.id(),
                page = page_number,
                skipped = decoded.skipped,
                "Listing entries without id or title skipped"
            );
        }
        tracing::debug!(
            list = list.id(),
            page = page_number,
            total_pages,
            items = decoded.items.len(),
            "Fetched listing page"
        );

        Ok(PageResult {
            items: decoded.items,
            page_number,
            total_pages,
        })
    }

    /// Fetch the full record of one entry together with its trailer.
    ///
    /// The detail and videos requests run concurrently. A failed videos
    /// request only costs the trailer.
    pub async fn fetch_detail(
        &self,
        id: u64,
        media_type: MediaType,
    ) -> Result<MediaDetail, CatalogError> {
        let detail_path = format!("{}/{}", media_type.as_path(), id);
        let videos_path = format!("{detail_path}/videos");

        let (detail, videos) = tokio::join!(
            self.get_json::<RawDetail>(&detail_path, &[]),
            self.get_json::<RawVideos>(&videos_path, &[]),
        );

        let trailer = match videos {
            Ok(videos) => pick_trailer(videos.results),
            Err(e) => {
                tracing::warn!(id, %media_type, error = %e, "Failed to load videos, trailer unavailable");
                None
            }
        };

        detail_from_raw(detail?, media_type, trailer)
            .ok_or_else(|| CatalogError::Format("detail is missing `id` or title".to_string()))
    }

    /// Search movies and TV shows. People are filtered out.
    ///
    /// An empty or whitespace-only query returns no results without a request.
    /// Queries are capped at [`MAX_SEARCH_QUERY_LENGTH`] characters.
    pub async fn search(&self, query: &str) -> Result<Vec<MediaSummary>, CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let query: String = query.chars().take(MAX_SEARCH_QUERY_LENGTH).collect();

        let raw: RawPage = self.get_json("search/multi", &[("query", query)]).await?;
        let results = raw
            .results
            .ok_or_else(|| CatalogError::Format("missing `results`".to_string()))?;

        let decoded = decode_items(results, MediaType::Movie);
        tracing::debug!(
            results = decoded.items.len(),
            skipped = decoded.skipped,
            "Search completed"
        );
        Ok(decoded.items)
    }

    // ========================================================================
    // Transport
    // ========================================================================

    fn endpoint_url(&self, path: &str, params: &[(&str, String)]) -> Result<Url, CatalogError> {
        let mut url = self.base_url.join(path)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("api_key", self.api_key.expose_secret());
            pairs.append_pair("language", &self.language);
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// GET `path` and decode the JSON body, retrying transient failures.
    ///
    /// 429 and 5xx responses, timeouts and connection errors are retried with
    /// exponential backoff (base, 2x base, 4x base). Other non-2xx statuses
    /// fail immediately.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, CatalogError> {
        let url = self.endpoint_url(path, params)?;
        let mut retry_count = 0;

        loop {
            match self.get_bytes(&url).await {
                Ok(bytes) => {
                    return serde_json::from_slice(&bytes)
                        .map_err(|e| CatalogError::Format(e.to_string()));
                }
                Err(CatalogError::HttpStatus(429)) if retry_count >= MAX_RETRIES => {
                    return Err(CatalogError::RateLimited(MAX_RETRIES));
                }
                Err(e) if (e.is_retryable() || matches!(e, CatalogError::HttpStatus(429)))
                    && retry_count < MAX_RETRIES =>
                {
                    let delay = self.retry_base_delay * (1u32 << retry_count);
                    tracing::debug!(
                        path,
                        error = %e,
                        retry = retry_count + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying catalog request after transient error"
                    );
                    tokio::time::sleep(delay).await;
                    retry_count += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_bytes(&self, url: &Url) -> Result<Vec<u8>, CatalogError> {
        let response = tokio::time::timeout(self.timeout, self.http.get(url.clone()).send())
            .await
            .map_err(|_| CatalogError::Timeout(self.timeout.as_secs()))?
            .map_err(CatalogError::Network)?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(path = url.path(), status = status.as_u16(), "Catalog request failed");
            return Err(CatalogError::HttpStatus(status.as_u16()));
        }

        read_limited_bytes(response, MAX_RESPONSE_SIZE).await
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, CatalogError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(CatalogError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(CatalogError::Network)?;
        // SEC-003: saturating_add prevents overflow in the size check
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(CatalogError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
