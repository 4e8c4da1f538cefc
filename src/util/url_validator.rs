use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors that can occur while validating a service base URL.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only https allowed)")]
    UnsupportedScheme(String),
    /// Plain HTTP towards a non-loopback host.
    #[error("Insecure URL: HTTPS required (except localhost for testing)")]
    Insecure,
}

/// Validates the base URL of a remote API.
///
/// API keys and passwords travel in every request, so the base must use
/// HTTPS. Plain HTTP is accepted only for loopback hosts (`localhost`,
/// `127.0.0.1`, `::1`), which is what local mock servers listen on.
///
/// The returned URL always ends with a `/`, so relative paths can be joined
/// onto it without dropping the last path segment.
///
/// # Examples
///
/// ```
/// use marquee::util::validate_service_url;
///
/// let url = validate_service_url("https://api.themoviedb.org/3").unwrap();
/// assert_eq!(url.as_str(), "https://api.themoviedb.org/3/");
///
/// // Local mock servers may use plain HTTP
/// assert!(validate_service_url("http://127.0.0.1:8080").is_ok());
///
/// // Anything else must be HTTPS
/// assert!(validate_service_url("http://api.example.com").is_err());
/// assert!(validate_service_url("file:///etc/passwd").is_err());
/// ```
pub fn validate_service_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let normalized = format!("{}/", url_str.trim().trim_end_matches('/'));
    let url = Url::parse(&normalized)?;

    match url.scheme() {
        "https" => {}
        "http" if is_loopback_host(&url) => {
            tracing::warn!(url = %url, "Using non-HTTPS base URL (localhost only)");
        }
        "http" => return Err(UrlValidationError::Insecure),
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    Ok(url)
}

fn is_loopback_host(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    if host == "localhost" {
        return true;
    }

    // Strip brackets from IPv6 addresses for parsing
    let host_for_parse = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    host_for_parse
        .parse::<IpAddr>()
        .map(|ip| ip.is_loopback())
        .unwrap_or(false)
}
