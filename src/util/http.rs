use reqwest::redirect::Policy;
use std::time::Duration;

/// Shared HTTP client for the catalog and identity services.
///
/// Per-request timeouts are applied by the callers; the builder only sets a
/// generous ceiling so a stuck connection can never hang a task forever.
pub fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(create_redirect_policy())
        .user_agent(concat!("marquee/", env!("CARGO_PKG_VERSION")))
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        .timeout(Duration::from_secs(60))
        .build()
}

/// Create a redirect policy with loop detection and limited hops.
fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        for prev in attempt.previous() {
            if prev.as_str() == url.as_str() {
                return attempt.error("Redirect loop detected");
            }
        }

        // Never follow a redirect that downgrades to plain HTTP
        if url.scheme() != "https" && attempt.previous().iter().any(|p| p.scheme() == "https") {
            return attempt.error("Refusing redirect from HTTPS to HTTP");
        }

        tracing::debug!(
            to = %url.path(),
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );
        attempt.follow()
    })
}
