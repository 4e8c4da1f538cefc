//! Utility functions for common operations.
//!
//! - **HTTP**: the shared `reqwest` client with a bounded redirect policy
//! - **URL validation**: HTTPS enforcement for remote API base URLs
//! - **Text processing**: Unicode-aware width, truncation, wrapping and
//!   control-character stripping for terminal output
//!
//! # Examples
//!
//! ```
//! use marquee::util::{display_width, truncate_to_width, validate_service_url};
//!
//! let base = validate_service_url("https://api.themoviedb.org/3").unwrap();
//! assert_eq!(base.path(), "/3/");
//!
//! assert_eq!(display_width("Léon"), 4);
//! assert_eq!(truncate_to_width("Eternal Sunshine", 10), "Eternal...");
//! ```

mod http;
mod text;
mod url_validator;

pub use http::build_http_client;
pub use text::{display_width, fit_to_width, strip_control_chars, truncate_to_width, wrap_to_width};
pub use url_validator::{validate_service_url, UrlValidationError};

/// Maximum accepted search query length, in characters.
pub const MAX_SEARCH_QUERY_LENGTH: usize = 256;
