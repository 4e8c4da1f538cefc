//! Configuration file parser for ~/.config/marquee/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are accepted but logged, since they are most likely typos.
//! API keys may also come from the environment, which wins over the file.
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::auth::{FirebaseSettings, DEFAULT_FIRESTORE_BASE_URL, DEFAULT_IDENTITY_BASE_URL};
use crate::catalog::{CatalogSettings, DEFAULT_BASE_URL, DEFAULT_LANGUAGE};

pub const TMDB_API_KEY_ENV: &str = "TMDB_API_KEY";
pub const FIREBASE_API_KEY_ENV: &str = "FIREBASE_API_KEY";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
///
/// SEC-015: Custom Debug impl masks the API keys.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// TMDB v3 API key. `TMDB_API_KEY` takes precedence.
    pub tmdb_api_key: Option<String>,

    pub tmdb_base_url: String,

    /// Language of titles and overviews, as an IETF tag (`fr-FR`, `en-US`).
    pub language: String,

    pub request_timeout_secs: u64,

    /// Delay between the last keystroke of a search and the request.
    pub search_debounce_ms: u64,

    /// Firebase web API key. `FIREBASE_API_KEY` takes precedence.
    pub firebase_api_key: Option<String>,

    /// Firebase project, used for profile documents.
    pub firebase_project_id: Option<String>,

    pub identity_base_url: String,

    pub firestore_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tmdb_api_key: None,
            tmdb_base_url: DEFAULT_BASE_URL.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            request_timeout_secs: 20,
            search_debounce_ms: 500,
            firebase_api_key: None,
            firebase_project_id: None,
            identity_base_url: DEFAULT_IDENTITY_BASE_URL.to_string(),
            firestore_base_url: DEFAULT_FIRESTORE_BASE_URL.to_string(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field(
                "tmdb_api_key",
                &self.tmdb_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("tmdb_base_url", &self.tmdb_base_url)
            .field("language", &self.language)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("search_debounce_ms", &self.search_debounce_ms)
            .field(
                "firebase_api_key",
                &self.firebase_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("firebase_project_id", &self.firebase_project_id)
            .field("identity_base_url", &self.identity_base_url)
            .field("firestore_base_url", &self.firestore_base_url)
            .finish()
    }
}

const KNOWN_KEYS: [&str; 9] = [
    "tmdb_api_key",
    "tmdb_base_url",
    "language",
    "request_timeout_secs",
    "search_debounce_ms",
    "firebase_api_key",
    "firebase_project_id",
    "identity_base_url",
    "firestore_base_url",
];

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // SEC-014: Check file size before reading
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!("Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(
            language = %config.language,
            tmdb_key = config.tmdb_api_key.is_some(),
            firebase_key = config.firebase_api_key.is_some(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Catalog client settings, with `TMDB_API_KEY` taking precedence over
    /// the file.
    pub fn catalog_settings(&self) -> CatalogSettings {
        self.catalog_settings_with_env(|name| std::env::var(name).ok())
    }

    pub(crate) fn catalog_settings_with_env(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> CatalogSettings {
        CatalogSettings {
            base_url: self.tmdb_base_url.clone(),
            api_key: resolve_secret(env(TMDB_API_KEY_ENV), self.tmdb_api_key.as_deref()),
            language: self.language.clone(),
            timeout: self.request_timeout(),
            ..CatalogSettings::default()
        }
    }

    /// Identity provider settings, with `FIREBASE_API_KEY` taking precedence
    /// over the file.
    pub fn firebase_settings(&self) -> FirebaseSettings {
        self.firebase_settings_with_env(|name| std::env::var(name).ok())
    }

    pub(crate) fn firebase_settings_with_env(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> FirebaseSettings {
        FirebaseSettings {
            api_key: resolve_secret(env(FIREBASE_API_KEY_ENV), self.firebase_api_key.as_deref()),
            project_id: self.firebase_project_id.clone(),
            identity_base_url: self.identity_base_url.clone(),
            firestore_base_url: self.firestore_base_url.clone(),
            timeout: self.request_timeout(),
        }
    }

    /// Request timeout, never below one second.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

/// Non-empty environment value first, then the non-empty config value.
fn resolve_secret(env_value: Option<String>, config_value: Option<&str>) -> Option<SecretString> {
    env_value
        .filter(|v| !v.trim().is_empty())
        .or_else(|| {
            config_value
                .filter(|v| !v.trim().is_empty())
                .map(str::to_string)
        })
        .map(|v| SecretString::from(v.trim().to_string()))
}

// ============================================================================
// Tests
// ============================================================================
