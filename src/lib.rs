//! Terminal browser for the TMDB movie and TV catalog.
//!
//! The core is [`collection::PaginatedCollectionCache`], which turns a paged
//! listing into one growing, deduplicated list. Around it:
//!
//! - [`catalog`]: TMDB client for listings, details and search
//! - [`auth`]: email/password accounts and the stored session token
//! - [`storage`]: SQLite credentials and persisted collections
//! - [`app`] and [`browse`]: the interactive session
//! - [`config`]: `config.toml` plus environment overrides

pub mod app;
pub mod auth;
pub mod browse;
pub mod catalog;
pub mod collection;
pub mod config;
pub mod storage;
pub mod util;
