use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use crate::collection::Keyed;
use crate::util::strip_control_chars;

/// TMDB refuses page numbers above this value, whatever `total_pages` says.
pub const MAX_TMDB_PAGE: u32 = 500;

// ============================================================================
// Media Type and Lists
// ============================================================================

/// Kind of catalog entry. TMDB ids are only unique within one media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    /// Path segment used by the TMDB API and website.
    pub fn as_path(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_path())
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(MediaType::Movie),
            "tv" => Ok(MediaType::Tv),
            other => Err(format!("Unknown media type: {other}")),
        }
    }
}

/// Movie listings the catalog can page through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    Popular,
    TopRated,
    NowPlaying,
    Upcoming,
}

impl ListKind {
    /// Stable identifier, also used as the snapshot key in storage.
    pub fn id(&self) -> &'static str {
        match self {
            ListKind::Popular => "popular",
            ListKind::TopRated => "top_rated",
            ListKind::NowPlaying => "now_playing",
            ListKind::Upcoming => "upcoming",
        }
    }

    pub(crate) fn endpoint(&self) -> String {
        format!("movie/{}", self.id())
    }
}

// ============================================================================
// Catalog Records
// ============================================================================

/// A catalog entry as shown in lists and search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSummary {
    pub id: u64,
    pub media_type: MediaType,
    pub title: String,
    pub poster_path: Option<String>,
    pub vote_average: Option<f64>,
    /// `release_date` for movies, `first_air_date` for TV.
    pub release_date: Option<String>,
    pub overview: Option<String>,
}

impl Keyed for MediaSummary {
    type Key = (MediaType, u64);

    fn key(&self) -> Self::Key {
        (self.media_type, self.id)
    }
}

impl MediaSummary {
    /// Release year, when the date is present.
    pub fn year(&self) -> Option<&str> {
        release_year(self.release_date.as_deref())
    }

    /// Rating with one decimal, e.g. `7.4`, or `-` when unrated.
    pub fn rating_label(&self) -> String {
        rating_label(self.vote_average)
    }
}

/// Full record for the detail view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaDetail {
    pub id: u64,
    pub media_type: MediaType,
    pub title: String,
    pub tagline: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub vote_average: Option<f64>,
    pub release_date: Option<String>,
    /// Runtime in minutes (first episode runtime for TV).
    pub runtime: Option<u32>,
    pub genres: Vec<String>,
    pub homepage: Option<String>,
    pub trailer: Option<Video>,
}

impl MediaDetail {
    pub fn year(&self) -> Option<&str> {
        release_year(self.release_date.as_deref())
    }

    pub fn rating_label(&self) -> String {
        rating_label(self.vote_average)
    }
}

/// A video attached to a catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub key: String,
    pub name: String,
    pub site: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Video {
    pub fn is_youtube_trailer(&self) -> bool {
        self.kind == "Trailer" && self.site == "YouTube"
    }

    /// Watch URL for YouTube-hosted videos.
    pub fn watch_url(&self) -> Option<String> {
        (self.site == "YouTube").then(|| format!("https://www.youtube.com/watch?v={}", self.key))
    }
}

fn release_year(date: Option<&str>) -> Option<&str> {
    date.and_then(|d| d.split('-').next())
        .filter(|y| y.len() == 4)
}

fn rating_label(vote_average: Option<f64>) -> String {
    match vote_average {
        Some(v) => format!("{v:.1}"),
        None => "-".to_string(),
    }
}

// ============================================================================
// Wire Format
// ============================================================================

/// Paged listing envelope (`/movie/popular`, `/search/multi`, ...).
#[derive(Debug, Deserialize)]
pub(crate) struct RawPage {
    pub page: Option<u32>,
    pub results: Option<Vec<RawMedia>>,
    pub total_pages: Option<u32>,
}

/// One entry of a listing. Movies carry `title`/`release_date`, TV shows
/// `name`/`first_air_date`; `media_type` is only present on mixed results.
#[derive(Debug, Deserialize)]
pub(crate) struct RawMedia {
    pub id: Option<u64>,
    pub media_type: Option<String>,
    pub title: Option<String>,
    pub name: Option<String>,
    pub poster_path: Option<String>,
    pub vote_average: Option<f64>,
    pub release_date: Option<String>,
    pub first_air_date: Option<String>,
    pub overview: Option<String>,
}

/// Outcome of decoding a batch of raw entries.
pub(crate) struct DecodedItems {
    pub items: Vec<MediaSummary>,
    /// Entries dropped because they lacked an id or a title, or had an
    /// unsupported media type (people in search results).
    pub skipped: usize,
}

impl RawMedia {
    /// Convert into a summary. `fallback` applies when the entry has no
    /// `media_type` of its own. Returns `None` for unusable entries.
    pub(crate) fn into_summary(self, fallback: MediaType) -> Option<MediaSummary> {
        let media_type = match self.media_type.as_deref() {
            None => fallback,
            Some(s) => s.parse().ok()?,
        };
        let id = self.id?;
        let title = self
            .title
            .or(self.name)
            .map(|t| clean_text(&t))
            .filter(|t| !t.trim().is_empty())?;
        let release_date = match media_type {
            MediaType::Movie => self.release_date.or(self.first_air_date),
            MediaType::Tv => self.first_air_date.or(self.release_date),
        }
        .filter(|d| !d.is_empty());

        Some(MediaSummary {
            id,
            media_type,
            title,
            poster_path: self.poster_path.filter(|p| !p.is_empty()),
            vote_average: self.vote_average,
            release_date,
            overview: self
                .overview
                .map(|o| clean_text(&o))
                .filter(|o| !o.trim().is_empty()),
        })
    }
}

pub(crate) fn decode_items(raw: Vec<RawMedia>, fallback: MediaType) -> DecodedItems {
    let total = raw.len();
    let items: Vec<MediaSummary> = raw
        .into_iter()
        .filter_map(|m| m.into_summary(fallback))
        .collect();
    DecodedItems {
        skipped: total - items.len(),
        items,
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawGenre {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawDetail {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub name: Option<String>,
    pub tagline: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub vote_average: Option<f64>,
    pub release_date: Option<String>,
    pub first_air_date: Option<String>,
    pub runtime: Option<u32>,
    #[serde(default)]
    pub episode_run_time: Vec<u32>,
    #[serde(default)]
    pub genres: Vec<RawGenre>,
    pub homepage: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawVideos {
    #[serde(default)]
    pub results: Vec<Video>,
}

/// Strip terminal control sequences from catalog-provided text.
fn clean_text(s: &str) -> String {
    strip_control_chars(s).into_owned()
}

pub(crate) fn detail_from_raw(
    raw: RawDetail,
    media_type: MediaType,
    trailer: Option<Video>,
) -> Option<MediaDetail> {
    let id = raw.id?;
    let title = raw
        .title
        .or(raw.name)
        .map(|t| clean_text(&t))
        .filter(|t| !t.trim().is_empty())?;
    let release_date = match media_type {
        MediaType::Movie => raw.release_date,
        MediaType::Tv => raw.first_air_date,
    }
    .filter(|d| !d.is_empty());

    Some(MediaDetail {
        id,
        media_type,
        title,
        tagline: raw.tagline.map(|t| clean_text(&t)).filter(|t| !t.is_empty()),
        overview: raw.overview.map(|o| clean_text(&o)).filter(|o| !o.is_empty()),
        poster_path: raw.poster_path.filter(|p| !p.is_empty()),
        backdrop_path: raw.backdrop_path.filter(|p| !p.is_empty()),
        vote_average: raw.vote_average,
        release_date,
        runtime: raw
            .runtime
            .or_else(|| raw.episode_run_time.first().copied())
            .filter(|r| *r > 0),
        genres: raw.genres.into_iter().map(|g| clean_text(&g.name)).collect(),
        homepage: raw.homepage.filter(|h| !h.is_empty()),
        trailer,
    })
}

/// First YouTube trailer among the videos, in listing order.
pub(crate) fn pick_trailer(videos: Vec<Video>) -> Option<Video> {
    videos.into_iter().find(Video::is_youtube_trailer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> RawMedia {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_movie_entry_decodes() {
        let m = raw(r#"{"id": 550, "title": "Fight Club", "poster_path": "/p.jpg",
                        "vote_average": 8.433, "release_date": "1999-10-15", "overview": "..."}"#)
        .into_summary(MediaType::Movie)
        .unwrap();
        assert_eq!(m.id, 550);
        assert_eq!(m.media_type, MediaType::Movie);
        assert_eq!(m.title, "Fight Club");
        assert_eq!(m.year(), Some("1999"));
        assert_eq!(m.rating_label(), "8.4");
    }

    #[test]
    fn test_tv_entry_uses_name_and_first_air_date() {
        let m = raw(r#"{"id": 1399, "media_type": "tv", "name": "Game of Thrones",
                        "first_air_date": "2011-04-17"}"#)
        .into_summary(MediaType::Movie)
        .unwrap();
        assert_eq!(m.media_type, MediaType::Tv);
        assert_eq!(m.title, "Game of Thrones");
        assert_eq!(m.year(), Some("2011"));
        assert_eq!(m.rating_label(), "-");
    }

    #[test]
    fn test_person_and_untitled_entries_skipped() {
        let entries: Vec<RawMedia> = serde_json::from_str(
            r#"[{"id": 1, "media_type": "person", "name": "Someone"},
                {"id": 2, "title": ""},
                {"title": "No id"},
                {"id": 3, "title": "Kept"}]"#,
        )
        .unwrap();
        let decoded = decode_items(entries, MediaType::Movie);
        assert_eq!(decoded.items.len(), 1);
        assert_eq!(decoded.items[0].id, 3);
        assert_eq!(decoded.skipped, 3);
    }

    #[test]
    fn test_control_chars_stripped_from_title() {
        let m = raw(r#"{"id": 9, "title": "\u001b[31mRed\u001b[0m"}"#)
            .into_summary(MediaType::Movie)
            .unwrap();
        assert_eq!(m.title, "Red");
    }

    #[test]
    fn test_key_distinguishes_media_types() {
        let movie = raw(r#"{"id": 7, "title": "A"}"#).into_summary(MediaType::Movie).unwrap();
        let tv = raw(r#"{"id": 7, "name": "A"}"#).into_summary(MediaType::Tv).unwrap();
        assert_ne!(movie.key(), tv.key());
    }

    #[test]
    fn test_pick_trailer_requires_youtube_trailer() {
        let videos: Vec<Video> = serde_json::from_str(
            r#"[{"key": "a", "name": "Teaser", "site": "YouTube", "type": "Teaser"},
                {"key": "b", "name": "Trailer", "site": "Vimeo", "type": "Trailer"},
                {"key": "c", "name": "Official Trailer", "site": "YouTube", "type": "Trailer"}]"#,
        )
        .unwrap();
        let trailer = pick_trailer(videos).unwrap();
        assert_eq!(trailer.key, "c");
        assert_eq!(
            trailer.watch_url().as_deref(),
            Some("https://www.youtube.com/watch?v=c")
        );
    }

    #[test]
    fn test_tv_detail_runtime_from_episodes() {
        let raw: RawDetail = serde_json::from_str(
            r#"{"id": 1, "name": "Show", "episode_run_time": [42, 50],
                "genres": [{"id": 18, "name": "Drame"}], "homepage": ""}"#,
        )
        .unwrap();
        let detail = detail_from_raw(raw, MediaType::Tv, None).unwrap();
        assert_eq!(detail.runtime, Some(42));
        assert_eq!(detail.genres, vec!["Drame".to_string()]);
        assert_eq!(detail.homepage, None);
    }

    #[test]
    fn test_media_type_parse() {
        assert_eq!("tv".parse::<MediaType>(), Ok(MediaType::Tv));
        assert!("person".parse::<MediaType>().is_err());
    }
}
