//! Image and web links for catalog entries.

use super::types::MediaType;

const IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";
const WEB_BASE_URL: &str = "https://www.themoviedb.org";

/// Shown when an entry has no artwork.
pub const PLACEHOLDER_IMAGE_URL: &str = "https://via.placeholder.com/300x450?text=No+Image";

/// Full poster URL for a TMDB image path such as `/abc.jpg`.
pub fn poster_url(path: Option<&str>) -> String {
    image_url(path)
}

/// Backdrop artwork uses the same width as posters.
pub fn backdrop_url(path: Option<&str>) -> String {
    image_url(path)
}

fn image_url(path: Option<&str>) -> String {
    match path.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) if p.starts_with('/') => format!("{IMAGE_BASE_URL}{p}"),
        Some(p) => format!("{IMAGE_BASE_URL}/{p}"),
        None => PLACEHOLDER_IMAGE_URL.to_string(),
    }
}

/// Public TMDB page of an entry.
pub fn tmdb_page_url(media_type: MediaType, id: u64) -> String {
    format!("{WEB_BASE_URL}/{}/{id}", media_type.as_path())
}
