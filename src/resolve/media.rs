//! Media URL classification by path suffix.

use url::Url;

use crate::provider::types::MediaType;

/// Streaming manifest suffixes.
const MANIFEST_EXTENSIONS: &[&str] = &["m3u8", "mpd"];

/// Single-file containers that browsers play natively.
const BROWSER_EXTENSIONS: &[&str] = &["mp4", "m4v", "webm", "mov", "ogv"];

/// Single-file containers most browsers refuse to render in place.
const LIMITED_EXTENSIONS: &[&str] = &["mkv", "avi", "wmv", "flv", "ts", "3gp"];

fn extension(url: &str) -> Option<String> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    let last = path.rsplit('/').next()?;
    let (_, ext) = last.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

/// Delivery format of `url` if its suffix names a media file or manifest.
#[must_use]
pub fn media_type_of(url: &str) -> Option<MediaType> {
    let ext = extension(url)?;
    let ext = ext.as_str();
    if MANIFEST_EXTENSIONS.contains(&ext) {
        Some(MediaType::Manifest)
    } else if BROWSER_EXTENSIONS.contains(&ext) || LIMITED_EXTENSIONS.contains(&ext) {
        Some(MediaType::Progressive)
    } else {
        None
    }
}

#[must_use]
pub fn is_media_url(url: &str) -> bool {
    media_type_of(url).is_some()
}

/// Container known to have poor in-browser support.
#[must_use]
pub fn has_limited_browser_support(url: &str) -> bool {
    extension(url).is_some_and(|ext| LIMITED_EXTENSIONS.contains(&ext.as_str()))
}
