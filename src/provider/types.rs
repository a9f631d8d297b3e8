//! Data model shared by adapters, the resolution engine and the HTTP surface.
//!
//! All records are rebuilt per request; nothing here is persisted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Static description of a hosting site, fixed for the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDescriptor {
    /// Routing key, e.g. `movies4u`.
    #[serde(alias = "value")]
    pub name: String,
    #[serde(alias = "display_name")]
    pub display_name: String,
    #[serde(rename = "baseURL", alias = "baseUrl")]
    pub base_url: String,
    #[serde(default)]
    pub disabled: bool,
}

/// What an episode link leads to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Series,
    Movie,
    Stream,
}

/// One downloadable/streamable link scraped for an episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeLink {
    pub title: String,
    /// Absolute http(s) URL on an allow-listed host.
    pub link: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<LinkKind>,
}

/// Delivery format of a resolved stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    /// A single media file (mp4, mkv, ...).
    #[serde(rename = "mp4", alias = "progressive")]
    Progressive,
    /// An adaptive streaming manifest (HLS/DASH).
    #[serde(rename = "m3u8", alias = "manifest")]
    Manifest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtitle {
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub uri: String,
}

/// A playback candidate.
///
/// Construct through [`StreamSource::direct`] or [`StreamSource::indirect`];
/// the latter guarantees an extraction service id whenever extraction is
/// required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSource {
    pub server: String,
    pub link: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u32>,
    #[serde(default)]
    pub requires_extraction: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtitles: Vec<Subtitle>,
    /// Container rarely plays in a browser (mkv, avi, ...).
    #[serde(default)]
    pub limited_browser_support: bool,
}

impl StreamSource {
    /// A directly playable media URL.
    pub fn direct(server: impl Into<String>, link: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            server: server.into(),
            link: link.into(),
            media_type,
            quality: None,
            requires_extraction: false,
            extraction_service: None,
            headers: None,
            subtitles: Vec::new(),
            limited_browser_support: false,
        }
    }

    /// An indirection page that `service` must resolve before playback.
    pub fn indirect(server: impl Into<String>, link: impl Into<String>, service: impl Into<String>) -> Self {
        let service = service.into();
        let service = if service.trim().is_empty() {
            "generic".to_string()
        } else {
            service
        };
        Self {
            requires_extraction: true,
            extraction_service: Some(service),
            ..Self::direct(server, link, MediaType::Progressive)
        }
    }

    #[must_use]
    pub fn with_quality(mut self, quality: Option<u32>) -> Self {
        self.quality = quality;
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = (!headers.is_empty()).then_some(headers);
        self
    }

    /// `requires_extraction` implies a non-empty extraction service.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        !self.requires_extraction
            || self
                .extraction_service
                .as_deref()
                .is_some_and(|s| !s.trim().is_empty())
    }

    /// Headers the upstream insists on, if any.
    #[must_use]
    pub fn required_headers(&self) -> Option<&BTreeMap<String, String>> {
        self.headers.as_ref().filter(|h| !h.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Movie,
    Series,
}

impl std::str::FromStr for ContentType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" | "" => Ok(ContentType::Movie),
            "series" | "tv" | "show" => Ok(ContentType::Series),
            other => Err(crate::Error::InvalidInput(format!("unknown content type: {other}"))),
        }
    }
}

/// One season (or quality group) of a title.
///
/// Exactly one of `episodes_link` or a non-empty `direct_links` is set;
/// deserialization rejects anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawSeason")]
pub struct Season {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episodes_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_links: Option<Vec<EpisodeLink>>,
}

impl Season {
    pub fn with_episodes_link(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            quality: None,
            episodes_link: Some(link.into()),
            direct_links: None,
        }
    }

    /// Returns `None` when `links` is empty.
    pub fn with_direct_links(title: impl Into<String>, links: Vec<EpisodeLink>) -> Option<Self> {
        (!links.is_empty()).then(|| Self {
            title: title.into(),
            quality: None,
            episodes_link: None,
            direct_links: Some(links),
        })
    }

    #[must_use]
    pub fn with_quality(mut self, quality: Option<String>) -> Self {
        self.quality = quality;
        self
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSeason {
    title: String,
    #[serde(default)]
    quality: Option<String>,
    #[serde(default)]
    episodes_link: Option<String>,
    #[serde(default)]
    direct_links: Option<Vec<EpisodeLink>>,
}

impl TryFrom<RawSeason> for Season {
    type Error = String;

    fn try_from(raw: RawSeason) -> Result<Self, Self::Error> {
        let link = raw.episodes_link.filter(|l| !l.trim().is_empty());
        let direct = raw.direct_links.filter(|d| !d.is_empty());
        match (link, direct) {
            (Some(link), None) => {
                Ok(Season::with_episodes_link(raw.title, link).with_quality(raw.quality))
            }
            (None, Some(links)) => Ok(Season {
                title: raw.title,
                quality: raw.quality,
                episodes_link: None,
                direct_links: Some(links),
            }),
            (None, None) => Err(format!("season '{}' has no links", raw.title)),
            (Some(_), Some(_)) => Err(format!(
                "season '{}' has both an episodes link and direct links",
                raw.title
            )),
        }
    }
}

/// Title details page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaRecord {
    pub title: String,
    #[serde(default)]
    pub synopsis: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub poster: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(rename = "type", default)]
    pub content_type: ContentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub cast: Vec<String>,
    #[serde(default)]
    pub director: Vec<String>,
    #[serde(default)]
    pub writers: Vec<String>,
    #[serde(default, alias = "linkList")]
    pub seasons: Vec<Season>,
}

/// Listing/search result entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub image: String,
}

/// Normalized page of posts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostsPage {
    pub posts: Vec<Post>,
    #[serde(default)]
    pub has_next_page: bool,
}

/// Either wire shape a posts endpoint may answer with.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PostsResponse {
    Bare(Vec<Post>),
    Envelope(PostsPage),
    Other(serde_json::Value),
}

impl From<PostsResponse> for PostsPage {
    fn from(resp: PostsResponse) -> Self {
        match resp {
            PostsResponse::Bare(posts) => PostsPage {
                posts,
                has_next_page: false,
            },
            PostsResponse::Envelope(page) => page,
            PostsResponse::Other(_) => PostsPage::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub title: String,
    pub filter: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub catalog: Vec<CatalogItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<CatalogItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indirect_source_always_names_a_service() {
        let source = StreamSource::indirect("HubCloud", "https://hubcloud.one/drive/x", "  ");
        assert!(source.requires_extraction);
        assert_eq!(source.extraction_service.as_deref(), Some("generic"));
        assert!(source.is_consistent());
    }

    #[test]
    fn stream_source_wire_shape() {
        let source = StreamSource::direct("CDN", "https://cdn.test/a.m3u8", MediaType::Manifest)
            .with_quality(Some(720));
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["type"], "m3u8");
        assert_eq!(json["quality"], 720);
        assert_eq!(json["requiresExtraction"], false);
        assert!(json.get("extractionService").is_none());
    }

    #[test]
    fn season_requires_exactly_one_link_source() {
        let ok: Season =
            serde_json::from_str(r#"{"title":"S1","episodesLink":"https://a.test/s1"}"#).unwrap();
        assert_eq!(ok.episodes_link.as_deref(), Some("https://a.test/s1"));

        let empty = serde_json::from_str::<Season>(r#"{"title":"S1","directLinks":[]}"#);
        assert!(empty.is_err());

        let both = serde_json::from_str::<Season>(
            r#"{"title":"S1","episodesLink":"https://a.test","directLinks":[{"title":"E1","link":"https://b.test"}]}"#,
        );
        assert!(both.is_err());
        assert!(Season::with_direct_links("S1", vec![]).is_none());
    }

    #[test]
    fn posts_response_accepts_both_shapes() {
        let bare: PostsResponse =
            serde_json::from_str(r#"[{"title":"A","link":"https://a.test"}]"#).unwrap();
        let page = PostsPage::from(bare);
        assert_eq!(page.posts.len(), 1);
        assert!(!page.has_next_page);

        let envelope: PostsResponse =
            serde_json::from_str(r#"{"posts":[],"hasNextPage":true}"#).unwrap();
        assert!(PostsPage::from(envelope).has_next_page);

        let junk: PostsResponse = serde_json::from_str(r#""nope""#).unwrap();
        assert_eq!(PostsPage::from(junk), PostsPage::default());
    }

    #[test]
    fn descriptor_accepts_legacy_field_names() {
        let d: ProviderDescriptor = serde_json::from_str(
            r#"{"value":"joya9tv","display_name":"Joya9tv","baseUrl":"https://joya9tv.test"}"#,
        )
        .unwrap();
        assert_eq!(d.name, "joya9tv");
        assert!(!d.disabled);
    }

    #[test]
    fn content_type_parses_loosely() {
        assert_eq!("Series".parse::<ContentType>().unwrap(), ContentType::Series);
        assert_eq!("".parse::<ContentType>().unwrap(), ContentType::Movie);
        assert!("podcast".parse::<ContentType>().is_err());
    }
}
