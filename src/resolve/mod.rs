//! Stream resolution engine.
//!
//! Turns the raw links an adapter discovers into [`StreamSource`]
//! candidates: indirection links are marked for lazy extraction, media
//! links are typed and flagged, anything else is dropped. Discovery order
//! is preserved; selection order is the orchestrator's call.

pub mod extraction;
pub mod hosts;
pub mod media;

use std::collections::BTreeMap;

use tracing::{debug, instrument};
use url::Url;

use crate::config::Config;
use crate::error::Result;
use crate::extract::parse_quality;
use crate::provider::types::{ContentType, EpisodeLink, StreamSource};
use crate::provider::ProviderRegistry;

pub use extraction::{ExtractionService, HttpExtractionService};
pub use hosts::{HeaderRules, IndirectionHosts};
pub use media::{has_limited_browser_support, is_media_url, media_type_of};

#[derive(Debug, Clone)]
pub struct StreamResolver {
    registry: ProviderRegistry,
    hosts: IndirectionHosts,
    header_rules: HeaderRules,
}

impl StreamResolver {
    #[must_use]
    pub fn new(registry: ProviderRegistry, config: &Config) -> Self {
        Self {
            registry,
            hosts: IndirectionHosts::with_config(&config.indirection_hosts),
            header_rules: HeaderRules::from_config(&config.header_rules),
        }
    }

    #[must_use]
    pub fn hosts(&self) -> &IndirectionHosts {
        &self.hosts
    }

    /// Playback candidates for `content_link` on `provider`.
    ///
    /// Only an unknown provider is an error; discovery failures give an
    /// empty list.
    #[instrument(skip(self))]
    pub async fn resolve_candidates(
        &self,
        provider: &str,
        content_link: &str,
        content_type: ContentType,
    ) -> Result<Vec<StreamSource>> {
        let adapter = self.registry.get(provider)?;
        let raw = adapter.stream_links(content_link, content_type).await;
        let candidates = self.classify(&raw);
        debug!(raw = raw.len(), candidates = candidates.len(), "candidates resolved");
        Ok(candidates)
    }

    #[must_use]
    pub fn classify(&self, raw: &[EpisodeLink]) -> Vec<StreamSource> {
        raw.iter().filter_map(|link| self.classify_link(link)).collect()
    }

    /// Classify one raw link, or `None` when it is neither an indirection
    /// page nor a media URL.
    #[must_use]
    pub fn classify_link(&self, raw: &EpisodeLink) -> Option<StreamSource> {
        let link = raw.link.trim();
        let server = server_name(link);
        let quality = parse_quality(&raw.title).or_else(|| parse_quality(link));

        if let Some(service) = self.hosts.service_for(link) {
            return Some(StreamSource::indirect(server, link, service).with_quality(quality));
        }
        let Some(media_type) = media_type_of(link) else {
            debug!(link, "dropping link that is neither media nor indirection");
            return None;
        };
        let mut source = StreamSource::direct(server, link, media_type)
            .with_quality(quality)
            .with_headers(self.header_rules.headers_for(link));
        source.limited_browser_support = has_limited_browser_support(link);
        Some(source)
    }

    /// Headers a resolved (post-extraction) URL needs.
    #[must_use]
    pub fn headers_for(&self, url: &str) -> BTreeMap<String, String> {
        self.header_rules.headers_for(url)
    }
}

fn server_name(link: &str) -> String {
    Url::parse(link)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Route `url` through the header-carrying video proxy mounted at `base`.
#[must_use]
pub fn proxy_video_url(base: &str, url: &str, headers: &BTreeMap<String, String>) -> String {
    let headers = serde_json::to_string(headers).unwrap_or_else(|_| "{}".to_string());
    format!(
        "{}/proxy/video?url={}&headers={}",
        base.trim_end_matches('/'),
        urlencoding::encode(url),
        urlencoding::encode(&headers)
    )
}

/// What the playback surface should request: the URL itself, or the proxy
/// route when the upstream insists on particular headers.
#[must_use]
pub fn playable_url(proxy_base: &str, url: &str, headers: Option<&BTreeMap<String, String>>) -> String {
    match headers.filter(|h| !h.is_empty()) {
        Some(headers) => proxy_video_url(proxy_base, url, headers),
        None => url.to_string(),
    }
}
