//! Client for another reelnab server's HTTP surface.
//!
//! [`ApiClient`] speaks the routes served by [`crate::server`].
//! [`RemoteAdapter`] wraps it as a [`ProviderAdapter`], so search
//! aggregation, stream resolution and playback run unchanged against a
//! remote server instead of local scraping.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::http_client::check_status;
use crate::provider::types::{
    Catalog, ContentType, EpisodeLink, MetaRecord, PostsPage, PostsResponse, ProviderDescriptor,
    StreamSource,
};
use crate::provider::{ProviderAdapter, ProviderRegistry};
use crate::resolve::ExtractionService;
use crate::retry::RetryPolicy;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractedStream {
    stream_url: String,
}

/// Typed access to a reelnab server.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    client: Client,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Client for the server at `base`, e.g. `http://127.0.0.1:3001`.
    pub fn new(base: &str, config: &Config) -> Result<Self> {
        let mut base = Url::parse(base.trim())
            .map_err(|e| Error::InvalidInput(format!("invalid server URL {base:?}: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .use_rustls_tls()
            .connect_timeout(Duration::from_secs(config.http.connect_timeout_secs.max(1)))
            .timeout(Duration::from_secs(config.http.timeout_secs.max(1)))
            .build()
            .map_err(|e| Error::Config(format!("failed to build API client: {e}")))?;
        Ok(Self {
            base,
            client,
            retry: config.retry.clone(),
        })
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base.join(path.trim_start_matches('/'))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn get_once<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        let response = self.client.get(url.clone()).send().await?;
        let response = check_status(response)?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    #[instrument(skip(self, query), fields(path = %path))]
    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = self.endpoint(path, query)?;
        debug!(%url, "api request");
        self.retry.run(|_| self.get_once(&url)).await
    }

    pub async fn providers(&self) -> Result<Vec<ProviderDescriptor>> {
        self.get("providers", &[]).await
    }

    pub async fn catalog(&self, provider: &str) -> Result<Catalog> {
        self.get(&format!("{}/catalog", encode(provider)), &[]).await
    }

    /// Posts in either wire shape, normalised to a [`PostsPage`].
    pub async fn posts(&self, provider: &str, filter: &str, page: u32) -> Result<PostsPage> {
        let page = page.to_string();
        let response: PostsResponse = self
            .get(
                &format!("{}/posts", encode(provider)),
                &[("filter", filter), ("page", &page)],
            )
            .await?;
        Ok(response.into())
    }

    pub async fn search(&self, provider: &str, query: &str, page: u32) -> Result<PostsPage> {
        let page = page.to_string();
        let response: PostsResponse = self
            .get(
                &format!("{}/search", encode(provider)),
                &[("query", query), ("page", &page)],
            )
            .await?;
        Ok(response.into())
    }

    pub async fn meta(&self, provider: &str, link: &str) -> Result<MetaRecord> {
        self.get(&format!("{}/meta", encode(provider)), &[("link", link)])
            .await
    }

    pub async fn episodes(&self, provider: &str, url: &str) -> Result<Vec<EpisodeLink>> {
        self.get(&format!("{}/episodes", encode(provider)), &[("url", url)])
            .await
    }

    pub async fn stream(
        &self,
        provider: &str,
        link: &str,
        content_type: ContentType,
    ) -> Result<Vec<StreamSource>> {
        let kind = match content_type {
            ContentType::Movie => "movie",
            ContentType::Series => "series",
        };
        self.get(
            &format!("{}/stream", encode(provider)),
            &[("link", link), ("type", kind)],
        )
        .await
    }

    /// Resolve an indirection link server-side. Single attempt: playback
    /// applies its own extraction retry policy around this call.
    pub async fn extract_stream(&self, url: &str, service: Option<&str>) -> Result<String> {
        let mut query = vec![("url", url)];
        if let Some(service) = service {
            query.push(("service", service));
        }
        let endpoint = self.endpoint("proxy/stream", &query)?;
        debug!(url = %endpoint, "api request");
        let extracted: ExtractedStream = self.get_once(&endpoint).await?;
        if extracted.stream_url.trim().is_empty() {
            return Err(Error::Extraction(format!("server returned no stream for {url}")));
        }
        Ok(extracted.stream_url)
    }

    /// A registry of [`RemoteAdapter`]s for every provider the server lists.
    pub async fn registry(&self) -> Result<ProviderRegistry> {
        let adapters = self
            .providers()
            .await?
            .into_iter()
            .map(|descriptor| {
                Arc::new(RemoteAdapter {
                    descriptor,
                    api: self.clone(),
                }) as Arc<dyn ProviderAdapter>
            })
            .collect();
        Ok(ProviderRegistry::new(adapters))
    }
}

fn encode(segment: &str) -> String {
    urlencoding::encode(segment.trim()).into_owned()
}

#[async_trait]
impl ExtractionService for ApiClient {
    async fn extract(&self, link: &str, service: &str) -> Result<String> {
        self.extract_stream(link, Some(service)).await
    }
}

/// A provider served by a remote reelnab server.
#[derive(Debug)]
pub struct RemoteAdapter {
    descriptor: ProviderDescriptor,
    api: ApiClient,
}

impl RemoteAdapter {
    #[must_use]
    pub fn new(descriptor: ProviderDescriptor, api: ApiClient) -> Self {
        Self { descriptor, api }
    }
}

#[async_trait]
impl ProviderAdapter for RemoteAdapter {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn catalog(&self) -> Result<Catalog> {
        self.api.catalog(self.name()).await
    }

    async fn posts(&self, filter: &str, page: u32) -> Result<PostsPage> {
        self.api.posts(self.name(), filter, page).await
    }

    async fn search(&self, query: &str, page: u32) -> Result<PostsPage> {
        self.api.search(self.name(), query, page).await
    }

    async fn meta(&self, link: &str) -> Result<MetaRecord> {
        self.api.meta(self.name(), link).await
    }

    async fn episodes(&self, url: &str) -> Vec<EpisodeLink> {
        self.api.episodes(self.name(), url).await.unwrap_or_else(|e| {
            warn!(provider = %self.name(), error = %e, "remote episodes failed");
            Vec::new()
        })
    }

    async fn stream_links(&self, link: &str, content_type: ContentType) -> Vec<EpisodeLink> {
        match self.api.stream(self.name(), link, content_type).await {
            Ok(sources) => sources
                .into_iter()
                .map(|source| EpisodeLink {
                    title: match source.quality {
                        Some(q) => format!("{} {q}p", source.server),
                        None => source.server,
                    },
                    link: source.link,
                    kind: None,
                })
                .collect(),
            Err(e) => {
                warn!(provider = %self.name(), error = %e, "remote stream discovery failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(&server.uri(), &Config::default())
            .unwrap()
            .with_retry(RetryPolicy::none())
    }

    #[tokio::test]
    async fn bare_array_posts_are_normalised() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movies4u/posts"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"title": "A", "link": "https://m.test/a", "image": ""}
            ])))
            .mount(&server)
            .await;

        let page = client(&server).await.posts("movies4u", "", 2).await.unwrap();
        assert_eq!(page.posts.len(), 1);
        assert!(!page.has_next_page);
    }

    #[tokio::test]
    async fn unexpected_posts_shape_is_empty_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movies4u/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"weird": 1})))
            .mount(&server)
            .await;

        let page = client(&server).await.search("movies4u", "x", 1).await.unwrap();
        assert_eq!(page, PostsPage::default());
    }

    #[tokio::test]
    async fn remote_registry_and_failing_episodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/providers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "zeefliz", "displayName": "Zeefliz", "baseURL": "https://z.test"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/zeefliz/episodes"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let registry = client(&server).await.registry().await.unwrap();
        let adapter = registry.get("Zeefliz").unwrap();
        assert!(adapter.episodes("https://z.test/show").await.is_empty());
    }

    #[tokio::test]
    async fn extraction_goes_through_proxy_stream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/proxy/stream"))
            .and(query_param("service", "hubcloud"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"streamUrl": "https://cdn.test/v.m3u8"})),
            )
            .mount(&server)
            .await;

        let api = ApiClient::new(&format!("{}/api", server.uri()), &Config::default()).unwrap();
        let url = api.extract("https://hubcloud.one/drive/x", "hubcloud").await.unwrap();
        assert_eq!(url, "https://cdn.test/v.m3u8");
    }

    #[tokio::test]
    async fn remote_extraction_is_not_retried_by_the_client() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/proxy/stream"))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&server)
            .await;

        let err = ApiClient::new(&server.uri(), &Config::default())
            .unwrap()
            .extract("https://hubcloud.one/drive/x", "hubcloud")
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }
}
