//! The HTTP surface, exercised in-process.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reelnab::provider::types::{
    Catalog, CatalogItem, ContentType, EpisodeLink, MetaRecord, Post, PostsPage, ProviderDescriptor,
};
use reelnab::server::{router, AppState};
use reelnab::{Config, Error, ExtractionService, ProviderAdapter, ProviderRegistry, Result};

#[derive(Debug)]
struct FakeSite {
    descriptor: ProviderDescriptor,
}

#[async_trait]
impl ProviderAdapter for FakeSite {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn catalog(&self) -> Result<Catalog> {
        Ok(Catalog {
            catalog: vec![CatalogItem {
                title: "Latest".into(),
                filter: String::new(),
            }],
            genres: Vec::new(),
        })
    }

    async fn posts(&self, filter: &str, page: u32) -> Result<PostsPage> {
        Ok(PostsPage {
            posts: vec![Post {
                title: format!("{filter}#{page}"),
                link: "https://fake.test/p/1".into(),
                image: String::new(),
            }],
            has_next_page: true,
        })
    }

    async fn search(&self, query: &str, page: u32) -> Result<PostsPage> {
        self.posts(query, page).await
    }

    async fn meta(&self, link: &str) -> Result<MetaRecord> {
        Err(Error::NotFound(link.to_string()))
    }

    async fn episodes(&self, _url: &str) -> Vec<EpisodeLink> {
        vec![EpisodeLink {
            title: "Episode 1 480p".into(),
            link: "https://hubcloud.one/drive/e1".into(),
            kind: None,
        }]
    }

    async fn stream_links(&self, _link: &str, content_type: ContentType) -> Vec<EpisodeLink> {
        let mut links = vec![
            EpisodeLink {
                title: "HubCloud 1080p".into(),
                link: "https://hubcloud.one/drive/x".into(),
                kind: None,
            },
            EpisodeLink {
                title: "Direct".into(),
                link: "https://cdn.test/v/film.720p.mkv".into(),
                kind: None,
            },
            EpisodeLink {
                title: "Telegram".into(),
                link: "https://t.me/somechannel".into(),
                kind: None,
            },
        ];
        if content_type == ContentType::Series {
            links.truncate(1);
        }
        links
    }
}

#[derive(Debug)]
struct FixedExtractor;

#[async_trait]
impl ExtractionService for FixedExtractor {
    async fn extract(&self, link: &str, service: &str) -> Result<String> {
        Ok(format!("https://cdn.test/{service}.m3u8?from={}", urlencoding::encode(link)))
    }
}

fn app() -> Router {
    let registry = ProviderRegistry::new(vec![Arc::new(FakeSite {
        descriptor: ProviderDescriptor {
            name: "fake".into(),
            display_name: "Fake Site".into(),
            base_url: "https://fake.test".into(),
            disabled: false,
        },
    })]);
    let state = AppState::new(&Config::default(), registry, Arc::new(FixedExtractor)).unwrap();
    router(state)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn lists_providers_at_root_and_under_api() {
    for uri in ["/providers", "/api/providers"] {
        let (status, body) = get(app(), uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["name"], "fake");
        assert_eq!(body[0]["displayName"], "Fake Site");
        assert_eq!(body[0]["baseURL"], "https://fake.test");
    }
}

#[tokio::test]
async fn posts_use_the_envelope_shape() {
    let (status, body) = get(app(), "/fake/posts?filter=category/web-series/&page=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["posts"][0]["title"], "category/web-series/#2");
    assert_eq!(body["hasNextPage"], true);
}

#[tokio::test]
async fn unknown_provider_is_404() {
    let (status, body) = get(app(), "/nope/catalog").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
    assert!(body["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn missing_search_query_is_400() {
    let (status, _) = get(app(), "/fake/search?query=%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn adapter_errors_map_to_status_codes() {
    let (status, body) = get(app(), "/fake/meta?link=https://fake.test/gone").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn stream_classifies_candidates() {
    let (status, body) = get(app(), "/api/fake/stream?link=https://fake.test/film&type=movie").await;
    assert_eq!(status, StatusCode::OK);
    let sources = body.as_array().unwrap();
    assert_eq!(sources.len(), 2);

    assert_eq!(sources[0]["requiresExtraction"], true);
    assert_eq!(sources[0]["extractionService"], "hubcloud");
    assert_eq!(sources[0]["quality"], 1080);

    assert_eq!(sources[1]["requiresExtraction"], false);
    assert_eq!(sources[1]["type"], "mp4");
    assert_eq!(sources[1]["limitedBrowserSupport"], true);
    assert_eq!(sources[1]["quality"], 720);
}

#[tokio::test]
async fn stream_rejects_unknown_content_type() {
    let (status, _) = get(app(), "/fake/stream?link=https://fake.test/film&type=podcast").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn proxy_stream_extracts_with_known_service() {
    let (status, body) = get(app(), "/proxy/stream?url=https%3A%2F%2Fhubcloud.one%2Fdrive%2Fx").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["streamUrl"]
        .as_str()
        .unwrap()
        .starts_with("https://cdn.test/hubcloud.m3u8"));
}

#[tokio::test]
async fn aggregated_search_reports_each_provider() {
    let (status, body) = get(app(), "/search?query=dark").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcomes"][0]["provider"], "fake");
    assert_eq!(body["outcomes"][0]["status"], "found");
}

#[tokio::test]
async fn video_proxy_forwards_range_and_headers() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v/film.mp4"))
        .and(header("range", "bytes=0-3"))
        .and(header("referer", "https://movies4u.test/"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("content-type", "video/mp4")
                .insert_header("content-range", "bytes 0-3/100")
                .insert_header("accept-ranges", "bytes")
                .set_body_bytes(b"\x00\x00\x00\x18".to_vec()),
        )
        .mount(&upstream)
        .await;

    let target = format!("{}/v/film.mp4", upstream.uri());
    let uri = format!(
        "/proxy/video?url={}&headers={}",
        urlencoding::encode(&target),
        urlencoding::encode(r#"{"Referer":"https://movies4u.test/"}"#)
    );
    let response = app()
        .oneshot(
            Request::builder()
                .uri(uri)
                .header("range", "bytes=0-3")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()["content-range"], "bytes 0-3/100");
    assert_eq!(response.headers()["accept-ranges"], "bytes");
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"\x00\x00\x00\x18");
}

#[tokio::test]
async fn video_proxy_rejects_bad_header_json() {
    let (status, body) = get(app(), "/proxy/video?url=https%3A%2F%2Fcdn.test%2Fa.mp4&headers=%7Bnope").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("headers"));
}
