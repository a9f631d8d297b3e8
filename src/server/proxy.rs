//! Header-carrying passthrough for referrer-locked media.

use std::collections::BTreeMap;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header::{
    ACCEPT_RANGES, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG, LAST_MODIFIED,
    RANGE, REFERER, USER_AGENT,
};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::Response;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::context::header_map;
use crate::error::Error;

/// Upstream response headers passed back to the player.
const FORWARDED: [axum::http::HeaderName; 7] = [
    CONTENT_TYPE,
    CONTENT_LENGTH,
    CONTENT_RANGE,
    ACCEPT_RANGES,
    CACHE_CONTROL,
    ETAG,
    LAST_MODIFIED,
];

#[derive(Debug, Deserialize)]
pub struct VideoQuery {
    url: String,
    /// JSON object of request headers.
    headers: Option<String>,
}

/// Upstream request headers: the decoded JSON set, a browser User-Agent
/// and the upstream origin as Referer unless given, and the player's Range.
fn upstream_headers(
    target: &Url,
    encoded: Option<&str>,
    incoming: &HeaderMap,
    user_agent: &str,
) -> ApiResult<HeaderMap> {
    let requested: BTreeMap<String, String> = match encoded.map(str::trim).filter(|h| !h.is_empty()) {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| ApiError::bad_request(format!("invalid headers JSON: {e}")))?,
        None => BTreeMap::new(),
    };
    let mut headers = header_map(&requested)?;
    if !headers.contains_key(USER_AGENT) {
        if let Ok(ua) = HeaderValue::from_str(user_agent) {
            headers.insert(USER_AGENT, ua);
        }
    }
    if !headers.contains_key(REFERER) {
        let origin = format!("{}/", target.origin().ascii_serialization());
        if let Ok(referer) = HeaderValue::from_str(&origin) {
            headers.insert(REFERER, referer);
        }
    }
    if let Some(range) = incoming.get(RANGE) {
        headers.insert(RANGE, range.clone());
    }
    Ok(headers)
}

pub async fn proxy_video(
    State(state): State<AppState>,
    Query(q): Query<VideoQuery>,
    incoming: HeaderMap,
) -> ApiResult<Response> {
    let target = Url::parse(q.url.trim()).map_err(|e| ApiError::bad_request(format!("invalid url: {e}")))?;
    if !matches!(target.scheme(), "http" | "https") {
        return Err(ApiError::bad_request("only http(s) URLs can be proxied"));
    }
    let headers = upstream_headers(&target, q.headers.as_deref(), &incoming, &state.user_agent)?;

    let upstream = state
        .passthrough
        .get(target.clone())
        .headers(headers)
        .send()
        .await
        .map_err(Error::from)?;
    debug!(url = %target, status = %upstream.status(), "proxying media");

    let mut response = Response::builder().status(upstream.status());
    for name in FORWARDED {
        if let Some(value) = upstream.headers().get(&name) {
            response = response.header(name, value.clone());
        }
    }
    response
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|e| ApiError::internal(format!("failed to build response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_range_are_added() {
        let target = Url::parse("https://cdn.test/v/a.mp4").unwrap();
        let mut incoming = HeaderMap::new();
        incoming.insert(RANGE, HeaderValue::from_static("bytes=0-"));
        let headers = upstream_headers(&target, None, &incoming, "TestAgent/1.0").unwrap();
        assert_eq!(headers[USER_AGENT], "TestAgent/1.0");
        assert_eq!(headers[REFERER], "https://cdn.test/");
        assert_eq!(headers[RANGE], "bytes=0-");
    }

    #[test]
    fn supplied_headers_win() {
        let target = Url::parse("https://cdn.test/v/a.mp4").unwrap();
        let headers = upstream_headers(
            &target,
            Some(r#"{"Referer":"https://site.test/"}"#),
            &HeaderMap::new(),
            "TestAgent/1.0",
        )
        .unwrap();
        assert_eq!(headers[REFERER], "https://site.test/");
    }

    #[test]
    fn bad_header_json_is_rejected() {
        let target = Url::parse("https://cdn.test/v/a.mp4").unwrap();
        let err = upstream_headers(&target, Some("{not json"), &HeaderMap::new(), "ua").unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
    }
}
