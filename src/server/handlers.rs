use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::aggregate::SearchReport;
use crate::provider::types::{
    Catalog, ContentType, EpisodeLink, MetaRecord, PostsPage, ProviderDescriptor, StreamSource,
};

#[derive(Debug, Deserialize)]
pub struct PostsQuery {
    #[serde(default)]
    filter: String,
    page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(alias = "q")]
    query: String,
    page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct LinkQuery {
    link: String,
}

#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    url: String,
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    link: String,
    #[serde(rename = "type", default)]
    content_type: String,
}

#[derive(Debug, Deserialize)]
pub struct ExtractQuery {
    url: String,
    service: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedStream {
    stream_url: String,
}

fn required<'a>(value: &'a str, name: &str) -> ApiResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        Err(ApiError::bad_request(format!("missing required parameter: {name}")))
    } else {
        Ok(value)
    }
}

pub async fn providers(State(state): State<AppState>) -> Json<Vec<ProviderDescriptor>> {
    Json(state.registry.descriptors())
}

pub async fn catalog(State(state): State<AppState>, Path(provider): Path<String>) -> ApiResult<Json<Catalog>> {
    let adapter = state.registry.get(&provider)?;
    Ok(Json(adapter.catalog().await?))
}

pub async fn posts(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(q): Query<PostsQuery>,
) -> ApiResult<Json<PostsPage>> {
    let adapter = state.registry.get(&provider)?;
    Ok(Json(adapter.posts(&q.filter, q.page.unwrap_or(1)).await?))
}

pub async fn search(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(q): Query<SearchQuery>,
) -> ApiResult<Json<PostsPage>> {
    let query = required(&q.query, "query")?;
    let adapter = state.registry.get(&provider)?;
    Ok(Json(adapter.search(query, q.page.unwrap_or(1)).await?))
}

pub async fn search_all(State(state): State<AppState>, Query(q): Query<SearchQuery>) -> ApiResult<Json<SearchReport>> {
    let query = required(&q.query, "query")?;
    Ok(Json(state.aggregator.collect(query, q.page.unwrap_or(1)).await))
}

pub async fn meta(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(q): Query<LinkQuery>,
) -> ApiResult<Json<MetaRecord>> {
    let link = required(&q.link, "link")?;
    let adapter = state.registry.get(&provider)?;
    Ok(Json(adapter.meta(link).await?))
}

pub async fn episodes(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(q): Query<UrlQuery>,
) -> ApiResult<Json<Vec<EpisodeLink>>> {
    let url = required(&q.url, "url")?;
    let adapter = state.registry.get(&provider)?;
    Ok(Json(adapter.episodes(url).await))
}

pub async fn stream(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(q): Query<StreamQuery>,
) -> ApiResult<Json<Vec<StreamSource>>> {
    let link = required(&q.link, "link")?;
    let content_type: ContentType = q.content_type.parse()?;
    Ok(Json(state.resolver.resolve_candidates(&provider, link, content_type).await?))
}

pub async fn proxy_stream(State(state): State<AppState>, Query(q): Query<ExtractQuery>) -> ApiResult<Json<ExtractedStream>> {
    let url = required(&q.url, "url")?;
    let service = q
        .service
        .as_deref()
        .or_else(|| state.resolver.hosts().service_for(url))
        .unwrap_or("generic")
        .to_string();
    let stream_url = state.extractor.extract(url, &service).await?;
    Ok(Json(ExtractedStream { stream_url }))
}
