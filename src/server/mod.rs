//! HTTP surface.
//!
//! Every route is served both at the root and under `/api`:
//!
//! | Route | Result |
//! |---|---|
//! | `GET /providers` | `ProviderDescriptor[]` |
//! | `GET /{provider}/catalog` | `{catalog, genres?}` |
//! | `GET /{provider}/posts?filter&page` | `{posts, hasNextPage}` |
//! | `GET /{provider}/search?query&page` | `{posts, hasNextPage}` |
//! | `GET /{provider}/meta?link` | `MetaRecord` |
//! | `GET /{provider}/episodes?url` | `EpisodeLink[]` |
//! | `GET /{provider}/stream?link&type` | `StreamSource[]` |
//! | `GET /search?query&page` | per-provider outcomes |
//! | `GET /proxy/stream?url` | `{streamUrl}` |
//! | `GET /proxy/video?url&headers` | upstream bytes |

pub mod error;
mod handlers;
mod proxy;

use std::sync::Arc;

use anyhow::Context;
use axum::routing::get;
use axum::Router;
use reqwest::Client;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::aggregate::SearchAggregator;
use crate::config::Config;
use crate::context::ProviderContext;
use crate::error::Result;
use crate::fingerprint::chrome_profile;
use crate::http_client::passthrough_client;
use crate::provider::ProviderRegistry;
use crate::resolve::{ExtractionService, HttpExtractionService, StreamResolver};

pub use error::{ApiError, ApiResult};

/// Shared handler state; cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    registry: ProviderRegistry,
    resolver: Arc<StreamResolver>,
    aggregator: Arc<SearchAggregator>,
    extractor: Arc<dyn ExtractionService>,
    passthrough: Client,
    user_agent: Arc<str>,
}

impl AppState {
    /// Local scraping state from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let context = ProviderContext::new(config)?.shared();
        let registry = ProviderRegistry::builtin(config, Arc::clone(&context))?;
        let resolver = StreamResolver::new(registry.clone(), config);
        let extractor = Arc::new(HttpExtractionService::new(context, resolver.hosts().clone()));
        Self::new(config, registry, extractor)
    }

    /// State over an explicit registry and extraction service.
    pub fn new(
        config: &Config,
        registry: ProviderRegistry,
        extractor: Arc<dyn ExtractionService>,
    ) -> Result<Self> {
        Ok(Self {
            resolver: Arc::new(StreamResolver::new(registry.clone(), config)),
            aggregator: Arc::new(SearchAggregator::from_config(registry.clone(), config)),
            registry,
            extractor,
            passthrough: passthrough_client(&config.http)?,
            user_agent: Arc::from(chrome_profile().user_agent.as_str()),
        })
    }
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/providers", get(handlers::providers))
        .route("/search", get(handlers::search_all))
        .route("/proxy/stream", get(handlers::proxy_stream))
        .route("/proxy/video", get(proxy::proxy_video))
        .route("/{provider}/catalog", get(handlers::catalog))
        .route("/{provider}/posts", get(handlers::posts))
        .route("/{provider}/search", get(handlers::search))
        .route("/{provider}/meta", get(handlers::meta))
        .route("/{provider}/episodes", get(handlers::episodes))
        .route("/{provider}/stream", get(handlers::stream))
}

/// The full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes())
        .nest("/api", routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `config.server.bind` and serve until Ctrl-C.
pub async fn serve(config: &Config, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    info!(addr = %listener.local_addr()?, "reelnab server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            // Resolves on Ctrl-C; an unavailable signal handler means "run forever".
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
            info!("shutting down");
        })
        .await
        .context("server error")
}
