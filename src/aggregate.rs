//! Cross-provider search.
//!
//! Each active provider is queried on its own task with its own deadline;
//! outcomes stream back as they complete. A slow, failing or panicking
//! provider only ever affects its own outcome.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, Stream, StreamExt};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::provider::types::{Post, PostsPage};
use crate::provider::{ProviderAdapter, ProviderRegistry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SearchStatus {
    Found,
    Empty,
    Failed { error: String },
    TimedOut,
}

/// One provider's share of an aggregated search.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSearchOutcome {
    pub provider: String,
    pub display_name: String,
    #[serde(flatten)]
    pub status: SearchStatus,
    pub page: PostsPage,
    pub elapsed_ms: u64,
}

impl ProviderSearchOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, SearchStatus::Found | SearchStatus::Empty)
    }
}

/// All outcomes of one aggregated search, in completion order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchReport {
    pub outcomes: Vec<ProviderSearchOutcome>,
}

impl SearchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &ProviderSearchOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ProviderSearchOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Every post found, tagged with its provider.
    pub fn posts(&self) -> impl Iterator<Item = (&str, &Post)> {
        self.outcomes
            .iter()
            .flat_map(|o| o.page.posts.iter().map(move |p| (o.provider.as_str(), p)))
    }
}

#[derive(Debug, Clone)]
pub struct SearchAggregator {
    registry: ProviderRegistry,
    timeout: Duration,
}

impl SearchAggregator {
    #[must_use]
    pub fn new(registry: ProviderRegistry, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    #[must_use]
    pub fn from_config(registry: ProviderRegistry, config: &Config) -> Self {
        Self::new(registry, config.search.provider_timeout())
    }

    /// Query every active provider concurrently; outcomes arrive in
    /// completion order, one per provider.
    pub fn search_all(
        &self,
        query: &str,
        page: u32,
    ) -> impl Stream<Item = ProviderSearchOutcome> + Send + 'static {
        let mut tasks = FuturesUnordered::new();
        for adapter in self.registry.active() {
            tasks.push(search_one(Arc::clone(adapter), query.to_string(), page, self.timeout));
        }
        debug!(providers = tasks.len(), query, "aggregated search started");
        tasks
    }

    /// Run [`search_all`](Self::search_all) to completion.
    pub async fn collect(&self, query: &str, page: u32) -> SearchReport {
        let outcomes: Vec<_> = self.search_all(query, page).collect().await;
        let report = SearchReport { outcomes };
        info!(
            query,
            succeeded = report.succeeded().count(),
            failed = report.failed().count(),
            "aggregated search finished"
        );
        report
    }
}

/// Aborts the wrapped task when dropped, so searches nobody waits for any
/// more stop holding connections.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn search_one(
    adapter: Arc<dyn ProviderAdapter>,
    query: String,
    page: u32,
    timeout: Duration,
) -> ProviderSearchOutcome {
    let provider = adapter.descriptor().name.clone();
    let display_name = adapter.descriptor().display_name.clone();
    let started = Instant::now();

    // Own task: a panicking adapter surfaces as a join error here.
    let mut task = AbortOnDrop(tokio::spawn(async move {
        tokio::time::timeout(timeout, adapter.search(&query, page)).await
    }));
    let (status, page) = match (&mut task.0).await {
        Ok(Ok(Ok(page))) if page.posts.is_empty() => (SearchStatus::Empty, page),
        Ok(Ok(Ok(page))) => (SearchStatus::Found, page),
        Ok(Ok(Err(e))) => (SearchStatus::Failed { error: e.to_string() }, PostsPage::default()),
        Ok(Err(_elapsed)) => (SearchStatus::TimedOut, PostsPage::default()),
        Err(join) => (
            SearchStatus::Failed {
                error: format!("search task aborted: {join}"),
            },
            PostsPage::default(),
        ),
    };
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    if !matches!(status, SearchStatus::Found | SearchStatus::Empty) {
        warn!(provider = %provider, ?status, elapsed_ms, "provider search failed");
    }
    ProviderSearchOutcome {
        provider,
        display_name,
        status,
        page,
        elapsed_ms,
    }
}
