//! `reelnab` - episode and stream link aggregation over scraped hosting sites
//!
//! # Features
//!
//! - **Declarative extraction**: one traversal engine, driven per site by
//!   selector/allow-list/title-cleanup rules
//! - **Fail-open adapters**: a broken site yields an empty list, never a
//!   failed session
//! - **Lazy stream resolution**: indirection pages are only extracted for
//!   the candidate a user picks, with bounded retry
//! - **Playback orchestration**: a cancellable single-session state machine
//!   with format warnings, manifest recovery and external-player hand-off
//! - **HTTP surface**: an axum server exposing everything above, plus a
//!   client to consume it remotely
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use reelnab::{Config, ProviderContext, ProviderRegistry, SearchAggregator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let context = ProviderContext::new(&config)?.shared();
//!     let registry = ProviderRegistry::builtin(&config, Arc::clone(&context))?;
//!     let report = SearchAggregator::from_config(registry, &config)
//!         .collect("breaking bad", 1)
//!         .await;
//!     for (provider, post) in report.posts() {
//!         println!("[{provider}] {}", post.title);
//!     }
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod fingerprint;
pub mod http_client;
pub mod playback;
pub mod provider;
pub mod resolve;
pub mod retry;
pub mod server;

pub use aggregate::{ProviderSearchOutcome, SearchAggregator, SearchReport, SearchStatus};
pub use client::{ApiClient, RemoteAdapter};
pub use config::Config;
pub use context::ProviderContext;
pub use error::{Error, Result};
pub use extract::{extract_episode_links, ExtractionProfile, ExtractionRules};
pub use fingerprint::{chrome_profile, firefox_profile, random_profile, BrowserProfile};
pub use playback::{Handoff, PlaybackOrchestrator, PlaybackState, SelectOutcome};
pub use provider::types::{
    Catalog, ContentType, EpisodeLink, MediaType, MetaRecord, Post, PostsPage, ProviderDescriptor,
    StreamSource,
};
pub use provider::{ProviderAdapter, ProviderRegistry, SiteAdapter, SiteProfile};
pub use resolve::{ExtractionService, HttpExtractionService, StreamResolver};
pub use retry::RetryPolicy;

/// Version of reelnab
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
