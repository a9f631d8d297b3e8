//! Provider adapters.
//!
//! # Architecture
//!
//! - [`ProviderAdapter`]: async capability set every site implements
//! - [`SiteAdapter`]: the one scraping implementation, driven by a
//!   declarative [`SiteProfile`]
//! - [`ProviderRegistry`]: name-keyed lookup over the session's adapters
//! - [`bootstrap`]: per-provider session bootstrap strategies
//!
//! Episode and stream-link discovery never fail: network and parse errors
//! are logged and turned into an empty list at the adapter boundary.

pub mod bootstrap;
pub mod registry;
pub mod site;
pub mod sites;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
use types::{Catalog, ContentType, EpisodeLink, MetaRecord, PostsPage, ProviderDescriptor};

pub use registry::ProviderRegistry;
pub use site::{SiteAdapter, SiteProfile};

/// One hosting site (or a remote server standing in for it).
#[async_trait]
pub trait ProviderAdapter: Send + Sync + std::fmt::Debug {
    fn descriptor(&self) -> &ProviderDescriptor;

    /// Routing key, e.g. `"movies4u"`.
    fn name(&self) -> &str {
        &self.descriptor().name
    }

    async fn catalog(&self) -> Result<Catalog>;

    /// One page of posts for a catalog filter.
    async fn posts(&self, filter: &str, page: u32) -> Result<PostsPage>;

    async fn search(&self, query: &str, page: u32) -> Result<PostsPage>;

    async fn meta(&self, link: &str) -> Result<MetaRecord>;

    /// Episode links on an episodes page. Empty on any failure.
    async fn episodes(&self, url: &str) -> Vec<EpisodeLink>;

    /// Raw playable or indirection links reachable from `link`, titled with
    /// whatever text accompanied them. Empty on any failure.
    async fn stream_links(&self, link: &str, content_type: ContentType) -> Vec<EpisodeLink>;
}
