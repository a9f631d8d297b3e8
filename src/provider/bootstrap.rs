//! Session bootstrap strategies.
//!
//! Some hosts sit behind anti-bot checks that only pass with a cookie from
//! a prior visit. A [`SessionBootstrap`] supplies the extra request headers
//! a provider needs, either a cookie copied into the config file or one the
//! cookie store picks up from a warm-up request.

use std::fmt;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::context::ProviderContext;
use crate::error::{Error, Result};

#[async_trait]
pub trait SessionBootstrap: Send + Sync + fmt::Debug {
    /// Headers added to every page request of the provider.
    async fn headers(&self, context: &ProviderContext) -> HeaderMap;
}

/// No bootstrap needed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBootstrap;

#[async_trait]
impl SessionBootstrap for NoBootstrap {
    async fn headers(&self, _context: &ProviderContext) -> HeaderMap {
        HeaderMap::new()
    }
}

/// A fixed `Cookie` header from configuration.
///
/// Expires silently upstream; prefer [`Warmup`] where the landing page
/// hands out the cookie itself.
#[derive(Debug, Clone)]
pub struct StaticCookie(HeaderValue);

impl StaticCookie {
    pub fn new(cookie: &str) -> Result<Self> {
        let value = HeaderValue::from_str(cookie.trim())
            .map_err(|e| Error::Config(format!("invalid session cookie: {e}")))?;
        Ok(Self(value))
    }
}

#[async_trait]
impl SessionBootstrap for StaticCookie {
    async fn headers(&self, _context: &ProviderContext) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, self.0.clone());
        headers
    }
}

/// Visit a landing page once per session so the cookie store holds
/// whatever the host sets there.
pub struct Warmup {
    url: String,
    cookie: Option<StaticCookie>,
    done: OnceCell<()>,
}

impl Warmup {
    pub fn new(url: impl Into<String>, cookie: Option<StaticCookie>) -> Self {
        Self {
            url: url.into(),
            cookie,
            done: OnceCell::new(),
        }
    }
}

impl fmt::Debug for Warmup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Warmup")
            .field("url", &self.url)
            .field("warmed", &self.done.initialized())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SessionBootstrap for Warmup {
    async fn headers(&self, context: &ProviderContext) -> HeaderMap {
        let headers = match &self.cookie {
            Some(cookie) => cookie.headers(context).await,
            None => HeaderMap::new(),
        };
        self.done
            .get_or_init(|| async {
                match context.fetch_once(&self.url, &headers).await {
                    Ok(_) => debug!(url = %self.url, "session warmed up"),
                    // Pages may still work without it; extraction decides.
                    Err(e) => warn!(url = %self.url, error = %e, "session warm-up failed"),
                }
            })
            .await;
        headers
    }
}

/// Pick the strategy a provider's `session` config asks for.
pub fn from_config(session: Option<&SessionConfig>) -> Result<Box<dyn SessionBootstrap>> {
    let Some(session) = session else {
        return Ok(Box::new(NoBootstrap));
    };
    let cookie = session
        .cookie
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .map(StaticCookie::new)
        .transpose()?;
    Ok(match (session.warmup_url.as_deref(), cookie) {
        (Some(url), cookie) if !url.trim().is_empty() => Box::new(Warmup::new(url.trim(), cookie)),
        (_, Some(cookie)) => Box::new(cookie),
        _ => Box::new(NoBootstrap),
    })
}
