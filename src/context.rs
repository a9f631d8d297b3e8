//! Per-session Provider Context.
//!
//! Built once at startup and shared (`Arc`) by every adapter, aggregator
//! task and extraction call. Nothing inside mutates after construction
//! apart from the client's own cookie jar.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use scraper::Html;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fingerprint::{random_profile, BrowserProfile};
use crate::http_client::{check_status, session_client};
use crate::retry::RetryPolicy;

/// HTTP configuration, default headers and markup parsing for adapters.
#[derive(Debug)]
pub struct ProviderContext {
    client: Client,
    common_headers: HeaderMap,
    retry: RetryPolicy,
}

impl ProviderContext {
    /// Context with a random browser profile.
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_profile(config, &random_profile())
    }

    pub fn with_profile(config: &Config, profile: &BrowserProfile) -> Result<Self> {
        let common_headers = profile.to_headers();
        let client = session_client(common_headers.clone(), &config.http)?;
        debug!(user_agent = %profile.user_agent, "provider context ready");
        Ok(Self {
            client,
            common_headers,
            retry: config.retry.clone(),
        })
    }

    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Headers sent with every request (also baked into the client).
    #[must_use]
    pub fn common_headers(&self) -> &HeaderMap {
        &self.common_headers
    }

    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Single GET returning the body text; `extra` overrides the defaults.
    #[instrument(skip(self, extra), fields(url = %url))]
    pub async fn fetch_once(&self, url: &str, extra: &HeaderMap) -> Result<String> {
        let response = self
            .client
            .get(url)
            .headers(extra.clone())
            .send()
            .await?;
        debug!(status = %response.status(), "response received");
        let response = check_status(response)?;
        Ok(response.text().await?)
    }

    /// GET with the session retry policy applied to transient failures.
    pub async fn fetch_html(&self, url: &str, extra: &HeaderMap) -> Result<String> {
        self.retry.run(move |_| self.fetch_once(url, extra)).await
    }

    /// Markup-parsing capability.
    #[must_use]
    pub fn parse(html: &str) -> Html {
        Html::parse_document(html)
    }
}

/// Convert a string map into request headers, rejecting invalid entries.
pub fn header_map<'a, I>(pairs: I) -> Result<HeaderMap>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::InvalidInput(format!("header value for {name}: {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}
