//! reqwest client construction.
//!
//! Two flavours:
//! - the session client used for scraping: browser default headers, cookie
//!   store (so warm-up bootstraps stick), compression, bounded redirects
//! - the passthrough client used by the video proxy: no default headers and
//!   no overall timeout, since media bodies stream for as long as playback
//!   lasts

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, Response};

use crate::config::HttpConfig;
use crate::error::{Error, Result};

/// Build the per-session scraping client.
pub fn session_client(default_headers: HeaderMap, http: &HttpConfig) -> Result<Client> {
    Client::builder()
        // Let the server negotiate HTTP/2; many hosts still only speak 1.1
        .http2_adaptive_window(true)
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .tcp_nodelay(true)
        .use_rustls_tls()
        .brotli(true)
        .zstd(true)
        .gzip(true)
        .deflate(true)
        .default_headers(default_headers)
        .connect_timeout(Duration::from_secs(http.connect_timeout_secs.max(1)))
        .timeout(Duration::from_secs(http.timeout_secs.max(1)))
        .redirect(reqwest::redirect::Policy::limited(10))
        .cookie_store(true)
        .build()
        .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))
}

/// Build the client used to pass media bytes through.
///
/// Bodies are relayed exactly as sent; decoding them would break byte
/// ranges and `Content-Length`.
pub fn passthrough_client(http: &HttpConfig) -> Result<Client> {
    Client::builder()
        .use_rustls_tls()
        .no_gzip()
        .no_brotli()
        .no_zstd()
        .no_deflate()
        .tcp_nodelay(true)
        .connect_timeout(Duration::from_secs(http.connect_timeout_secs.max(1)))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| Error::Config(format!("failed to build passthrough client: {e}")))
}

/// Turn a non-success status into the matching [`Error`].
pub fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(Error::from_status(status, response.url().as_str()))
    }
}
