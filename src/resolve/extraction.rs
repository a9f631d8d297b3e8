//! Indirection-page extraction.
//!
//! Hosting sites put one or two gate pages between a scraped link and the
//! media file. [`HttpExtractionService`] fetches the page, looks for a media
//! URL in `<video>`/`<source>` elements, anchors and inline scripts, and
//! otherwise follows the first link to another known indirection host.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::HeaderMap;
use scraper::{Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use super::hosts::IndirectionHosts;
use super::media::is_media_url;
use crate::context::ProviderContext;
use crate::error::{Error, Result};

/// Further pages followed after the first one.
pub const MAX_HOPS: usize = 2;

static SCRIPT_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s"'<>\\]+"#).expect("static script url pattern"));
static REFRESH_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)url\s*=\s*'?([^';]+)").expect("static refresh pattern"));

/// Resolves an indirection link into a directly playable URL.
///
/// One attempt per call; callers own the retry policy.
#[async_trait]
pub trait ExtractionService: Send + Sync + fmt::Debug {
    /// `service` is the id recorded on the candidate (`"hubcloud"`, ...).
    async fn extract(&self, link: &str, service: &str) -> Result<String>;
}

/// Extraction by fetching and scanning the gate pages locally.
#[derive(Debug)]
pub struct HttpExtractionService {
    context: Arc<ProviderContext>,
    hosts: IndirectionHosts,
}

impl HttpExtractionService {
    #[must_use]
    pub fn new(context: Arc<ProviderContext>, hosts: IndirectionHosts) -> Self {
        Self { context, hosts }
    }
}

#[async_trait]
impl ExtractionService for HttpExtractionService {
    #[instrument(skip(self), fields(link = %link))]
    async fn extract(&self, link: &str, service: &str) -> Result<String> {
        let mut current = Url::parse(link.trim())?;
        for hop in 0..=MAX_HOPS {
            let html = self.context.fetch_once(current.as_str(), &HeaderMap::new()).await?;
            let scan = scan_page(&html, &current, &self.hosts);
            if let Some(media) = scan.media {
                debug!(hop, %media, "media URL found");
                return Ok(media);
            }
            match scan.next_hop {
                Some(next) if hop < MAX_HOPS => {
                    debug!(hop, next = %next, "following indirection");
                    current = next;
                }
                _ => break,
            }
        }
        Err(Error::Extraction(format!("{service}: no media URL found behind {link}")))
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct PageScan {
    pub media: Option<String>,
    pub next_hop: Option<Url>,
}

/// One pass over an indirection page. Media wins over a further hop.
pub(crate) fn scan_page(html: &str, page: &Url, hosts: &IndirectionHosts) -> PageScan {
    let document = Html::parse_document(html);
    let mut scan = PageScan::default();
    let join = |href: &str| {
        page.join(href.trim())
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
    };

    if let Ok(sources) = Selector::parse("video[src], video source[src], source[src]") {
        scan.media = document
            .select(&sources)
            .filter_map(|el| el.value().attr("src"))
            .find_map(join)
            .map(String::from);
    }
    if scan.media.is_some() {
        return scan;
    }

    let consider = |url: Url, scan: &mut PageScan| {
        if is_media_url(url.as_str()) {
            scan.media.get_or_insert_with(|| url.to_string());
        } else if scan.next_hop.is_none() && url != *page && hosts.service_for(url.as_str()).is_some() {
            scan.next_hop = Some(url);
        }
    };

    if let Ok(anchors) = Selector::parse("a[href]") {
        for url in document
            .select(&anchors)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(join)
        {
            consider(url, &mut scan);
        }
    }
    if scan.media.is_none() {
        if let Ok(scripts) = Selector::parse("script") {
            for script in document.select(&scripts) {
                let body = script.text().collect::<String>();
                for m in SCRIPT_URL.find_iter(&body) {
                    if let Some(url) = join(m.as_str()) {
                        consider(url, &mut scan);
                    }
                }
            }
        }
    }
    if scan.media.is_none() && scan.next_hop.is_none() {
        if let Ok(refresh) = Selector::parse("meta[http-equiv]") {
            scan.next_hop = document
                .select(&refresh)
                .filter(|m| {
                    m.value()
                        .attr("http-equiv")
                        .is_some_and(|v| v.eq_ignore_ascii_case("refresh"))
                })
                .filter_map(|m| m.value().attr("content"))
                .filter_map(|c| REFRESH_URL.captures(c).map(|cap| cap[1].to_string()))
                .find_map(|href| join(&href));
        }
    }
    scan
}
