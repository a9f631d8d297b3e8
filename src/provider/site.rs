//! Configurable adapter shared by every scraped site.
//!
//! A [`SiteProfile`] is a plain record (listing rules, meta rules, episode
//! extraction rules); [`SiteAdapter`] compiles it once and serves the whole
//! [`ProviderAdapter`] capability set from it.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use super::bootstrap::{NoBootstrap, SessionBootstrap};
use super::types::{
    Catalog, CatalogItem, ContentType, EpisodeLink, MetaRecord, Post, PostsPage,
    ProviderDescriptor, Season,
};
use super::ProviderAdapter;
use crate::context::ProviderContext;
use crate::error::{Error, Result};
use crate::extract::profile::{collapse_whitespace, selector};
use crate::extract::{extract_episode_links, parse_quality, ExtractionProfile, ExtractionRules};
use crate::resolve::media::is_media_url;

static IMDB_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"\btt\d{5,10}\b").expect("static imdb pattern"));
static YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(19[2-9]\d|20\d{2})\b").expect("static year pattern"));
static RATING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d(?:\.\d)?)\s*/\s*10").expect("static rating pattern"));
static SERIES_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(season|episodes?|s\d{1,2})\b").expect("static series pattern")
});

/// Post listing and search result markup.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingRules {
    /// One element per post.
    pub item: String,
    /// Title, evaluated inside the item.
    pub title: String,
    /// Anchor whose href is the post link.
    pub link: String,
    pub image: String,
    /// Present when another page follows.
    pub next_page: String,
    /// `{filter}` and `{page}` are substituted.
    pub posts_path: String,
    /// `{query}` and `{page}` are substituted.
    pub search_path: String,
}

/// Title page markup.
#[derive(Debug, Clone, Deserialize)]
pub struct MetaRules {
    pub title: String,
    pub synopsis: String,
    pub image: String,
    pub genres: String,
    /// Season/quality groups; the site's own host is always allowed so
    /// per-season episode pages are recognised.
    pub seasons: ExtractionRules,
}

/// Everything the shared adapter needs to know about one site.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteProfile {
    pub name: String,
    pub display_name: String,
    pub base_url: String,
    #[serde(default)]
    pub catalog: Vec<CatalogItem>,
    #[serde(default)]
    pub genres: Vec<CatalogItem>,
    pub listing: ListingRules,
    pub meta: MetaRules,
    pub episodes: ExtractionRules,
}

#[derive(Debug)]
struct CompiledListing {
    item: Selector,
    title: Selector,
    link: Selector,
    image: Selector,
    next_page: Selector,
}

#[derive(Debug)]
struct CompiledMeta {
    title: Selector,
    synopsis: Selector,
    image: Selector,
    genres: Selector,
    imdb: Selector,
    seasons: ExtractionProfile,
}

/// [`ProviderAdapter`] driven by a [`SiteProfile`].
#[derive(Debug)]
pub struct SiteAdapter {
    descriptor: ProviderDescriptor,
    base: Url,
    profile: SiteProfile,
    listing: CompiledListing,
    meta: CompiledMeta,
    episodes: ExtractionProfile,
    context: Arc<ProviderContext>,
    bootstrap: Box<dyn SessionBootstrap>,
}

impl SiteAdapter {
    /// Compile `profile`. Fails on an invalid base URL, selector or pattern.
    pub fn new(profile: SiteProfile, context: Arc<ProviderContext>) -> Result<Self> {
        Self::with_bootstrap(profile, context, Box::new(NoBootstrap))
    }

    pub fn with_bootstrap(
        profile: SiteProfile,
        context: Arc<ProviderContext>,
        bootstrap: Box<dyn SessionBootstrap>,
    ) -> Result<Self> {
        let mut base = Url::parse(profile.base_url.trim())
            .map_err(|e| Error::Config(format!("{}: invalid base URL: {e}", profile.name)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let listing = CompiledListing {
            item: selector(&profile.listing.item)?,
            title: selector(&profile.listing.title)?,
            link: selector(&profile.listing.link)?,
            image: selector(&profile.listing.image)?,
            next_page: selector(&profile.listing.next_page)?,
        };

        let mut season_rules = profile.meta.seasons.clone();
        if let Some(host) = base.host_str() {
            season_rules.allow_hosts.push(host.trim_start_matches("www.").to_string());
        }
        season_rules.allow_hosts.extend(profile.episodes.allow_hosts.iter().cloned());
        let meta = CompiledMeta {
            title: selector(&profile.meta.title)?,
            synopsis: selector(&profile.meta.synopsis)?,
            image: selector(&profile.meta.image)?,
            genres: selector(&profile.meta.genres)?,
            imdb: selector("a[href*='imdb.com']")?,
            seasons: ExtractionProfile::compile(&season_rules)?,
        };
        let episodes = ExtractionProfile::compile(&profile.episodes)?;

        let descriptor = ProviderDescriptor {
            name: profile.name.clone(),
            display_name: profile.display_name.clone(),
            base_url: base.as_str().trim_end_matches('/').to_string(),
            disabled: false,
        };
        Ok(Self {
            descriptor,
            base,
            profile,
            listing,
            meta,
            episodes,
            context,
            bootstrap,
        })
    }

    #[must_use]
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.descriptor.disabled = disabled;
        self
    }

    /// Resolve a site-relative path or absolute URL.
    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path.trim())?)
    }

    async fn fetch(&self, url: &Url) -> Result<String> {
        let headers = self.bootstrap.headers(&self.context).await;
        self.context.fetch_html(url.as_str(), &headers).await
    }

    async fn listing(&self, url: Url) -> Result<PostsPage> {
        let html = self.fetch(&url).await?;
        let page = self.parse_listing(&html, &url);
        debug!(provider = %self.descriptor.name, posts = page.posts.len(), "listing parsed");
        Ok(page)
    }

    fn parse_listing(&self, html: &str, page_url: &Url) -> PostsPage {
        let document = Html::parse_document(html);
        let posts = document
            .select(&self.listing.item)
            .filter_map(|item| {
                let title = item.select(&self.listing.title).next().map(text_of)?;
                let link = item
                    .select(&self.listing.link)
                    .find_map(|a| a.value().attr("href"))
                    .and_then(|href| page_url.join(href.trim()).ok())?;
                let image = item
                    .select(&self.listing.image)
                    .find_map(image_src)
                    .and_then(|src| page_url.join(src).ok())
                    .map(String::from)
                    .unwrap_or_default();
                (!title.is_empty()).then(|| Post {
                    title,
                    link: link.into(),
                    image,
                })
            })
            .collect();
        PostsPage {
            posts,
            has_next_page: document.select(&self.listing.next_page).next().is_some(),
        }
    }

    fn parse_meta(&self, html: &str, page_url: &Url) -> MetaRecord {
        let document = Html::parse_document(html);
        let first_text = |sel: &Selector| document.select(sel).next().map(text_of).unwrap_or_default();

        let title = first_text(&self.meta.title);
        let synopsis = first_text(&self.meta.synopsis);
        let image = document
            .select(&self.meta.image)
            .find_map(image_src)
            .and_then(|src| page_url.join(src).ok())
            .map(String::from)
            .unwrap_or_default();
        let imdb_id = document
            .select(&self.meta.imdb)
            .filter_map(|a| a.value().attr("href"))
            .find_map(|href| IMDB_ID.find(href).map(|m| m.as_str().to_string()));
        let genres = document
            .select(&self.meta.genres)
            .map(text_of)
            .filter(|g| !g.is_empty())
            .collect();
        let body_text = text_of(document.root_element());
        let rating = RATING
            .captures(&body_text)
            .and_then(|c| c[1].parse::<f32>().ok());
        let year = YEAR
            .captures(&title)
            .and_then(|c| c[1].parse().ok());

        let seasons = self.group_seasons(extract_episode_links(html, page_url, &self.meta.seasons));
        let content_type = if seasons
            .iter()
            .any(|s| s.episodes_link.is_some() || SERIES_MARKER.is_match(&s.title))
        {
            ContentType::Series
        } else {
            ContentType::Movie
        };

        MetaRecord {
            title,
            synopsis,
            poster: image.clone(),
            image,
            imdb_id,
            content_type,
            year,
            rating,
            genres,
            seasons,
            ..MetaRecord::default()
        }
    }

    /// Fold consecutive links sharing a heading into seasons. A group with a
    /// link back into the site points at an episodes page; a group of only
    /// hosting links is a set of direct links.
    fn group_seasons(&self, links: Vec<EpisodeLink>) -> Vec<Season> {
        let mut groups: Vec<(String, Vec<EpisodeLink>)> = Vec::new();
        for link in links {
            match groups.last_mut() {
                Some((title, group)) if *title == link.title => group.push(link),
                _ => groups.push((link.title.clone(), vec![link])),
            }
        }

        groups
            .into_iter()
            .filter_map(|(title, group)| {
                let quality = parse_quality(&title).map(|q| format!("{q}p"));
                let (direct, pages): (Vec<_>, Vec<_>) = group.into_iter().partition(|l| {
                    Url::parse(&l.link).is_ok_and(|u| self.episodes.allow_list().allows(&u))
                });
                let season = match pages.into_iter().next() {
                    Some(page) => Some(Season::with_episodes_link(title, page.link)),
                    None => Season::with_direct_links(title, direct),
                };
                season.map(|s| s.with_quality(quality))
            })
            .collect()
    }

    /// Hosting or media links on a content page; falls back to every
    /// qualifying anchor when the episode layout is absent.
    fn scan_stream_links(&self, html: &str, page_url: &Url) -> Vec<EpisodeLink> {
        let links = extract_episode_links(html, page_url, &self.episodes);
        if !links.is_empty() {
            return links;
        }
        let document = Html::parse_document(html);
        let Ok(anchors) = Selector::parse("a[href]") else {
            return Vec::new();
        };
        document
            .select(&anchors)
            .filter_map(|a| {
                let url = page_url.join(a.value().attr("href")?.trim()).ok()?;
                let qualifies = self.episodes.allow_list().allows(&url) || is_media_url(url.as_str());
                qualifies.then(|| EpisodeLink {
                    title: text_of(a),
                    link: url.into(),
                    kind: None,
                })
            })
            .collect()
    }

    async fn try_episodes(&self, url: &str) -> Result<Vec<EpisodeLink>> {
        let page = self.url(url)?;
        let html = self.fetch(&page).await?;
        Ok(extract_episode_links(&html, &page, &self.episodes))
    }

    async fn try_stream_links(&self, link: &str) -> Result<Vec<EpisodeLink>> {
        let url = self.url(link)?;
        if self.episodes.allow_list().allows(&url) || is_media_url(url.as_str()) {
            let title = url.host_str().unwrap_or_default().to_string();
            return Ok(vec![EpisodeLink {
                title,
                link: url.into(),
                kind: None,
            }]);
        }
        let html = self.fetch(&url).await?;
        Ok(self.scan_stream_links(&html, &url))
    }
}

#[async_trait]
impl ProviderAdapter for SiteAdapter {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn catalog(&self) -> Result<Catalog> {
        Ok(Catalog {
            catalog: self.profile.catalog.clone(),
            genres: self.profile.genres.clone(),
        })
    }

    #[instrument(skip(self), fields(provider = %self.descriptor.name))]
    async fn posts(&self, filter: &str, page: u32) -> Result<PostsPage> {
        let path = self
            .profile
            .listing
            .posts_path
            .replace("{filter}", &normalize_filter(filter))
            .replace("{page}", &page.max(1).to_string());
        self.listing(self.url(&path)?).await
    }

    #[instrument(skip(self), fields(provider = %self.descriptor.name))]
    async fn search(&self, query: &str, page: u32) -> Result<PostsPage> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(PostsPage::default());
        }
        let path = self
            .profile
            .listing
            .search_path
            .replace("{query}", &urlencoding::encode(query))
            .replace("{page}", &page.max(1).to_string());
        self.listing(self.url(&path)?).await
    }

    #[instrument(skip(self), fields(provider = %self.descriptor.name))]
    async fn meta(&self, link: &str) -> Result<MetaRecord> {
        let url = self.url(link)?;
        let html = self.fetch(&url).await?;
        let record = self.parse_meta(&html, &url);
        if record.title.is_empty() && record.seasons.is_empty() {
            return Err(Error::Parse(format!("no title details found at {url}")));
        }
        Ok(record)
    }

    async fn episodes(&self, url: &str) -> Vec<EpisodeLink> {
        match self.try_episodes(url).await {
            Ok(links) => {
                debug!(provider = %self.descriptor.name, count = links.len(), "episodes extracted");
                links
            }
            Err(e) => {
                warn!(provider = %self.descriptor.name, url, error = %e, "episode extraction failed");
                Vec::new()
            }
        }
    }

    async fn stream_links(&self, link: &str, content_type: ContentType) -> Vec<EpisodeLink> {
        match self.try_stream_links(link).await {
            Ok(links) => links,
            Err(e) => {
                warn!(
                    provider = %self.descriptor.name,
                    link,
                    ?content_type,
                    error = %e,
                    "stream link discovery failed"
                );
                Vec::new()
            }
        }
    }
}

fn normalize_filter(filter: &str) -> String {
    let filter = filter.trim().trim_start_matches('/');
    if filter.is_empty() || filter.ends_with('/') || filter.contains('?') {
        filter.to_string()
    } else {
        format!("{filter}/")
    }
}

fn text_of(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Lazy-loading themes keep the real source in a data attribute.
fn image_src(img: ElementRef<'_>) -> Option<&str> {
    let el = img.value();
    ["data-src", "data-lazy-src", "src", "content"]
        .iter()
        .find_map(|attr| el.attr(attr))
        .map(str::trim)
        .filter(|src| !src.is_empty() && !src.starts_with("data:"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::fingerprint::chrome_profile;
    use crate::provider::sites;

    fn adapter() -> SiteAdapter {
        let context = ProviderContext::with_profile(&Config::default(), &chrome_profile())
            .unwrap()
            .shared();
        SiteAdapter::new(sites::movies4u(), context).unwrap()
    }

    #[test]
    fn filter_paths_are_normalized() {
        assert_eq!(normalize_filter("/category/movies"), "category/movies/");
        assert_eq!(normalize_filter("category/movies/"), "category/movies/");
        assert_eq!(normalize_filter(""), "");
    }

    #[test]
    fn parses_listing_items_and_next_page() {
        let html = r#"
            <article class="post">
              <h2 class="entry-title"><a href="/the-show/">The Show (2024)</a></h2>
              <img data-src="/img/show.jpg" src="data:image/gif;base64,R0">
            </article>
            <article class="post"><h2 class="entry-title"><a href="https://movies4u.test/film/">Film</a></h2></article>
            <article class="post"><p>no title here</p></article>
            <a class="next page-numbers" href="/page/2/">Next</a>"#;
        let adapter = adapter();
        let page = adapter.parse_listing(html, &Url::parse("https://movies4u.test/").unwrap());
        assert_eq!(page.posts.len(), 2);
        assert_eq!(page.posts[0].title, "The Show (2024)");
        assert_eq!(page.posts[0].link, "https://movies4u.test/the-show/");
        assert_eq!(page.posts[0].image, "https://movies4u.test/img/show.jpg");
        assert!(page.has_next_page);
    }

    #[test]
    fn meta_groups_direct_links_and_episode_pages() {
        let html = r#"
            <h1 class="entry-title">The Show (2024) Season 1</h1>
            <div class="entry-content">
              <p>A show about things. IMDb Rating: 7.4/10</p>
              <a href="https://www.imdb.com/title/tt1234567/">IMDb</a>
              <h5>Season 1 720p</h5>
              <div class="downloads-btns-div"><a href="https://m4ulinks.com/number/42882">Episodes</a></div>
              <h5>Season 1 Pack 480p</h5>
              <div class="downloads-btns-div"><a href="https://hubcloud.one/drive/pack">HubCloud</a></div>
            </div>"#;
        let adapter = adapter();
        let meta = adapter.parse_meta(html, &Url::parse("https://movies4u.test/the-show/").unwrap());
        assert_eq!(meta.title, "The Show (2024) Season 1");
        assert_eq!(meta.year, Some(2024));
        assert_eq!(meta.imdb_id.as_deref(), Some("tt1234567"));
        assert_eq!(meta.rating, Some(7.4));
        assert_eq!(meta.content_type, ContentType::Series);
        assert_eq!(meta.seasons.len(), 2);
        assert_eq!(
            meta.seasons[0].episodes_link.as_deref(),
            Some("https://m4ulinks.com/number/42882")
        );
        assert_eq!(meta.seasons[0].quality.as_deref(), Some("720p"));
        assert_eq!(meta.seasons[1].direct_links.as_ref().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn hosting_link_is_its_own_stream_link() {
        let links = adapter()
            .stream_links("https://hubcloud.one/drive/abc", ContentType::Movie)
            .await;
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].title, "hubcloud.one");
    }

    #[tokio::test]
    async fn unreachable_page_yields_no_episodes() {
        let links = adapter().episodes("http://127.0.0.1:9/never").await;
        assert!(links.is_empty());
    }
}
