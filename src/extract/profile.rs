//! Declarative per-site extraction rules.
//!
//! [`ExtractionRules`] is the plain, serializable description a site
//! supplies; [`ExtractionProfile`] is the compiled form the engine runs.
//! Compilation is the only place selectors and patterns can fail.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::provider::types::LinkKind;

static QUALITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{3,4})p\b").expect("static quality pattern"));

/// Pull a resolution marker such as `720p` out of free text.
pub fn parse_quality(text: &str) -> Option<u32> {
    QUALITY
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Where the walk for one heading stops.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiblingStop {
    /// Walk every following sibling until one is, or contains, a heading.
    #[default]
    NextHeading,
    /// Inspect only the immediately following element, and only if it
    /// matches the selector (any element when `None`).
    Immediate(Option<String>),
}

/// Title cleanup applied to heading text.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TitleRules {
    /// Boilerplate words removed wherever they occur (case-insensitive).
    pub remove_tokens: Vec<String>,
    /// Characters dropped from the title.
    pub remove_chars: String,
    /// Move the quality marker (from the heading or anchor text) to the end.
    pub append_quality: bool,
}

/// Uncompiled extraction rules for one site.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionRules {
    /// Container selector.
    pub container: String,
    /// When set, only the first container holding a heading whose text
    /// matches this pattern is used.
    #[serde(default)]
    pub container_marker: Option<String>,
    /// Heading selector, evaluated inside the container.
    pub heading: String,
    /// Start the sibling walk at the heading's parent instead of the heading.
    #[serde(default)]
    pub walk_from_parent: bool,
    #[serde(default)]
    pub stop: SiblingStop,
    /// Anchor candidates inside walked siblings.
    #[serde(default = "default_anchor")]
    pub anchor: String,
    /// Take the href from the nearest enclosing `<a>` (button-in-link markup).
    #[serde(default)]
    pub href_from_enclosing_anchor: bool,
    /// Trusted hosting domains; subdomains are accepted.
    pub allow_hosts: Vec<String>,
    /// Boilerplate removed from the page before traversal.
    #[serde(default)]
    pub strip: Option<String>,
    #[serde(default)]
    pub title: TitleRules,
    #[serde(default)]
    pub kind: Option<LinkKind>,
}

fn default_anchor() -> String {
    "a[href]".to_string()
}

pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Config(format!("invalid selector {css:?}: {e:?}")))
}

fn pattern(re: &str) -> Result<Regex> {
    Regex::new(re).map_err(|e| Error::Config(format!("invalid pattern {re:?}: {e}")))
}

/// How the container region is located.
#[derive(Debug, Clone)]
pub enum ContainerRule {
    All(Selector),
    FirstWithHeading { container: Selector, marker: Regex },
}

/// Set of trusted hosting domains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAllowList(Vec<String>);

impl HostAllowList {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            domains
                .into_iter()
                .map(|d| d.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        )
    }

    /// Exact host or any subdomain of an allowed domain.
    #[must_use]
    pub fn allows(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        self.0.iter().any(|domain| {
            host == *domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    #[must_use]
    pub fn domains(&self) -> &[String] {
        &self.0
    }
}

/// Compiled title cleanup.
#[derive(Debug, Clone)]
pub struct TitleCleanup {
    tokens: Option<Regex>,
    remove_chars: Vec<char>,
    append_quality: bool,
}

impl TitleCleanup {
    fn compile(rules: &TitleRules) -> Result<Self> {
        let tokens = if rules.remove_tokens.is_empty() {
            None
        } else {
            let alternation = rules
                .remove_tokens
                .iter()
                .map(|t| regex::escape(t.trim()))
                .collect::<Vec<_>>()
                .join("|");
            Some(pattern(&format!(r"(?i)\b(?:{alternation})\b"))?)
        };
        Ok(Self {
            tokens,
            remove_chars: rules.remove_chars.chars().collect(),
            append_quality: rules.append_quality,
        })
    }

    /// Clean `heading`; `nearby` is consulted for a quality marker when the
    /// heading has none.
    #[must_use]
    pub fn apply(&self, heading: &str, nearby: &str) -> String {
        let mut base = heading.to_string();
        let mut quality = None;
        if self.append_quality {
            quality = parse_quality(heading).or_else(|| parse_quality(nearby));
            base = QUALITY.replace_all(&base, " ").into_owned();
        }
        if let Some(tokens) = &self.tokens {
            base = tokens.replace_all(&base, " ").into_owned();
        }
        base.retain(|c| !self.remove_chars.contains(&c));
        let base = collapse_whitespace(&base);

        let title = match quality {
            Some(q) if base.is_empty() => format!("{q}p"),
            Some(q) => format!("{base} {q}p"),
            None => base,
        };
        if title.is_empty() {
            collapse_whitespace(heading)
        } else {
            title
        }
    }
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compiled, ready-to-run extraction profile.
#[derive(Debug, Clone)]
pub struct ExtractionProfile {
    pub(crate) container: ContainerRule,
    pub(crate) heading: Selector,
    pub(crate) walk_from_parent: bool,
    pub(crate) stop: CompiledStop,
    pub(crate) anchor: Selector,
    pub(crate) href_from_enclosing_anchor: bool,
    pub(crate) allow: HostAllowList,
    pub(crate) strip: Option<Selector>,
    pub(crate) title: TitleCleanup,
    pub(crate) kind: Option<LinkKind>,
}

#[derive(Debug, Clone)]
pub(crate) enum CompiledStop {
    NextHeading,
    Immediate(Option<Selector>),
}

impl ExtractionProfile {
    pub fn compile(rules: &ExtractionRules) -> Result<Self> {
        let container_selector = selector(&rules.container)?;
        let container = match &rules.container_marker {
            Some(marker) => ContainerRule::FirstWithHeading {
                container: container_selector,
                marker: pattern(marker)?,
            },
            None => ContainerRule::All(container_selector),
        };
        let stop = match &rules.stop {
            SiblingStop::NextHeading => CompiledStop::NextHeading,
            SiblingStop::Immediate(None) => CompiledStop::Immediate(None),
            SiblingStop::Immediate(Some(css)) => CompiledStop::Immediate(Some(selector(css)?)),
        };
        let allow = HostAllowList::new(&rules.allow_hosts);
        if allow.domains().is_empty() {
            return Err(Error::Config("extraction rules need a non-empty host allow-list".into()));
        }

        Ok(Self {
            container,
            heading: selector(&rules.heading)?,
            walk_from_parent: rules.walk_from_parent,
            stop,
            anchor: selector(&rules.anchor)?,
            href_from_enclosing_anchor: rules.href_from_enclosing_anchor,
            allow,
            strip: rules.strip.as_deref().map(selector).transpose()?,
            title: TitleCleanup::compile(&rules.title)?,
            kind: rules.kind,
        })
    }

    #[must_use]
    pub fn allow_list(&self) -> &HostAllowList {
        &self.allow
    }

    pub(crate) fn is_heading(&self, el: ElementRef<'_>) -> bool {
        self.heading.matches(&el) || el.select(&self.heading).next().is_some()
    }
}
