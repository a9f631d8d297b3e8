//! Built-in site profiles.
//!
//! Each site is a [`SiteProfile`] record; base URLs, display names and
//! session bootstrap are overridable from config.

mod joya9tv;
mod movies4u;
mod zeefliz;

pub use joya9tv::joya9tv;
pub use movies4u::movies4u;
pub use zeefliz::zeefliz;

use super::site::{ListingRules, MetaRules, SiteProfile};
use super::types::CatalogItem;
use crate::extract::{ExtractionRules, SiblingStop, TitleRules};

/// Hosting domains the WordPress mirrors link out to.
pub(crate) const HOSTING_DOMAINS: &[&str] = &[
    "hubcloud.one",
    "hubcloud.ink",
    "hubcloud.art",
    "hubcloud.bz",
    "gdflix.dev",
];

/// All built-in profiles, in display order.
#[must_use]
pub fn builtin() -> Vec<SiteProfile> {
    vec![joya9tv(), movies4u(), zeefliz()]
}

pub(crate) fn hosting_domains() -> Vec<String> {
    HOSTING_DOMAINS.iter().map(ToString::to_string).collect()
}

pub(crate) fn catalog_item(title: &str, filter: &str) -> CatalogItem {
    CatalogItem {
        title: title.to_string(),
        filter: filter.to_string(),
    }
}

/// Listing markup shared by the WordPress themes these sites run.
pub(crate) fn wordpress_listing() -> ListingRules {
    ListingRules {
        item: "article, .post-item, .movie-item".into(),
        title: ".entry-title, h2, h3, .post-title".into(),
        link: ".entry-title a[href], a[href]".into(),
        image: "img".into(),
        next_page: "a.next, .nav-links .next, .pagination .next, a[rel='next']".into(),
        posts_path: "{filter}page/{page}/".into(),
        search_path: "page/{page}/?s={query}".into(),
    }
}

/// Title page markup shared by the WordPress themes; season groups are
/// headings followed by download buttons.
pub(crate) fn wordpress_meta(extra_hosts: &[&str]) -> MetaRules {
    MetaRules {
        title: "h1.entry-title, h1, title".into(),
        synopsis: ".entry-content > p, .summary, .description".into(),
        image: ".entry-content img, meta[property='og:image'], img".into(),
        genres: "a[rel='category tag'], .genres a".into(),
        seasons: ExtractionRules {
            container: ".entry-content, .entry-inner".into(),
            container_marker: None,
            heading: "h3, h4, h5".into(),
            walk_from_parent: false,
            stop: SiblingStop::NextHeading,
            anchor: "a[href]".into(),
            href_from_enclosing_anchor: false,
            allow_hosts: extra_hosts.iter().map(ToString::to_string).collect(),
            strip: Some(".unili-content, .code-block-1".into()),
            title: TitleRules {
                remove_chars: "-:".into(),
                ..TitleRules::default()
            },
            kind: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractionProfile;

    #[test]
    fn every_builtin_profile_compiles() {
        for profile in builtin() {
            ExtractionProfile::compile(&profile.episodes)
                .unwrap_or_else(|e| panic!("{}: {e}", profile.name));
            ExtractionProfile::compile(&ExtractionRules {
                allow_hosts: vec!["self.test".into()],
                ..profile.meta.seasons.clone()
            })
            .unwrap_or_else(|e| panic!("{} meta: {e}", profile.name));
        }
    }

    #[test]
    fn builtin_names_are_unique() {
        let mut names: Vec<_> = builtin().into_iter().map(|p| p.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 3);
    }
}
