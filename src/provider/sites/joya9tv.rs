use super::{catalog_item, wordpress_listing, wordpress_meta};
use crate::extract::{ExtractionRules, SiblingStop, TitleRules};
use crate::provider::site::SiteProfile;

/// Episodes sit in a `<ul>`: a `<li><p class="font-bold">Episode 38 Links 480p</p></li>`
/// heading followed by `<li>` rows of mirror links.
#[must_use]
pub fn joya9tv() -> SiteProfile {
    SiteProfile {
        name: "joya9tv".into(),
        display_name: "Joya9tv".into(),
        base_url: "https://joya9tv.com".into(),
        catalog: vec![
            catalog_item("Latest", ""),
            catalog_item("Web Series", "category/web-series/"),
            catalog_item("Hindi Dubbed", "category/hindi-dubbed/"),
            catalog_item("Bollywood", "category/bollywood/"),
        ],
        genres: vec![
            catalog_item("Action", "genre/action/"),
            catalog_item("Comedy", "genre/comedy/"),
            catalog_item("Thriller", "genre/thriller/"),
        ],
        listing: wordpress_listing(),
        meta: wordpress_meta(&[]),
        episodes: ExtractionRules {
            container: "ul".into(),
            container_marker: Some("(?i)episode".into()),
            heading: "p.font-bold".into(),
            walk_from_parent: true,
            stop: SiblingStop::NextHeading,
            anchor: "a[href]".into(),
            href_from_enclosing_anchor: false,
            allow_hosts: vec!["hubcloud.one".into(), "gdflix.dev".into()],
            strip: None,
            title: TitleRules {
                remove_tokens: vec!["Links".into()],
                remove_chars: String::new(),
                append_quality: true,
            },
            kind: None,
        },
    }
}
