use super::{catalog_item, hosting_domains, wordpress_listing, wordpress_meta};
use crate::extract::{ExtractionRules, SiblingStop, TitleRules};
use crate::provider::site::SiteProfile;

/// Episode pages live on the `m4ulinks.com` link site: `<h5>` titles such as
/// `-:Episodes: 1:- (Grand Premiere)`, each followed by a
/// `.downloads-btns-div` holding the mirror buttons.
#[must_use]
pub fn movies4u() -> SiteProfile {
    SiteProfile {
        name: "movies4u".into(),
        display_name: "Movies4u".into(),
        base_url: "https://movies4u.style".into(),
        catalog: vec![
            catalog_item("Latest", ""),
            catalog_item("Bollywood", "category/bollywood/"),
            catalog_item("Hollywood", "category/hollywood/"),
            catalog_item("Web Series", "category/web-series/"),
        ],
        genres: vec![
            catalog_item("Action", "category/action/"),
            catalog_item("Drama", "category/drama/"),
            catalog_item("Horror", "category/horror/"),
        ],
        listing: wordpress_listing(),
        meta: wordpress_meta(&["m4ulinks.com"]),
        episodes: ExtractionRules {
            container: ".entry-content, .entry-inner, .download-links-div".into(),
            container_marker: None,
            heading: "h5".into(),
            walk_from_parent: false,
            stop: SiblingStop::Immediate(Some(".downloads-btns-div".into())),
            anchor: "a[href]".into(),
            href_from_enclosing_anchor: false,
            allow_hosts: hosting_domains(),
            strip: Some(".unili-content, .code-block-1".into()),
            title: TitleRules {
                remove_chars: "-:".into(),
                ..TitleRules::default()
            },
            kind: None,
        },
    }
}
