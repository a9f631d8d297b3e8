use super::{catalog_item, hosting_domains, wordpress_listing, wordpress_meta};
use crate::extract::{ExtractionRules, SiblingStop, TitleRules};
use crate::provider::site::SiteProfile;

/// `<h4>` episode titles, each followed by a `<p>` of
/// `<a href><button class="btn-outline">` mirror buttons.
#[must_use]
pub fn zeefliz() -> SiteProfile {
    SiteProfile {
        name: "zeefliz".into(),
        display_name: "Zeefliz".into(),
        base_url: "https://zeefliz.com".into(),
        catalog: vec![
            catalog_item("Latest", ""),
            catalog_item("Movies", "category/movies/"),
            catalog_item("Web Series", "category/web-series/"),
        ],
        genres: Vec::new(),
        listing: wordpress_listing(),
        meta: wordpress_meta(&[]),
        episodes: ExtractionRules {
            container: ".entry-content, .entry-inner".into(),
            container_marker: None,
            heading: "h4".into(),
            walk_from_parent: false,
            stop: SiblingStop::Immediate(Some("p".into())),
            anchor: ".btn-outline".into(),
            href_from_enclosing_anchor: true,
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
