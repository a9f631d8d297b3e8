//! Link extraction engine.
//!
//! One traversal shared by every site: locate the container region, treat
//! each heading inside it as an episode group, walk the following siblings
//! and keep anchors that point at an allow-listed host. Sites only supply an
//! [`ExtractionProfile`].
//!
//! Extraction is pure and total: malformed markup or hrefs produce fewer
//! links, never an error.

pub mod profile;

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use tracing::trace;
use url::Url;

pub use profile::{
    parse_quality, ExtractionProfile, ExtractionRules, HostAllowList, SiblingStop, TitleRules,
};

use crate::provider::types::EpisodeLink;
use profile::{collapse_whitespace, CompiledStop, ContainerRule};

/// Extract episode links from `html`, resolving relative hrefs against
/// `page_url`. Links come back in document order; mirrors under the same
/// heading each produce their own entry.
#[must_use]
pub fn extract_episode_links(
    html: &str,
    page_url: &Url,
    profile: &ExtractionProfile,
) -> Vec<EpisodeLink> {
    let mut document = Html::parse_document(html);
    if let Some(strip) = &profile.strip {
        strip_matching(&mut document, strip);
    }

    let mut links = Vec::new();
    let mut seen_headings = HashSet::new();
    for container in containers(&document, profile) {
        for heading in container.select(&profile.heading) {
            // Nested containers (".entry-content .entry-inner") share headings.
            if !seen_headings.insert(heading.id()) {
                continue;
            }
            let heading_text = text_of(heading);
            if heading_text.is_empty() {
                continue;
            }

            for anchor in group_anchors(heading, profile) {
                let Some(url) = anchor_url(anchor, page_url, profile) else {
                    continue;
                };
                if !profile.allow.allows(&url) {
                    trace!(%url, "anchor host not allow-listed");
                    continue;
                }
                links.push(EpisodeLink {
                    title: profile.title.apply(&heading_text, &text_of(anchor)),
                    link: url.into(),
                    kind: profile.kind,
                });
            }
        }
    }
    links
}

fn strip_matching(document: &mut Html, selector: &Selector) {
    let ids: Vec<_> = document.select(selector).map(|el| el.id()).collect();
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn containers<'a>(document: &'a Html, profile: &ExtractionProfile) -> Vec<ElementRef<'a>> {
    match &profile.container {
        ContainerRule::All(selector) => document.select(selector).collect(),
        ContainerRule::FirstWithHeading { container, marker } => document
            .select(container)
            .find(|candidate| {
                candidate
                    .select(&profile.heading)
                    .any(|h| marker.is_match(&text_of(h)))
            })
            .into_iter()
            .collect(),
    }
}

/// Anchor candidates belonging to one heading's group.
fn group_anchors<'a>(heading: ElementRef<'a>, profile: &ExtractionProfile) -> Vec<ElementRef<'a>> {
    let origin = if profile.walk_from_parent {
        heading.parent().and_then(ElementRef::wrap).unwrap_or(heading)
    } else {
        heading
    };
    let mut siblings = origin.next_siblings().filter_map(ElementRef::wrap);

    let mut anchors = Vec::new();
    match &profile.stop {
        CompiledStop::NextHeading => {
            for sibling in siblings {
                if profile.is_heading(sibling) {
                    break;
                }
                collect_anchors(sibling, &profile.anchor, &mut anchors);
            }
        }
        CompiledStop::Immediate(required) => {
            if let Some(sibling) = siblings.next() {
                if required.as_ref().map_or(true, |sel| sel.matches(&sibling)) {
                    collect_anchors(sibling, &profile.anchor, &mut anchors);
                }
            }
        }
    }
    anchors
}

fn collect_anchors<'a>(element: ElementRef<'a>, anchor: &Selector, out: &mut Vec<ElementRef<'a>>) {
    if anchor.matches(&element) {
        out.push(element);
    }
    out.extend(element.select(anchor));
}

fn anchor_url(anchor: ElementRef<'_>, page_url: &Url, profile: &ExtractionProfile) -> Option<Url> {
    let href = anchor.value().attr("href").or_else(|| {
        if profile.href_from_enclosing_anchor {
            anchor
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|el| el.value().name() == "a")
                .and_then(|a| a.value().attr("href"))
        } else {
            None
        }
    })?;
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let url = page_url.join(href).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

fn text_of(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::types::LinkKind;

    fn rules(container: &str, heading: &str, stop: SiblingStop) -> ExtractionRules {
        ExtractionRules {
            container: container.into(),
            container_marker: None,
            heading: heading.into(),
            walk_from_parent: false,
            stop,
            anchor: "a[href]".into(),
            href_from_enclosing_anchor: false,
            allow_hosts: vec!["hubcloud.one".into(), "gdflix.dev".into()],
            strip: None,
            title: TitleRules::default(),
            kind: None,
        }
    }

    fn page() -> Url {
        Url::parse("https://site.test/show/").unwrap()
    }

    #[test]
    fn walks_until_next_heading_and_keeps_mirrors() {
        let html = r#"
            <div class="c">
              <h4>Episode 1</h4>
              <p><a href="https://hubcloud.one/a">HubCloud</a></p>
              <p><a href="https://gdflix.dev/a">GDFlix</a> <a href="https://ads.test/x">Ad</a></p>
              <h4>Episode 2</h4>
              <p><a href="https://hubcloud.one/b">HubCloud</a></p>
            </div>"#;
        let profile = ExtractionProfile::compile(&rules(".c", "h4", SiblingStop::NextHeading)).unwrap();
        let links = extract_episode_links(html, &page(), &profile);
        let pairs: Vec<_> = links.iter().map(|l| (l.title.as_str(), l.link.as_str())).collect();
        assert_eq!(
            pairs,
            vec![
                ("Episode 1", "https://hubcloud.one/a"),
                ("Episode 1", "https://gdflix.dev/a"),
                ("Episode 2", "https://hubcloud.one/b"),
            ]
        );
    }

    #[test]
    fn heading_without_qualifying_anchor_emits_nothing() {
        let html = r#"
            <div class="c">
              <h4>Episode 1</h4>
              <p><a href="https://ads.test/x">Download now</a></p>
              <h4>Episode 2</h4>
            </div>"#;
        let profile = ExtractionProfile::compile(&rules(".c", "h4", SiblingStop::NextHeading)).unwrap();
        assert!(extract_episode_links(html, &page(), &profile).is_empty());
    }

    #[test]
    fn immediate_stop_only_inspects_matching_next_sibling() {
        let html = r#"
            <div class="c">
              <h5>Episode 1</h5>
              <div class="btns"><a href="https://hubcloud.one/1">Get</a></div>
              <div class="btns"><a href="https://hubcloud.one/extra">Get</a></div>
              <h5>Episode 2</h5>
              <p><a href="https://hubcloud.one/2">Get</a></p>
            </div>"#;
        let profile = ExtractionProfile::compile(&rules(
            ".c",
            "h5",
            SiblingStop::Immediate(Some(".btns".into())),
        ))
        .unwrap();
        let links = extract_episode_links(html, &page(), &profile);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].link, "https://hubcloud.one/1");
    }

    #[test]
    fn relative_and_non_http_hrefs() {
        let html = r##"
            <div class="c">
              <h4>Episode 1</h4>
              <p>
                <a href="//hubcloud.one/rel">protocol-relative</a>
                <a href="javascript:void(0)">js</a>
                <a href="#top">top</a>
              </p>
            </div>"##;
        let mut r = rules(".c", "h4", SiblingStop::NextHeading);
        r.kind = Some(LinkKind::Series);
        let profile = ExtractionProfile::compile(&r).unwrap();
        let links = extract_episode_links(html, &page(), &profile);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].link, "https://hubcloud.one/rel");
        assert_eq!(links[0].kind, Some(LinkKind::Series));
    }

    #[test]
    fn stripped_boilerplate_is_ignored_and_nested_containers_not_duplicated() {
        let html = r#"
            <div class="entry-content"><div class="entry-inner">
              <div class="ad"><h4>Sponsored</h4><p><a href="https://hubcloud.one/ad">x</a></p></div>
              <h4>Episode 1</h4>
              <p><a href="https://hubcloud.one/1">x</a></p>
            </div></div>"#;
        let mut r = rules(".entry-content, .entry-inner", "h4", SiblingStop::Immediate(Some("p".into())));
        r.strip = Some(".ad".into());
        let profile = ExtractionProfile::compile(&r).unwrap();
        let links = extract_episode_links(html, &page(), &profile);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].title, "Episode 1");
    }

    #[test]
    fn garbage_input_yields_empty() {
        let profile = ExtractionProfile::compile(&rules(".c", "h4", SiblingStop::NextHeading)).unwrap();
        assert!(extract_episode_links("", &page(), &profile).is_empty());
        assert!(extract_episode_links("<<<>>><div class=c><h4>", &page(), &profile).is_empty());
    }
}
