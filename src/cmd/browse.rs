use anyhow::Result;
use futures::StreamExt;

use reelnab::provider::types::{Season, StreamSource};
use reelnab::{ContentType, SearchAggregator, SearchReport, SearchStatus};

use super::output::{emit, quality_label, truncate_text};
use super::Session;
use crate::OutputFormat;

pub fn cmd_providers(session: &Session, format: OutputFormat) -> Result<()> {
    emit(&session.registry.descriptors(), format, |providers| {
        for p in providers {
            let state = if p.disabled { " (disabled)" } else { "" };
            println!("{:<12} {:<20} {}{state}", p.name, p.display_name, p.base_url);
        }
    })
}

pub async fn cmd_search(session: &Session, query: &str, page: u32, format: OutputFormat) -> Result<()> {
    let aggregator = SearchAggregator::from_config(session.registry.clone(), &session.config);
    if format == OutputFormat::Json {
        let report = aggregator.collect(query, page).await;
        return emit(&report, format, |_| {});
    }

    println!("🔍 Searching {} providers for {query:?}\n", session.registry.active().count());
    let mut outcomes = Box::pin(aggregator.search_all(query, page));
    let mut report = SearchReport::default();
    while let Some(outcome) = outcomes.next().await {
        match &outcome.status {
            SearchStatus::Found => {
                println!("📺 {} ({} ms)", outcome.display_name, outcome.elapsed_ms);
                for post in &outcome.page.posts {
                    println!("   {}  {}", truncate_text(&post.title, 60), post.link);
                }
            }
            SearchStatus::Empty => println!("∅  {}: no results", outcome.display_name),
            SearchStatus::Failed { error } => println!("⚠️  {}: {error}", outcome.display_name),
            SearchStatus::TimedOut => println!("⏱  {}: timed out", outcome.display_name),
        }
        report.outcomes.push(outcome);
    }
    println!(
        "\n({} posts, {} providers answered, {} failed)",
        report.posts().count(),
        report.succeeded().count(),
        report.failed().count()
    );
    Ok(())
}

pub async fn cmd_catalog(session: &Session, provider: &str, format: OutputFormat) -> Result<()> {
    let catalog = session.registry.get(provider)?.catalog().await?;
    emit(&catalog, format, |catalog| {
        for item in &catalog.catalog {
            println!("{:<28} {}", item.title, item.filter);
        }
        if !catalog.genres.is_empty() {
            println!("\nGenres:");
            for item in &catalog.genres {
                println!("   {:<25} {}", item.title, item.filter);
            }
        }
    })
}

pub async fn cmd_posts(
    session: &Session,
    provider: &str,
    filter: &str,
    page: u32,
    format: OutputFormat,
) -> Result<()> {
    let posts = session.registry.get(provider)?.posts(filter, page).await?;
    emit(&posts, format, |posts| {
        for post in &posts.posts {
            println!("{}  {}", truncate_text(&post.title, 60), post.link);
        }
        if posts.has_next_page {
            println!("\n(more on page {})", page + 1);
        }
    })
}

fn print_season(season: &Season) {
    let quality = season.quality.as_deref().unwrap_or("");
    match (&season.episodes_link, &season.direct_links) {
        (Some(link), _) => println!("   {} {quality}  → {link}", season.title),
        (None, Some(links)) => {
            println!("   {} {quality}", season.title);
            for link in links {
                println!("      {}  {}", link.title, link.link);
            }
        }
        (None, None) => {}
    }
}

pub async fn cmd_meta(session: &Session, provider: &str, link: &str, format: OutputFormat) -> Result<()> {
    let meta = session.registry.get(provider)?.meta(link).await?;
    emit(&meta, format, |meta| {
        println!("🎬 {}", meta.title);
        if let Some(year) = meta.year {
            println!("   Year: {year}");
        }
        if let Some(imdb) = &meta.imdb_id {
            println!("   IMDB: {imdb}");
        }
        if !meta.genres.is_empty() {
            println!("   Genres: {}", meta.genres.join(", "));
        }
        if !meta.synopsis.is_empty() {
            println!("\n{}\n", truncate_text(&meta.synopsis, 400));
        }
        meta.seasons.iter().for_each(print_season);
    })
}

pub async fn cmd_episodes(session: &Session, provider: &str, url: &str, format: OutputFormat) -> Result<()> {
    let episodes = session.registry.get(provider)?.episodes(url).await;
    emit(&episodes, format, |episodes| {
        for episode in episodes {
            println!("{:<30} {}", episode.title, episode.link);
        }
        println!("\n({} links)", episodes.len());
    })
}

pub fn print_candidates(candidates: &[StreamSource]) {
    for (i, c) in candidates.iter().enumerate() {
        let mut notes = Vec::new();
        if c.requires_extraction {
            notes.push(format!("via {}", c.extraction_service.as_deref().unwrap_or("generic")));
        }
        if c.limited_browser_support {
            notes.push("desktop player".to_string());
        }
        if c.headers.is_some() {
            notes.push("needs headers".to_string());
        }
        println!(
            "[{i:>2}] {:<6} {:<22} {}  {}",
            quality_label(c.quality),
            truncate_text(&c.server, 22),
            c.link,
            notes.join(", ")
        );
    }
}

pub async fn cmd_streams(
    session: &Session,
    provider: &str,
    link: &str,
    content_type: ContentType,
    format: OutputFormat,
) -> Result<()> {
    let candidates = session.resolver.resolve_candidates(provider, link, content_type).await?;
    emit(&candidates, format, |candidates| {
        if candidates.is_empty() {
            println!("No playable sources found; try another provider or title.");
        } else {
            print_candidates(candidates);
        }
    })
}
