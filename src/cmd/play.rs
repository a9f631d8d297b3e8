use anyhow::{bail, Result};
use serde_json::json;

use reelnab::playback::{FileHistory, HeadlessSurface, HistoryEntry, PlaybackOrchestrator, WatchHistory};
use reelnab::provider::types::StreamSource;
use reelnab::{ContentType, Handoff};

use super::browse::print_candidates;
use super::output::emit;
use super::Session;
use crate::OutputFormat;

/// What `play` was asked for.
pub struct Selection<'a> {
    pub provider: &'a str,
    pub link: &'a str,
    pub content_type: ContentType,
    pub index: Option<usize>,
    pub download: bool,
}

/// Highest quality first; unknown quality last.
fn best_candidate(candidates: &[StreamSource]) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .max_by_key(|(i, c)| (c.quality.unwrap_or(0), std::cmp::Reverse(*i)))
        .map(|(i, _)| i)
}

pub async fn cmd_play(session: &Session, selection: Selection<'_>, format: OutputFormat) -> Result<()> {
    let candidates = session
        .resolver
        .resolve_candidates(selection.provider, selection.link, selection.content_type)
        .await?;
    if candidates.is_empty() {
        bail!("No playable sources found for {}", selection.link);
    }
    let index = match selection.index {
        Some(i) if i < candidates.len() => i,
        Some(i) => {
            print_candidates(&candidates);
            bail!("No candidate {i}; pick one of 0..{}", candidates.len() - 1);
        }
        None => best_candidate(&candidates).unwrap_or(0),
    };
    let candidate = &candidates[index];

    let orchestrator = PlaybackOrchestrator::new(
        session.extractor.clone(),
        std::sync::Arc::new(HeadlessSurface::default()),
        &session.config,
    );

    if selection.download {
        let url = orchestrator.download_url(candidate).await;
        return emit(&json!({ "downloadUrl": &url }), format, |_| {
            println!("⬇️  {url}");
        });
    }

    let title = format!("{} [{}]", selection.link, candidate.server);
    let handoff = orchestrator.handoff(candidate, &title).await;
    if matches!(handoff, Handoff::Launched { .. }) {
        FileHistory::open(FileHistory::default_path()).add_to_history(&HistoryEntry {
            provider: selection.provider.to_string(),
            title,
            link: selection.link.to_string(),
            image: None,
        });
    }
    emit(&handoff, format, |handoff| match handoff {
        Handoff::Launched { player, url } => println!("▶️  Playing in {player}: {url}"),
        Handoff::Manual { url, hint } => {
            println!("🔗 {url}");
            println!("   {hint}");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelnab::MediaType;

    #[test]
    fn best_candidate_prefers_quality_then_order() {
        let candidates = vec![
            StreamSource::direct("a", "https://a.test/1.mp4", MediaType::Progressive).with_quality(Some(480)),
            StreamSource::direct("b", "https://b.test/1.mp4", MediaType::Progressive).with_quality(Some(1080)),
            StreamSource::direct("c", "https://c.test/1.mp4", MediaType::Progressive).with_quality(Some(1080)),
            StreamSource::direct("d", "https://d.test/1.mp4", MediaType::Progressive),
        ];
        assert_eq!(best_candidate(&candidates), Some(1));
        assert_eq!(best_candidate(&[]), None);
    }
}
