//! Hand-off to an out-of-process player.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::provider::types::MediaType;

/// Result of a hand-off. Always usable in some form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "handoff", rename_all = "camelCase")]
pub enum Handoff {
    Launched { player: String, url: String },
    /// No player could be started; the caller shows `url` with `hint`.
    Manual { url: String, hint: String },
}

impl Handoff {
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Handoff::Launched { url, .. } | Handoff::Manual { url, .. } => url,
        }
    }
}

#[async_trait]
pub trait PlayerLauncher: Send + Sync + std::fmt::Debug {
    /// Start a player on `url`, returning its name. The player runs
    /// detached; this returns once it has been spawned.
    async fn launch(&self, url: &str, title: &str, headers: &BTreeMap<String, String>) -> Result<String>;
}

/// Never launches anything; hand-off always degrades to manual.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPlayer;

#[async_trait]
impl PlayerLauncher for NoPlayer {
    async fn launch(&self, _url: &str, _title: &str, _headers: &BTreeMap<String, String>) -> Result<String> {
        Err(Error::Playback("no external player configured".into()))
    }
}

/// First installed player from a preference list (`mpv`, `vlc`).
#[derive(Debug, Clone)]
pub struct ExternalPlayers {
    preference: Vec<String>,
}

impl ExternalPlayers {
    pub fn new<I, S>(preference: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            preference: preference.into_iter().map(Into::into).collect(),
        }
    }

    fn locate(&self) -> Option<(String, PathBuf)> {
        self.preference
            .iter()
            .find_map(|name| which::which(name).ok().map(|path| (name.clone(), path)))
    }
}

/// Command-line arguments for `player`.
fn player_args(player: &str, url: &str, title: &str, headers: &BTreeMap<String, String>) -> Vec<String> {
    let mut args = Vec::new();
    let name = player.rsplit(['/', '\\']).next().unwrap_or(player);
    if name.starts_with("mpv") {
        if !title.is_empty() {
            args.push(format!("--force-media-title={title}"));
        }
        if !headers.is_empty() {
            let fields = headers
                .iter()
                .map(|(k, v)| format!("{k}: {}", v.replace(',', "\\,")))
                .collect::<Vec<_>>()
                .join(",");
            args.push(format!("--http-header-fields={fields}"));
        }
    } else if name.starts_with("vlc") {
        if !title.is_empty() {
            args.push(format!("--meta-title={title}"));
        }
        for (key, value) in headers {
            if key.eq_ignore_ascii_case("referer") {
                args.push(format!("--http-referrer={value}"));
            } else if key.eq_ignore_ascii_case("user-agent") {
                args.push(format!("--http-user-agent={value}"));
            }
        }
    }
    args.push(url.to_string());
    args
}

#[async_trait]
impl PlayerLauncher for ExternalPlayers {
    async fn launch(&self, url: &str, title: &str, headers: &BTreeMap<String, String>) -> Result<String> {
        let Some((name, path)) = self.locate() else {
            debug!(preference = ?self.preference, "no external player installed");
            return Err(Error::Playback("no external player found in PATH".into()));
        };
        Command::new(&path)
            .args(player_args(&name, url, title, headers))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Playback(format!("failed to spawn {name}: {e}")))?;
        info!(player = %name, "handed off to external player");
        Ok(name)
    }
}

/// What to tell a user who has to open `url` by hand.
#[must_use]
pub fn manual_hint(media_type: MediaType, limited_browser_support: bool) -> String {
    if media_type == MediaType::Manifest {
        "Open this as a network stream in a media player (VLC: Media > Open Network Stream)".into()
    } else if limited_browser_support {
        "This format rarely plays in a browser; use a desktop player such as VLC or mpv, or download it".into()
    } else {
        "Open the link in a browser or media player".into()
    }
}
