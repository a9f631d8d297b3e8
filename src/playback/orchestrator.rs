use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::external::{manual_hint, ExternalPlayers, Handoff, PlayerLauncher};
use super::history::{HistoryEntry, NoopHistory, WatchHistory, MIN_RECORDED_POSITION};
use super::state::{PlaybackSnapshot, PlaybackState};
use super::surface::{PlaybackSurface, SurfaceFault};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::provider::types::{MediaType, StreamSource};
use crate::resolve::{has_limited_browser_support, media_type_of, playable_url, ExtractionService, HeaderRules};
use crate::retry::RetryPolicy;

/// Per-selection switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectOptions {
    /// Play containers with poor browser support without stopping at a
    /// format warning.
    pub allow_limited_formats: bool,
}

/// How a selection ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum SelectOutcome {
    Playing { session: u64, url: String },
    /// Session is `Ready` but the format is unlikely to render; call
    /// [`PlaybackOrchestrator::confirm`] to play anyway or offer
    /// `download_url`.
    #[serde(rename_all = "camelCase")]
    FormatWarning { session: u64, url: String, download_url: String },
    /// Session is `Errored`; another candidate may still work.
    Failed { session: u64, message: String },
    /// A newer selection or a stop overtook this one; nothing was applied.
    Superseded { session: u64 },
}

/// How a surface fault was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    Recovering { attempt: u32 },
    Escalated,
    /// The fault belongs to a session that is no longer playing.
    Ignored,
}

#[derive(Debug)]
struct Session {
    id: u64,
    cancel: CancellationToken,
    entry: Option<HistoryEntry>,
    recoveries: u32,
    attached: bool,
    state: PlaybackState,
}

/// Single-session playback state machine.
///
/// Selecting a candidate cancels whatever the previous session was doing;
/// results that arrive for a cancelled session are dropped. All state lives
/// behind one mutex that is never held across an await.
#[derive(Debug)]
pub struct PlaybackOrchestrator {
    extractor: Arc<dyn ExtractionService>,
    surface: Arc<dyn PlaybackSurface>,
    history: Arc<dyn WatchHistory>,
    launcher: Arc<dyn PlayerLauncher>,
    header_rules: HeaderRules,
    proxy_base: String,
    extraction_retry: RetryPolicy,
    max_recoveries: u32,
    session: Mutex<Session>,
    surface_gate: tokio::sync::Mutex<()>,
    state_tx: watch::Sender<PlaybackSnapshot>,
}

impl PlaybackOrchestrator {
    pub fn new(
        extractor: Arc<dyn ExtractionService>,
        surface: Arc<dyn PlaybackSurface>,
        config: &Config,
    ) -> Self {
        let (state_tx, _) = watch::channel(PlaybackSnapshot {
            session: 0,
            state: PlaybackState::Idle,
        });
        Self {
            extractor,
            surface,
            history: Arc::new(NoopHistory),
            launcher: Arc::new(ExternalPlayers::new(config.playback.external_players.clone())),
            header_rules: HeaderRules::from_config(&config.header_rules),
            proxy_base: config.server.public_base(),
            extraction_retry: config
                .retry
                .clone()
                .with_max_attempts(config.playback.max_extraction_attempts),
            max_recoveries: config.playback.max_manifest_recoveries,
            session: Mutex::new(Session {
                id: 0,
                cancel: CancellationToken::new(),
                entry: None,
                recoveries: 0,
                attached: false,
                state: PlaybackState::Idle,
            }),
            surface_gate: tokio::sync::Mutex::new(()),
            state_tx,
        }
    }

    #[must_use]
    pub fn with_history(mut self, history: Arc<dyn WatchHistory>) -> Self {
        self.history = history;
        self
    }

    #[must_use]
    pub fn with_launcher(mut self, launcher: Arc<dyn PlayerLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    /// Observe state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.state_tx.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> PlaybackSnapshot {
        let s = self.lock();
        PlaybackSnapshot {
            session: s.id,
            state: s.state.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, session: &Session) {
        self.state_tx.send_replace(PlaybackSnapshot {
            session: session.id,
            state: session.state.clone(),
        });
    }

    /// Tear down the current session and open a new one.
    fn begin(&self, entry: HistoryEntry) -> (u64, CancellationToken) {
        let mut s = self.lock();
        s.cancel.cancel();
        if s.attached {
            self.surface.detach();
            s.attached = false;
        }
        s.id += 1;
        s.cancel = CancellationToken::new();
        s.entry = Some(entry);
        s.recoveries = 0;
        s.state = PlaybackState::Idle;
        self.publish(&s);
        debug!(session = s.id, "playback session started");
        (s.id, s.cancel.clone())
    }

    /// Apply `state` if session `id` is still current and not cancelled.
    fn transition(&self, id: u64, state: PlaybackState) -> bool {
        let mut s = self.lock();
        if !Self::is_current(&s, id) {
            debug!(session = id, current = s.id, state = state.name(), "discarding stale transition");
            return false;
        }
        s.state = state;
        self.publish(&s);
        true
    }

    async fn extract(&self, candidate: &StreamSource, cancel: &CancellationToken) -> Result<String> {
        let service = candidate.extraction_service.as_deref().unwrap_or("generic");
        self.extraction_retry
            .run_cancellable(cancel, |_| self.extractor.extract(&candidate.link, service))
            .await
    }

    /// Headers the resolved URL needs: the candidate's own plus any rule
    /// matching the (possibly different) resolved host.
    fn headers_for(&self, candidate: &StreamSource, url: &str) -> BTreeMap<String, String> {
        let mut headers = self.header_rules.headers_for(url);
        if let Some(own) = candidate.required_headers() {
            headers.extend(own.clone());
        }
        headers
    }

    /// Select `candidate` for playback, replacing any current session.
    pub async fn select(
        &self,
        candidate: &StreamSource,
        entry: HistoryEntry,
        options: SelectOptions,
    ) -> SelectOutcome {
        let (id, cancel) = self.begin(entry);

        let (url, media_type) = if candidate.requires_extraction {
            let link = candidate.link.clone();
            if !self.transition(id, PlaybackState::Extracting { link }) {
                return SelectOutcome::Superseded { session: id };
            }
            match self.extract(candidate, &cancel).await {
                Ok(url) => {
                    let media_type = media_type_of(&url).unwrap_or(candidate.media_type);
                    (url, media_type)
                }
                Err(Error::Cancelled) => return SelectOutcome::Superseded { session: id },
                Err(e) => {
                    warn!(session = id, link = %candidate.link, error = %e, "extraction failed");
                    return self.fail(id, e.to_string());
                }
            }
        } else {
            (candidate.link.clone(), candidate.media_type)
        };

        let headers = self.headers_for(candidate, &url);
        let playable = playable_url(&self.proxy_base, &url, Some(&headers));
        let ready = PlaybackState::Ready {
            url: playable.clone(),
            media_type,
        };
        if !self.transition(id, ready) {
            return SelectOutcome::Superseded { session: id };
        }

        let limited = candidate.limited_browser_support || has_limited_browser_support(&url);
        if limited && !options.allow_limited_formats {
            info!(session = id, "format has limited browser support, awaiting confirmation");
            return SelectOutcome::FormatWarning {
                session: id,
                download_url: playable.clone(),
                url: playable,
            };
        }
        self.start_playing(id).await
    }

    /// Play a session left `Ready` by a format warning.
    pub async fn confirm(&self) -> SelectOutcome {
        let (id, ready) = {
            let s = self.lock();
            (s.id, matches!(s.state, PlaybackState::Ready { .. }))
        };
        if ready {
            self.start_playing(id).await
        } else {
            SelectOutcome::Failed {
                session: id,
                message: "no session is ready to play".into(),
            }
        }
    }

    fn is_current(s: &Session, id: u64) -> bool {
        s.id == id && !s.cancel.is_cancelled()
    }

    async fn start_playing(&self, id: u64) -> SelectOutcome {
        let (url, media_type, cancel) = {
            let s = self.lock();
            let PlaybackState::Ready { url, media_type } = s.state.clone() else {
                return SelectOutcome::Superseded { session: id };
            };
            if !Self::is_current(&s, id) {
                return SelectOutcome::Superseded { session: id };
            }
            (url, media_type, s.cancel.clone())
        };

        // Only one session drives the surface at a time.
        let _surface = tokio::select! {
            biased;
            () = cancel.cancelled() => return SelectOutcome::Superseded { session: id },
            guard = self.surface_gate.lock() => guard,
        };
        {
            let mut s = self.lock();
            if !Self::is_current(&s, id) {
                return SelectOutcome::Superseded { session: id };
            }
            s.attached = true;
        }

        let started = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = async {
                self.surface.attach(&url, media_type).await?;
                self.surface.play().await
            } => Some(result),
        };

        let entry = {
            let mut s = self.lock();
            if !Self::is_current(&s, id) {
                // A late attach may have reloaded the stale stream after
                // stop/begin released the surface; no newer session can
                // attach while the gate is held.
                self.surface.detach();
                debug!(session = id, current = s.id, "discarding late surface start");
                return SelectOutcome::Superseded { session: id };
            }
            match started {
                Some(Ok(())) => {}
                Some(Err(e)) => {
                    drop(s);
                    warn!(session = id, error = %e, "playback surface refused the stream");
                    return self.fail(id, e.to_string());
                }
                None => return SelectOutcome::Superseded { session: id },
            }
            s.state = PlaybackState::Playing {
                url: url.clone(),
                media_type,
            };
            self.publish(&s);
            s.entry.clone()
        };
        if let Some(entry) = entry {
            self.history.add_to_history(&entry);
        }
        info!(session = id, ?media_type, "playing");
        SelectOutcome::Playing { session: id, url }
    }

    fn fail(&self, id: u64, message: String) -> SelectOutcome {
        let mut s = self.lock();
        if s.id != id || s.cancel.is_cancelled() {
            return SelectOutcome::Superseded { session: id };
        }
        if s.attached {
            self.surface.detach();
            s.attached = false;
        }
        s.state = PlaybackState::Errored {
            message: message.clone(),
        };
        self.publish(&s);
        SelectOutcome::Failed { session: id, message }
    }

    /// Handle an error reported by the surface for `session`.
    ///
    /// Non-fatal manifest errors are recovered in place a bounded number of
    /// times; everything else moves the session to `Errored`.
    pub async fn report_error(&self, session: u64, fault: SurfaceFault) -> RecoveryOutcome {
        let attempt = {
            let mut s = self.lock();
            if s.id != session || s.cancel.is_cancelled() || !s.state.is_playing() {
                return RecoveryOutcome::Ignored;
            }
            if !fault.fatal && fault.manifest && s.recoveries < self.max_recoveries {
                s.recoveries += 1;
                Some(s.recoveries)
            } else {
                None
            }
        };

        let Some(attempt) = attempt else {
            self.fail(session, fault.message);
            return RecoveryOutcome::Escalated;
        };
        warn!(session, attempt, error = %fault.message, "recovering manifest session");
        match self.surface.recover().await {
            Ok(()) => RecoveryOutcome::Recovering { attempt },
            Err(e) => {
                self.fail(session, format!("{}; recovery failed: {e}", fault.message));
                RecoveryOutcome::Escalated
            }
        }
    }

    /// Stop the current session. Returns once resources are released;
    /// in-flight extraction is cancelled and its result ignored.
    pub fn stop(&self) {
        let mut s = self.lock();
        s.cancel.cancel();
        if s.attached {
            self.surface.detach();
            s.attached = false;
        }
        s.state = PlaybackState::Stopped;
        self.publish(&s);
        debug!(session = s.id, "playback stopped");
    }

    /// Forward progress to the history tracker. Returns whether it was
    /// recorded.
    pub fn update_progress(&self, position: Duration, duration: Duration) -> bool {
        let link = {
            let s = self.lock();
            if !s.state.is_playing() {
                return false;
            }
            s.entry.as_ref().map(|e| e.link.clone())
        };
        match link {
            Some(link) if !duration.is_zero() && position > MIN_RECORDED_POSITION => {
                self.history.update_progress(&link, position, duration);
                true
            }
            _ => false,
        }
    }

    /// URL to download `candidate` from. Falls back to the candidate's own
    /// link when extraction fails.
    pub async fn download_url(&self, candidate: &StreamSource) -> String {
        if !candidate.requires_extraction {
            return playable_url(&self.proxy_base, &candidate.link, candidate.required_headers());
        }
        match self.extract(candidate, &CancellationToken::new()).await {
            Ok(url) => {
                let headers = self.headers_for(candidate, &url);
                playable_url(&self.proxy_base, &url, Some(&headers))
            }
            Err(e) => {
                warn!(link = %candidate.link, error = %e, "extraction for download failed, using source link");
                candidate.link.clone()
            }
        }
    }

    /// Give `candidate` to an out-of-process player, degrading to a URL
    /// the user can open by hand.
    pub async fn handoff(&self, candidate: &StreamSource, title: &str) -> Handoff {
        let url = if candidate.requires_extraction {
            match self.extract(candidate, &CancellationToken::new()).await {
                Ok(url) => url,
                Err(e) => {
                    warn!(link = %candidate.link, error = %e, "extraction for hand-off failed");
                    return Handoff::Manual {
                        url: candidate.link.clone(),
                        hint: "Could not resolve the stream; try downloading from this page instead".into(),
                    };
                }
            }
        } else {
            candidate.link.clone()
        };
        let headers = self.headers_for(candidate, &url);
        let media_type: MediaType = media_type_of(&url).unwrap_or(candidate.media_type);

        match self.launcher.launch(&url, title, &headers).await {
            Ok(player) => Handoff::Launched { player, url },
            Err(e) => {
                debug!(error = %e, "external player unavailable, manual hand-off");
                let limited = candidate.limited_browser_support || has_limited_browser_support(&url);
                Handoff::Manual {
                    url: playable_url(&self.proxy_base, &url, Some(&headers)),
                    hint: manual_hint(media_type, limited),
                }
            }
        }
    }
}
