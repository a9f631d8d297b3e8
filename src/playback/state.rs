use serde::Serialize;

use crate::provider::types::MediaType;

/// Where a playback session stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum PlaybackState {
    Idle,
    /// Resolving the indirection `link`.
    Extracting { link: String },
    /// `url` is what the playback surface will request.
    Ready {
        url: String,
        #[serde(rename = "mediaType")]
        media_type: MediaType,
    },
    Playing {
        url: String,
        #[serde(rename = "mediaType")]
        media_type: MediaType,
    },
    Errored { message: String },
    Stopped,
}

impl PlaybackState {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Extracting { .. } => "extracting",
            PlaybackState::Ready { .. } => "ready",
            PlaybackState::Playing { .. } => "playing",
            PlaybackState::Errored { .. } => "errored",
            PlaybackState::Stopped => "stopped",
        }
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing { .. })
    }
}

/// State tagged with the session it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackSnapshot {
    pub session: u64,
    #[serde(flatten)]
    pub state: PlaybackState,
}
