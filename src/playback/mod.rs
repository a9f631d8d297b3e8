//! Playback orchestration.
//!
//! A session moves through
//! `Idle → Extracting → Ready → Playing`, with `Errored` reachable from any
//! working state and `Stopped` from all of them. Extraction happens only for
//! the candidate the user picked, retried on transient failures within the
//! configured attempt budget.
//!
//! The decoder/renderer ([`PlaybackSurface`]), the watch-history tracker
//! ([`WatchHistory`]) and external players ([`PlayerLauncher`]) are
//! collaborators behind traits.

pub mod external;
pub mod history;
pub mod orchestrator;
pub mod state;
pub mod surface;

pub use external::{ExternalPlayers, Handoff, NoPlayer, PlayerLauncher};
pub use history::{FileHistory, HistoryEntry, HistoryRecord, NoopHistory, WatchHistory};
pub use orchestrator::{PlaybackOrchestrator, RecoveryOutcome, SelectOptions, SelectOutcome};
pub use state::{PlaybackSnapshot, PlaybackState};
pub use surface::{HeadlessSurface, PlaybackSurface, SurfaceFault};
