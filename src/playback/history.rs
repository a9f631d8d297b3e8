use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Progress below this is not worth remembering.
pub const MIN_RECORDED_POSITION: Duration = Duration::from_secs(5);

/// What was watched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub provider: String,
    pub title: String,
    /// Content link the entry is keyed by.
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Watch-history tracker. Persistence is the implementor's business.
pub trait WatchHistory: Send + Sync + std::fmt::Debug {
    fn add_to_history(&self, entry: &HistoryEntry);

    fn update_progress(&self, link: &str, position: Duration, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHistory;

impl WatchHistory for NoopHistory {
    fn add_to_history(&self, _entry: &HistoryEntry) {}

    fn update_progress(&self, _link: &str, _position: Duration, _duration: Duration) {}
}

/// One persisted history record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    #[serde(flatten)]
    pub entry: HistoryEntry,
    pub last_watched: DateTime<Utc>,
    #[serde(default)]
    pub position_secs: u64,
    #[serde(default)]
    pub duration_secs: u64,
}

/// History kept as a JSON array on disk, most recent first.
///
/// Write failures are logged and otherwise ignored; history must never
/// interrupt playback.
#[derive(Debug)]
pub struct FileHistory {
    path: PathBuf,
    records: Mutex<Vec<HistoryRecord>>,
}

impl FileHistory {
    /// Most entries kept on disk.
    pub const LIMIT: usize = 200;

    /// Open `path`, starting empty if it is missing or unreadable.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = std::fs::read_to_string(&path)
            .ok()
            .and_then(|raw| match serde_json::from_str(&raw) {
                Ok(records) => Some(records),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ignoring corrupt history file");
                    None
                }
            })
            .unwrap_or_default();
        Self {
            path,
            records: Mutex::new(records),
        }
    }

    /// `<data dir>/reelnab/history.json`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reelnab")
            .join("history.json")
    }

    #[must_use]
    pub fn records(&self) -> Vec<HistoryRecord> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<HistoryRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, records: &[HistoryRecord]) {
        let result = self
            .path
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|()| {
                let json = serde_json::to_string_pretty(records)?;
                std::fs::write(&self.path, json)
            });
        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "failed to save history");
        }
    }
}

impl WatchHistory for FileHistory {
    fn add_to_history(&self, entry: &HistoryEntry) {
        let mut records = self.lock();
        let previous = records
            .iter()
            .position(|r| r.entry.link == entry.link)
            .map(|i| records.remove(i));
        let (position_secs, duration_secs) =
            previous.map_or((0, 0), |r| (r.position_secs, r.duration_secs));
        records.insert(
            0,
            HistoryRecord {
                entry: entry.clone(),
                last_watched: Utc::now(),
                position_secs,
                duration_secs,
            },
        );
        records.truncate(Self::LIMIT);
        debug!(link = %entry.link, "history entry recorded");
        self.persist(&records);
    }

    fn update_progress(&self, link: &str, position: Duration, duration: Duration) {
        let mut records = self.lock();
        let Some(record) = records.iter_mut().find(|r| r.entry.link == link) else {
            return;
        };
        record.position_secs = position.as_secs();
        record.duration_secs = duration.as_secs();
        record.last_watched = Utc::now();
        self.persist(&records);
    }
}
