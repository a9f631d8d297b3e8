//! Error taxonomy shared by adapters, the resolution engine and playback.
//!
//! Absence of episodes or streams is never an error: empty results are
//! plain `Ok(vec![])`. Everything here is either transient (retryable) or a
//! definitive failure scoped to a single call or candidate.

use thiserror::Error;

/// Errors surfaced by the pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Connection, DNS or body-read failure. Retryable.
    #[error("network failure: {0}")]
    Network(String),

    /// Upstream answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Upstream resource does not exist. Never retried.
    #[error("not found: {0}")]
    NotFound(String),

    /// Markup or payload could not be interpreted.
    #[error("parse failure: {0}")]
    Parse(String),

    /// An indirection link could not be turned into a media URL.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// The playback surface rejected or lost the media.
    #[error("playback failed: {0}")]
    Playback(String),

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("timed out after {0} ms")]
    Timeout(u64),

    /// The owning session was stopped or superseded.
    #[error("cancelled")]
    Cancelled,
}

impl Error {
    /// Whether a retry has a chance of succeeding.
    ///
    /// Only network-layer failures and throttling/server statuses qualify;
    /// content errors (not found, parse, extraction) never do.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Network(_) | Error::Timeout(_) => true,
            Error::Status { status, .. } => matches!(status, 408 | 425 | 429 | 500..=599),
            _ => false,
        }
    }

    pub(crate) fn from_status(status: reqwest::StatusCode, url: &str) -> Self {
        if status == reqwest::StatusCode::NOT_FOUND {
            Error::NotFound(url.to_string())
        } else {
            Error::Status {
                status: status.as_u16(),
                url: url.to_string(),
            }
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            let url = err.url().map(ToString::to_string).unwrap_or_default();
            return Error::from_status(status, &url);
        }
        if err.is_decode() {
            return Error::Parse(err.to_string());
        }
        Error::Network(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidInput(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
