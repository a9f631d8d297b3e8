//! The out-of-process media surface (decoder/renderer) seen from here.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::Result;
use crate::provider::types::MediaType;

#[async_trait]
pub trait PlaybackSurface: Send + Sync + std::fmt::Debug {
    /// Load `url`; manifests start a streaming session.
    async fn attach(&self, url: &str, media_type: MediaType) -> Result<()>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    /// Reinitialise the manifest session in place after a non-fatal error.
    async fn recover(&self) -> Result<()>;

    /// Release decode resources. Called with the session lock held, so it
    /// must return promptly.
    fn detach(&self);
}

/// Error reported by the surface while playing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceFault {
    pub fatal: bool,
    /// Raised by the manifest layer (segment load, parse, codec switch).
    pub manifest: bool,
    pub message: String,
}

impl SurfaceFault {
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            fatal: true,
            manifest: false,
            message: message.into(),
        }
    }

    pub fn manifest(message: impl Into<String>) -> Self {
        Self {
            fatal: false,
            manifest: true,
            message: message.into(),
        }
    }
}

/// Surface for headless use (CLI hand-off, tests): remembers what it was
/// given and renders nothing.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    attached: Mutex<Option<(String, MediaType)>>,
}

impl HeadlessSurface {
    #[must_use]
    pub fn current(&self) -> Option<(String, MediaType)> {
        self.attached
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl PlaybackSurface for HeadlessSurface {
    async fn attach(&self, url: &str, media_type: MediaType) -> Result<()> {
        *self
            .attached
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some((url.to_string(), media_type));
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        Ok(())
    }

    async fn recover(&self) -> Result<()> {
        Ok(())
    }

    fn detach(&self) {
        self.attached
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
    }
}
