//! Configuration loaded from `~/.config/reelnab/config.toml`.
//!
//! Every section is optional; a missing file means defaults. Provider
//! entries override the built-in descriptors by name and are the only
//! place session bootstrap cookies come from.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:3001"
//!
//! [retry]
//! max_attempts = 3
//! base_delay_ms = 500
//!
//! [[providers]]
//! name = "movies4u"
//! base_url = "https://movies4u.example"
//! session = { cookie = "cf_clearance=...; xla=s4t" }
//!
//! [[indirection_hosts]]
//! domain = "hubcloud.ink"
//! service = "hubcloud"
//!
//! [[header_rules]]
//! domain = "cdn.example"
//! headers = { Referer = "https://movies4u.example/" }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::retry::RetryPolicy;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "REELNAB_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub http: HttpConfig,
    pub retry: RetryPolicy,
    pub search: SearchConfig,
    pub playback: PlaybackConfig,
    pub providers: Vec<ProviderOverride>,
    pub indirection_hosts: Vec<IndirectionHostConfig>,
    pub header_rules: Vec<HeaderRuleConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Externally reachable base URL, used when building proxy routes.
    /// Defaults to `http://{bind}`.
    pub public_base: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3001".to_string(),
            public_base: None,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn public_base(&self) -> String {
        self.public_base
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.bind))
            .trim_end_matches('/')
            .to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// A provider slower than this is reported as timed out.
    pub provider_timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider_timeout_secs: 15,
        }
    }
}

impl SearchConfig {
    #[must_use]
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub max_extraction_attempts: u32,
    pub max_manifest_recoveries: u32,
    /// External players tried in order during hand-off.
    pub external_players: Vec<String>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            max_extraction_attempts: 3,
            max_manifest_recoveries: 2,
            external_players: vec!["mpv".to_string(), "vlc".to_string()],
        }
    }
}

/// Overrides for one built-in provider, matched by `name`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderOverride {
    pub name: String,
    pub display_name: Option<String>,
    pub base_url: Option<String>,
    pub disabled: Option<bool>,
    pub session: Option<SessionConfig>,
}

/// How a provider's session passes anti-bot checks.
///
/// A static cookie expires silently; `warmup_url` lets the cookie store
/// pick up fresh cookies from a landing page instead.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionConfig {
    pub cookie: Option<String>,
    pub warmup_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndirectionHostConfig {
    pub domain: String,
    pub service: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeaderRuleConfig {
    pub domain: String,
    pub headers: BTreeMap<String, String>,
}

impl Config {
    /// Load from `path`, `$REELNAB_CONFIG`, or the default location.
    ///
    /// Returns defaults if no file exists at the resolved location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => std::env::var_os(CONFIG_ENV).map_or_else(config_path, PathBuf::from),
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("invalid TOML in {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    #[must_use]
    pub fn provider_override(&self, name: &str) -> Option<&ProviderOverride> {
        self.providers.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

/// Default config file location.
fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reelnab")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:3001");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.playback.max_manifest_recoveries, 2);
        assert!(config.providers.is_empty());
    }

    #[test]
    fn parses_provider_overrides_and_rules() {
        let toml_str = r#"
[server]
bind = "0.0.0.0:8080"
public_base = "https://reel.example/"

[retry]
max_attempts = 5
base_delay_ms = 100

[[providers]]
name = "movies4u"
base_url = "https://m4u.example"
session = { cookie = "xla=s4t" }

[[providers]]
name = "zeefliz"
disabled = true

[[indirection_hosts]]
domain = "hubcloud.ink"
service = "hubcloud"

[[header_rules]]
domain = "cdn.example"
headers = { Referer = "https://m4u.example/" }
"#;
        let config = Config::from_toml(toml_str).unwrap();
        assert_eq!(config.server.public_base(), "https://reel.example");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay, Duration::from_millis(100));
        let m4u = config.provider_override("Movies4u").unwrap();
        assert_eq!(m4u.base_url.as_deref(), Some("https://m4u.example"));
        assert_eq!(
            m4u.session.as_ref().and_then(|s| s.cookie.as_deref()),
            Some("xla=s4t")
        );
        assert_eq!(config.provider_override("zeefliz").unwrap().disabled, Some(true));
        assert_eq!(config.indirection_hosts[0].service, "hubcloud");
        assert_eq!(config.header_rules[0].headers["Referer"], "https://m4u.example/");
    }

    #[test]
    fn public_base_defaults_to_bind() {
        let server = ServerConfig::default();
        assert_eq!(server.public_base(), "http://127.0.0.1:3001");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/reelnab.toml"))).unwrap();
        assert_eq!(config.search.provider_timeout_secs, 15);
    }
}
