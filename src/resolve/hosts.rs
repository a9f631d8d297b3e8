use std::collections::BTreeMap;

use url::Url;

use crate::config::{HeaderRuleConfig, IndirectionHostConfig};

/// Known indirection hosts and the extraction service that resolves each.
const BUILTIN_INDIRECTION: &[(&str, &str)] = &[
    ("hubcloud.one", "hubcloud"),
    ("hubcloud.ink", "hubcloud"),
    ("hubcloud.art", "hubcloud"),
    ("hubcloud.bz", "hubcloud"),
    ("gdflix.dev", "gdflix"),
    ("m4ulinks.com", "generic"),
];

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(str::to_ascii_lowercase)
}

/// Domain → extraction service table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndirectionHosts {
    entries: Vec<(String, String)>,
}

impl Default for IndirectionHosts {
    fn default() -> Self {
        Self {
            entries: BUILTIN_INDIRECTION
                .iter()
                .map(|(d, s)| ((*d).to_string(), (*s).to_string()))
                .collect(),
        }
    }
}

impl IndirectionHosts {
    /// Built-ins plus configured entries; configured entries win.
    #[must_use]
    pub fn with_config(extra: &[IndirectionHostConfig]) -> Self {
        let mut hosts = Self::default();
        for entry in extra.iter().rev() {
            hosts.entries.insert(
                0,
                (
                    entry.domain.trim().to_ascii_lowercase(),
                    entry.service.trim().to_string(),
                ),
            );
        }
        hosts
    }

    /// Extraction service id for `url`, if its host is an indirection host.
    #[must_use]
    pub fn service_for(&self, url: &str) -> Option<&str> {
        let host = host_of(url)?;
        self.entries
            .iter()
            .find(|(domain, _)| host_matches(&host, domain))
            .map(|(_, service)| service.as_str())
    }
}

/// Domain → required request headers (referrer-locked CDNs and the like).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderRules {
    rules: Vec<(String, BTreeMap<String, String>)>,
}

impl HeaderRules {
    #[must_use]
    pub fn from_config(rules: &[HeaderRuleConfig]) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|r| (r.domain.trim().to_ascii_lowercase(), r.headers.clone()))
                .collect(),
        }
    }

    /// Merged headers of every rule matching `url`'s host.
    #[must_use]
    pub fn headers_for(&self, url: &str) -> BTreeMap<String, String> {
        let Some(host) = host_of(url) else {
            return BTreeMap::new();
        };
        self.rules
            .iter()
            .filter(|(domain, _)| host_matches(&host, domain))
            .flat_map(|(_, headers)| headers.clone())
            .collect()
    }
}
