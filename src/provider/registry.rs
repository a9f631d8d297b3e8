use std::sync::Arc;

use tracing::info;

use super::bootstrap;
use super::site::SiteAdapter;
use super::sites;
use super::types::ProviderDescriptor;
use super::ProviderAdapter;
use crate::config::Config;
use crate::context::ProviderContext;
use crate::error::{Error, Result};

/// The session's adapters, looked up by name.
///
/// Registration order is display order. Disabled providers stay listed but
/// are skipped by [`ProviderRegistry::active`] and [`ProviderRegistry::get`].
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new(adapters: Vec<Arc<dyn ProviderAdapter>>) -> Self {
        Self { adapters }
    }

    /// Built-in site profiles with `[[providers]]` overrides applied.
    pub fn builtin(config: &Config, context: Arc<ProviderContext>) -> Result<Self> {
        let mut adapters: Vec<Arc<dyn ProviderAdapter>> = Vec::new();
        for mut profile in sites::builtin() {
            let overrides = config.provider_override(&profile.name);
            if let Some(o) = overrides {
                if let Some(display_name) = &o.display_name {
                    profile.display_name.clone_from(display_name);
                }
                if let Some(base_url) = &o.base_url {
                    profile.base_url.clone_from(base_url);
                }
            }
            let session = overrides.and_then(|o| o.session.as_ref());
            let disabled = overrides.and_then(|o| o.disabled).unwrap_or(false);
            let adapter = SiteAdapter::with_bootstrap(
                profile,
                Arc::clone(&context),
                bootstrap::from_config(session)?,
            )?
            .disabled(disabled);
            adapters.push(Arc::new(adapter));
        }
        info!(count = adapters.len(), "providers registered");
        Ok(Self { adapters })
    }

    #[must_use]
    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        self.adapters.iter().map(|a| a.descriptor().clone()).collect()
    }

    /// Providers that take part in aggregation and routing.
    pub fn active(&self) -> impl Iterator<Item = &Arc<dyn ProviderAdapter>> {
        self.adapters.iter().filter(|a| !a.descriptor().disabled)
    }

    /// Active adapter by case-insensitive name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn ProviderAdapter>> {
        self.active()
            .find(|a| a.name().eq_ignore_ascii_case(name.trim()))
            .cloned()
            .ok_or_else(|| Error::UnknownProvider(name.to_string()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::chrome_profile;

    fn registry(toml_str: &str) -> ProviderRegistry {
        let config = Config::from_toml(toml_str).unwrap();
        let context = ProviderContext::with_profile(&config, &chrome_profile())
            .unwrap()
            .shared();
        ProviderRegistry::builtin(&config, context).unwrap()
    }

    #[test]
    fn builtins_are_registered_in_order() {
        let names: Vec<_> = registry("")
            .descriptors()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, ["joya9tv", "movies4u", "zeefliz"]);
    }

    #[test]
    fn overrides_apply_and_disabled_providers_are_hidden() {
        let registry = registry(
            r#"
[[providers]]
name = "movies4u"
base_url = "https://m4u.example/"
display_name = "M4U"

[[providers]]
name = "zeefliz"
disabled = true
"#,
        );
        let m4u = registry.get("MOVIES4U").unwrap();
        assert_eq!(m4u.descriptor().base_url, "https://m4u.example");
        assert_eq!(m4u.descriptor().display_name, "M4U");
        assert_eq!(registry.active().count(), 2);
        assert_eq!(registry.len(), 3);
        assert!(matches!(registry.get("zeefliz"), Err(Error::UnknownProvider(_))));
    }

    #[test]
    fn unknown_provider_is_an_error() {
        assert!(matches!(
            registry("").get("nope"),
            Err(Error::UnknownProvider(name)) if name == "nope"
        ));
    }
}
