pub mod browse;
pub mod output;
pub mod play;
pub mod serve;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use reelnab::{
    ApiClient, Config, ExtractionService, HttpExtractionService, ProviderContext, ProviderRegistry,
    StreamResolver,
};

/// Everything a command needs: local scraping, or a remote server.
pub struct Session {
    pub config: Config,
    pub registry: ProviderRegistry,
    pub resolver: StreamResolver,
    pub extractor: Arc<dyn ExtractionService>,
}

impl Session {
    pub async fn open(config: Config, remote: Option<&str>) -> Result<Self> {
        let (registry, extractor): (ProviderRegistry, Arc<dyn ExtractionService>) = match remote {
            Some(base) => {
                let api = ApiClient::new(base, &config)?;
                let registry = api
                    .registry()
                    .await
                    .with_context(|| format!("failed to list providers from {base}"))?;
                debug!(base, providers = registry.len(), "using remote server");
                (registry, Arc::new(api))
            }
            None => {
                let context = ProviderContext::new(&config)?.shared();
                let registry = ProviderRegistry::builtin(&config, Arc::clone(&context))?;
                let hosts = StreamResolver::new(registry.clone(), &config).hosts().clone();
                (registry, Arc::new(HttpExtractionService::new(context, hosts)))
            }
        };
        let resolver = StreamResolver::new(registry.clone(), &config);
        Ok(Self {
            config,
            registry,
            resolver,
            extractor,
        })
    }
}
