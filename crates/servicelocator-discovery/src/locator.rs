//! Environment-variable locator
//!
//! URLs for a service are read from `SERVICELOCATOR_{service_name}` as a
//! comma-separated list. An unset or empty variable yields a single empty URL
//! unless the provider is configured to skip empty entries.

use std::{collections::HashMap, fmt};

use async_trait::async_trait;
use tracing::debug;

use crate::{DiscoveryError, DiscoveryProvider, Result, cache::ProviderCache, config::LocatorConfig};

/// Prefix of the environment variable holding a service's URLs
pub const ENV_PREFIX: &str = "SERVICELOCATOR_";

const ENV_SERVICE_URL_CACHE_PREFIX: &str = "ENV_SERVICE_URL_CACHE_";

/// Read access to environment variables
pub trait EnvSource: Send + Sync + fmt::Debug {
    fn var(&self, key: &str) -> Option<String>;
}

/// The process environment
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// A fixed set of variables
#[derive(Debug, Default, Clone)]
pub struct StaticEnv {
    vars: HashMap<String, String>,
}

impl StaticEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl EnvSource for StaticEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

/// Environment locator discovery
#[derive(Debug)]
pub struct LocatorDiscoveryProvider {
    url_cache: ProviderCache<Vec<String>>,
    skip_empty: bool,
    env: Box<dyn EnvSource>,
}

impl LocatorDiscoveryProvider {
    /// Create a locator reading the process environment
    pub fn new(config: &LocatorConfig) -> Self {
        Self::with_env(config, Box::new(ProcessEnv))
    }

    pub fn with_env(config: &LocatorConfig, env: Box<dyn EnvSource>) -> Self {
        Self {
            url_cache: ProviderCache::new(config.url_cache_duration()),
            skip_empty: config.skip_empty,
            env,
        }
    }

    fn read_urls(&self, service_name: &str) -> Vec<String> {
        let value = self.env.var(&env_key(service_name)).unwrap_or_default();
        value
            .split(',')
            .filter(|url| !self.skip_empty || !url.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Name of the variable consulted for a service
pub fn env_key(service_name: &str) -> String {
    format!("{}{}", ENV_PREFIX, service_name)
}

fn url_cache_key(service_name: &str) -> String {
    format!("{}{}", ENV_SERVICE_URL_CACHE_PREFIX, service_name)
}

#[async_trait]
impl DiscoveryProvider for LocatorDiscoveryProvider {
    async fn discover_urls(&self, service_name: &str) -> Result<Vec<String>> {
        let cache_key = url_cache_key(service_name);
        if let Some(urls) = self.url_cache.get(&cache_key).await {
            if !urls.is_empty() {
                debug!(service_name = %service_name, count = urls.len(), "Locator URL cache hit");
                return Ok(urls);
            }
        }

        let urls = self.read_urls(service_name);
        if urls.is_empty() {
            return Err(DiscoveryError::LocatorNotFound(env_key(service_name)));
        }

        debug!(
            service_name = %service_name,
            count = urls.len(),
            "Read locator URLs from environment"
        );

        self.url_cache.insert(cache_key, urls.clone()).await;
        Ok(urls)
    }
}
