//! Multi-provider discovery
//!
//! [`DiscoveryService`] asks every registered provider for candidate URLs,
//! concatenates the results in registration order and lets a
//! [`SelectionPolicy`] pick one. A failing provider is logged and contributes
//! no candidates; callers only ever see a URL or [`DiscoveryError::NotFound`].

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::{
    DiscoveryConfig, DiscoveryError, DiscoveryProvider, KUBERNETES_PROVIDER, LOCATOR_PROVIDER,
    Result, UrlDiscovery,
    balancer::{FirstCandidate, SelectionPolicy},
    kubernetes::KubernetesDiscoveryProvider,
    locator::LocatorDiscoveryProvider,
    metrics::DiscoveryMetrics,
};

/// Resolves service names across an ordered set of providers
#[derive(Debug)]
pub struct DiscoveryService {
    providers: Vec<(String, Arc<dyn DiscoveryProvider>)>,
    policy: Box<dyn SelectionPolicy>,
    metrics: Option<DiscoveryMetrics>,
}

impl DiscoveryService {
    /// Create the standard service: Kubernetes first, then the environment locator
    pub fn new(config: &DiscoveryConfig) -> Self {
        let kubernetes = KubernetesDiscoveryProvider::new(&config.kubernetes);
        let locator = LocatorDiscoveryProvider::new(&config.locator);

        Self::builder()
            .provider(KUBERNETES_PROVIDER, Arc::new(kubernetes))
            .provider(LOCATOR_PROVIDER, Arc::new(locator))
            .build()
    }

    pub fn builder() -> DiscoveryServiceBuilder {
        DiscoveryServiceBuilder::default()
    }

    /// Look up a single registered provider by name
    pub fn provider(&self, name: &str) -> Result<Arc<dyn DiscoveryProvider>> {
        self.providers
            .iter()
            .find(|(registered, _)| registered == name)
            .map(|(_, provider)| provider.clone())
            .ok_or_else(|| DiscoveryError::ProviderNotFound(name.to_string()))
    }

    /// Provider names in query order
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Gather candidate URLs from every provider
    ///
    /// Providers are queried concurrently; the result keeps registration order.
    pub async fn find_candidates(&self, service_name: &str) -> Vec<String> {
        let lookups = self.providers.iter().map(|(name, provider)| async move {
            (name.as_str(), provider.discover_urls(service_name).await)
        });

        let mut candidates = Vec::new();
        for (name, result) in join_all(lookups).await {
            if let Some(metrics) = &self.metrics {
                metrics.record_lookup(name, result.is_ok());
            }

            match result {
                Ok(urls) => {
                    debug!(
                        service_name = %service_name,
                        provider = %name,
                        count = urls.len(),
                        "Provider returned candidates"
                    );
                    candidates.extend(urls);
                },
                Err(e) if e.is_not_found() => {
                    info!(
                        service_name = %service_name,
                        provider = %name,
                        error = %e,
                        "Error in discovery"
                    );
                },
                Err(e) => {
                    warn!(
                        service_name = %service_name,
                        provider = %name,
                        error = %e,
                        "Error in discovery"
                    );
                },
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.set_candidate_count(candidates.len());
        }

        candidates
    }
}

#[async_trait]
impl UrlDiscovery for DiscoveryService {
    async fn find_url(&self, service_name: &str) -> Result<String> {
        let candidates = self.find_candidates(service_name).await;

        let url = self.policy.select_one(&candidates).inspect_err(|_| {
            if let Some(metrics) = &self.metrics {
                metrics.record_not_found();
            }
            warn!(service_name = %service_name, "No provider found a URL");
        })?;

        info!(
            service_name = %service_name,
            url = %url,
            candidate_count = candidates.len(),
            "Discovered service URL"
        );

        Ok(url)
    }
}

/// Builder for [`DiscoveryService`] with custom providers and selection policy
#[derive(Debug, Default)]
pub struct DiscoveryServiceBuilder {
    providers: Vec<(String, Arc<dyn DiscoveryProvider>)>,
    policy: Option<Box<dyn SelectionPolicy>>,
    metrics: Option<DiscoveryMetrics>,
}

impl DiscoveryServiceBuilder {
    /// Register a provider; re-registering a name replaces it in place
    pub fn provider(
        mut self,
        name: impl Into<String>,
        provider: Arc<dyn DiscoveryProvider>,
    ) -> Self {
        let name = name.into();
        match self.providers.iter_mut().find(|(registered, _)| *registered == name) {
            Some(entry) => entry.1 = provider,
            None => self.providers.push((name, provider)),
        }
        self
    }

    /// Replace the default first-candidate policy
    pub fn policy(mut self, policy: Box<dyn SelectionPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn metrics(mut self, metrics: DiscoveryMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> DiscoveryService {
        DiscoveryService {
            providers: self.providers,
            policy: self.policy.unwrap_or_else(|| Box::new(FirstCandidate)),
            metrics: self.metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use prometheus::Registry;

    use super::*;
    use crate::balancer::RoundRobin;

    #[derive(Debug)]
    struct FixedProvider {
        result: std::result::Result<Vec<String>, String>,
        calls: AtomicUsize,
    }

    impl FixedProvider {
        fn urls(urls: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(urls.iter().map(|u| u.to_string()).collect()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self { result: Err(message.to_string()), calls: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl DiscoveryProvider for FixedProvider {
        async fn discover_urls(&self, _service_name: &str) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map_err(DiscoveryError::ClusterList)
        }
    }

    #[tokio::test]
    async fn test_failed_provider_is_skipped() {
        let service = DiscoveryService::builder()
            .provider("a", FixedProvider::failing("connection refused"))
            .provider("b", FixedProvider::urls(&["http://x/"]))
            .build();

        assert_eq!(service.find_url("billing").await.unwrap(), "http://x");
    }

    #[tokio::test]
    async fn test_all_providers_fail() {
        let service = DiscoveryService::builder()
            .provider("a", FixedProvider::failing("boom"))
            .provider("b", FixedProvider::failing("boom"))
            .build();

        assert!(matches!(service.find_url("billing").await, Err(DiscoveryError::NotFound)));
    }

    #[tokio::test]
    async fn test_empty_results_are_not_found() {
        let service = DiscoveryService::builder().provider("a", FixedProvider::urls(&[])).build();

        assert!(matches!(service.find_url("billing").await, Err(DiscoveryError::NotFound)));
    }

    #[tokio::test]
    async fn test_no_providers_is_not_found() {
        let service = DiscoveryService::builder().build();

        assert!(matches!(service.find_url("billing").await, Err(DiscoveryError::NotFound)));
    }

    #[tokio::test]
    async fn test_candidates_follow_registration_order() {
        let first = FixedProvider::urls(&["http://a", "http://b"]);
        let second = FixedProvider::urls(&["http://c"]);
        let service = DiscoveryService::builder()
            .provider("first", first.clone())
            .provider("second", second.clone())
            .build();

        let candidates = service.find_candidates("billing").await;

        assert_eq!(candidates, vec!["http://a", "http://b", "http://c"]);
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.find_url("billing").await.unwrap(), "http://a");
    }

    #[tokio::test]
    async fn test_custom_policy() {
        let service = DiscoveryService::builder()
            .provider("a", FixedProvider::urls(&["http://a/", "http://b/"]))
            .policy(Box::new(RoundRobin::new()))
            .build();

        assert_eq!(service.find_url("billing").await.unwrap(), "http://a");
        assert_eq!(service.find_url("billing").await.unwrap(), "http://b");
    }

    #[test]
    fn test_provider_lookup() {
        let service = DiscoveryService::builder()
            .provider("locator", FixedProvider::urls(&["http://a"]))
            .build();

        assert!(service.provider("locator").is_ok());
        assert!(matches!(
            service.provider("consul"),
            Err(DiscoveryError::ProviderNotFound(ref name)) if name == "consul"
        ));
    }

    #[test]
    fn test_reregistering_replaces_in_place() {
        let service = DiscoveryService::builder()
            .provider("a", FixedProvider::urls(&["http://a"]))
            .provider("b", FixedProvider::urls(&["http://b"]))
            .provider("a", FixedProvider::urls(&["http://a2"]))
            .build();

        assert_eq!(service.provider_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_standard_providers() {
        let service = DiscoveryService::new(&DiscoveryConfig::default());

        assert_eq!(service.provider_names(), vec![KUBERNETES_PROVIDER, LOCATOR_PROVIDER]);
        assert!(service.provider(KUBERNETES_PROVIDER).is_ok());
        assert!(service.provider(LOCATOR_PROVIDER).is_ok());
    }

    #[tokio::test]
    async fn test_metrics_recorded() {
        let registry = Registry::new();
        let metrics = DiscoveryMetrics::new(&registry).unwrap();
        let service = DiscoveryService::builder()
            .provider("a", FixedProvider::failing("boom"))
            .provider("b", FixedProvider::urls(&["http://x", "http://y"]))
            .metrics(metrics.clone())
            .build();

        service.find_url("billing").await.unwrap();

        assert_eq!(metrics.provider_lookups.with_label_values(&["a", "error"]).get(), 1);
        assert_eq!(metrics.provider_lookups.with_label_values(&["b", "success"]).get(), 1);
        assert_eq!(metrics.last_candidate_count.get(), 2);
        assert_eq!(metrics.not_found.get(), 0);

        let empty = DiscoveryService::builder()
            .provider("a", FixedProvider::failing("boom"))
            .metrics(metrics.clone())
            .build();
        assert!(empty.find_url("billing").await.is_err());
        assert_eq!(metrics.not_found.get(), 1);
    }
}
