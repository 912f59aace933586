//! Kubernetes service discovery implementation
//!
//! Resolves a service name to the cluster URL of the matching service in the
//! current namespace. Pods and services are selected by `{label_name}={service_name}`;
//! a URL is only produced when at least one selected pod is running and ready.
//!
//! Two caches sit in front of the cluster: one for the current namespace and one
//! for resolved URLs. Either is disabled by a zero TTL.

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::{
    DiscoveryError, DiscoveryProvider, Result,
    cache::ProviderCache,
    cluster::{
        ClusterApi, ClusterConnector, InClusterConnector, NamespaceSource,
        ServiceAccountNamespace,
    },
    config::KubernetesConfig,
};

const CURRENT_NAMESPACE_CACHE_KEY: &str = "CURRENT_NAME_SPACE_CACHE";
const SERVICE_URL_CACHE_PREFIX: &str = "SERVICE_URL_CACHE_";

/// Kubernetes service discovery
#[derive(Debug)]
pub struct KubernetesDiscoveryProvider {
    namespace_cache: ProviderCache<String>,
    url_cache: ProviderCache<String>,
    label_name: String,
    call_timeout: Duration,
    namespace_source: Arc<dyn NamespaceSource>,
    connector: Arc<dyn ClusterConnector>,
    /// Built on first use and reused afterwards
    cluster: OnceCell<Arc<dyn ClusterApi>>,
}

impl KubernetesDiscoveryProvider {
    /// Create a provider using the service-account namespace file and in-cluster credentials
    pub fn new(config: &KubernetesConfig) -> Self {
        Self::with_collaborators(
            config,
            Arc::new(ServiceAccountNamespace::new(&config.namespace_path)),
            Arc::new(InClusterConnector),
        )
    }

    /// Create a provider with explicit namespace and cluster collaborators
    pub fn with_collaborators(
        config: &KubernetesConfig,
        namespace_source: Arc<dyn NamespaceSource>,
        connector: Arc<dyn ClusterConnector>,
    ) -> Self {
        Self {
            namespace_cache: ProviderCache::new(config.namespace_cache_duration()),
            url_cache: ProviderCache::new(config.url_cache_duration()),
            label_name: config.effective_label_name().to_string(),
            call_timeout: config.call_timeout(),
            namespace_source,
            connector,
            cluster: OnceCell::new(),
        }
    }

    /// Label name pods and services are selected by
    pub fn label_name(&self) -> &str {
        &self.label_name
    }

    fn label_selector(&self, service_name: &str) -> String {
        format!("{}={}", self.label_name, service_name)
    }

    async fn with_deadline<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(DiscoveryError::Timeout(format!(
                "{} exceeded {}ms",
                operation,
                self.call_timeout.as_millis()
            ))),
        }
    }

    async fn current_namespace(&self) -> Result<String> {
        if let Some(namespace) = self.namespace_cache.get(CURRENT_NAMESPACE_CACHE_KEY).await {
            return Ok(namespace);
        }

        let namespace = self
            .with_deadline("read namespace", self.namespace_source.read_namespace())
            .await
            .and_then(|namespace| {
                if namespace.is_empty() {
                    Err(DiscoveryError::NamespaceUnavailable("namespace is empty".to_string()))
                } else {
                    Ok(namespace)
                }
            })
            .inspect_err(|e| warn!(error = %e, "Kubernetes not available"))?;

        self.namespace_cache
            .insert(CURRENT_NAMESPACE_CACHE_KEY.to_string(), namespace.clone())
            .await;
        Ok(namespace)
    }

    async fn cluster(&self) -> Result<&Arc<dyn ClusterApi>> {
        self.cluster
            .get_or_try_init(|| self.with_deadline("connect to cluster", self.connector.connect()))
            .await
            .inspect_err(|e| warn!(error = %e, "Failed to create Kubernetes client"))
    }
}

fn url_cache_key(service_name: &str) -> String {
    format!("{}{}", SERVICE_URL_CACHE_PREFIX, service_name)
}

#[async_trait]
impl DiscoveryProvider for KubernetesDiscoveryProvider {
    async fn discover_urls(&self, service_name: &str) -> Result<Vec<String>> {
        if let Some(url) = self.url_cache.get(&url_cache_key(service_name)).await {
            debug!(service_name = %service_name, url = %url, "Kubernetes URL cache hit");
            return Ok(vec![url]);
        }

        let namespace = self.current_namespace().await?;
        debug!(namespace = %namespace, "Current Kubernetes namespace");

        let cluster = self.cluster().await?;
        let selector = self.label_selector(service_name);

        let pods = self.with_deadline("list pods", cluster.list_pods(&namespace, &selector)).await?;
        let ready_pods: Vec<&str> = pods
            .iter()
            .filter(|pod| pod.is_running_and_ready())
            .map(|pod| pod.name.as_str())
            .collect();

        if ready_pods.is_empty() {
            debug!(
                service_name = %service_name,
                namespace = %namespace,
                selector = %selector,
                pod_count = pods.len(),
                "No running and ready pods"
            );
            return Err(DiscoveryError::NoReadyPods(format!("{} in {}", selector, namespace)));
        }

        let services = self
            .with_deadline("list services", cluster.list_services(&namespace, &selector))
            .await?;

        let Some(service) = services.first() else {
            return Err(DiscoveryError::ServiceNotFound(format!("{} in {}", selector, namespace)));
        };

        let url = service.url().ok_or_else(|| {
            DiscoveryError::ServiceNotFound(format!(
                "service {} in {} has no cluster IP or ports",
                service.name, namespace
            ))
        })?;

        info!(
            service_name = %service_name,
            namespace = %namespace,
            ready_pods = ready_pods.len(),
            url = %url,
            "Resolved Kubernetes service"
        );

        self.url_cache.insert(url_cache_key(service_name), url.clone()).await;
        Ok(vec![url])
    }
}
