//! Kubernetes API access
//!
//! The provider talks to the cluster through three narrow seams:
//!
//! - [`NamespaceSource`] reads the namespace the process runs in
//! - [`ClusterConnector`] builds an API client from ambient credentials
//! - [`ClusterApi`] lists pods and services by label selector
//!
//! The production implementations are backed by `kube`; tests substitute fakes.

use std::{fmt, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Pod, Service};
use kube::{Api, Client, Config, api::ListParams};
use tracing::debug;

use crate::{DiscoveryError, Result};

/// Pod phase reported for running pods
pub const POD_RUNNING: &str = "Running";
/// Condition type reported when a pod is ready to serve
pub const POD_READY: &str = "Ready";
/// Condition status for a satisfied condition
pub const CONDITION_TRUE: &str = "True";

/// A pod condition (type, status)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodConditionInfo {
    pub condition_type: String,
    pub status: String,
}

/// The parts of a pod the provider inspects
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PodInfo {
    pub name: String,
    pub phase: String,
    pub conditions: Vec<PodConditionInfo>,
}

impl PodInfo {
    /// Running and carrying a `Ready=True` condition
    pub fn is_running_and_ready(&self) -> bool {
        self.phase == POD_RUNNING
            && self
                .conditions
                .iter()
                .any(|c| c.condition_type == POD_READY && c.status == CONDITION_TRUE)
    }
}

/// A declared service port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePortInfo {
    pub name: String,
    pub port: i32,
}

/// The parts of a service the provider inspects
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServiceInfo {
    pub name: String,
    pub cluster_ip: Option<String>,
    pub ports: Vec<ServicePortInfo>,
}

impl ServiceInfo {
    /// `{portName}://{clusterIP}:{port}` built from the first declared port
    pub fn url(&self) -> Option<String> {
        let port = self.ports.first()?;
        let cluster_ip = self.cluster_ip.as_deref()?;
        Some(format!("{}://{}:{}", port.name, cluster_ip, port.port))
    }
}

/// Reads the namespace the process is running in
#[async_trait]
pub trait NamespaceSource: Send + Sync + fmt::Debug {
    async fn read_namespace(&self) -> Result<String>;
}

/// Reads the namespace from the service-account file mounted into the container
#[derive(Debug, Clone)]
pub struct ServiceAccountNamespace {
    path: PathBuf,
}

impl ServiceAccountNamespace {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl NamespaceSource for ServiceAccountNamespace {
    async fn read_namespace(&self) -> Result<String> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            DiscoveryError::NamespaceUnavailable(format!("{}: {}", self.path.display(), e))
        })?;
        let namespace = contents.trim();
        if namespace.is_empty() {
            return Err(DiscoveryError::NamespaceUnavailable(format!(
                "{} is empty",
                self.path.display()
            )));
        }
        Ok(namespace.to_string())
    }
}

/// Lists cluster objects matching a label selector
#[async_trait]
pub trait ClusterApi: Send + Sync + fmt::Debug {
    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<PodInfo>>;

    async fn list_services(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<ServiceInfo>>;
}

/// Builds a [`ClusterApi`] from ambient credentials
#[async_trait]
pub trait ClusterConnector: Send + Sync + fmt::Debug {
    async fn connect(&self) -> Result<Arc<dyn ClusterApi>>;
}

/// Connects with the in-cluster service-account configuration
#[derive(Debug, Default, Clone, Copy)]
pub struct InClusterConnector;

#[async_trait]
impl ClusterConnector for InClusterConnector {
    async fn connect(&self) -> Result<Arc<dyn ClusterApi>> {
        let config = Config::incluster().map_err(|e| {
            DiscoveryError::ClusterConfig(format!("Failed to load in-cluster config: {}", e))
        })?;
        let client = Client::try_from(config).map_err(|e| {
            DiscoveryError::ClusterConfig(format!("Failed to create Kubernetes client: {}", e))
        })?;

        debug!("Created in-cluster Kubernetes client");
        Ok(Arc::new(KubeClusterApi::new(client)))
    }
}

/// [`ClusterApi`] backed by a `kube` client
#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
}

impl KubeClusterApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl fmt::Debug for KubeClusterApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeClusterApi").finish_non_exhaustive()
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<PodInfo>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pods =
            api.list(&ListParams::default().labels(label_selector)).await.map_err(|e| {
                DiscoveryError::ClusterList(format!(
                    "Failed to list pods in {} with {}: {}",
                    namespace, label_selector, e
                ))
            })?;

        Ok(pods.items.into_iter().map(pod_info).collect())
    }

    async fn list_services(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<ServiceInfo>> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let services =
            api.list(&ListParams::default().labels(label_selector)).await.map_err(|e| {
                DiscoveryError::ClusterList(format!(
                    "Failed to list services in {} with {}: {}",
                    namespace, label_selector, e
                ))
            })?;

        Ok(services.items.into_iter().map(service_info).collect())
    }
}

fn pod_info(pod: Pod) -> PodInfo {
    let name = pod.metadata.name.unwrap_or_default();
    let status = pod.status.unwrap_or_default();

    PodInfo {
        name,
        phase: status.phase.unwrap_or_default(),
        conditions: status
            .conditions
            .unwrap_or_default()
            .into_iter()
            .map(|c| PodConditionInfo { condition_type: c.type_, status: c.status })
            .collect(),
    }
}

fn service_info(service: Service) -> ServiceInfo {
    let name = service.metadata.name.unwrap_or_default();
    let spec = service.spec.unwrap_or_default();

    ServiceInfo {
        name,
        cluster_ip: spec.cluster_ip,
        ports: spec
            .ports
            .unwrap_or_default()
            .into_iter()
            .map(|p| ServicePortInfo { name: p.name.unwrap_or_default(), port: p.port })
            .collect(),
    }
}
