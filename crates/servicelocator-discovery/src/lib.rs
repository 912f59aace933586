//! Service URL discovery
//!
//! Resolves a logical service name to a reachable URL by asking several
//! providers and selecting one of the URLs they return.
//!
//! # Providers
//!
//! - **Kubernetes**: the cluster service labelled `{label}={service}` in the
//!   current namespace, provided at least one of its pods is running and ready
//! - **Locator**: the comma-separated list in `SERVICELOCATOR_{service}`
//!
//! Provider failures are logged and otherwise ignored; a lookup fails only when
//! no provider produced a candidate.
//!
//! ```no_run
//! use servicelocator_discovery::{DiscoveryConfig, DiscoveryService, UrlDiscovery};
//!
//! # async fn run() -> servicelocator_discovery::Result<()> {
//! let discovery = DiscoveryService::new(&DiscoveryConfig::default());
//! let url = discovery.find_url("billing").await?;
//! # Ok(())
//! # }
//! ```

use std::fmt;

use async_trait::async_trait;

pub mod balancer;
pub mod cache;
pub mod cluster;
pub mod config;
pub mod error;
pub mod kubernetes;
pub mod locator;
pub mod metrics;
pub mod service;

pub use balancer::{FirstCandidate, RoundRobin, SelectionPolicy, balanced};
pub use config::{DiscoveryConfig, KubernetesConfig, LocatorConfig};
pub use error::{DiscoveryError, Result};
pub use kubernetes::KubernetesDiscoveryProvider;
pub use locator::LocatorDiscoveryProvider;
pub use metrics::DiscoveryMetrics;
pub use service::{DiscoveryService, DiscoveryServiceBuilder};

/// Registry name of the Kubernetes provider
pub const KUBERNETES_PROVIDER: &str = "kubernetes";
/// Registry name of the environment locator provider
pub const LOCATOR_PROVIDER: &str = "locator";

/// A source of candidate URLs for a service
#[async_trait]
pub trait DiscoveryProvider: Send + Sync + fmt::Debug {
    /// Discover candidate URLs for a service
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError` if the provider cannot resolve the service
    async fn discover_urls(&self, service_name: &str) -> Result<Vec<String>>;
}

/// Resolves a service name to one URL
#[async_trait]
pub trait UrlDiscovery: Send + Sync {
    /// Find a URL for the service, with any trailing `/` removed
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::NotFound`] if no provider produced a candidate
    async fn find_url(&self, service_name: &str) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_names() {
        assert_eq!(KUBERNETES_PROVIDER, "kubernetes");
        assert_eq!(LOCATOR_PROVIDER, "locator");
    }

    #[test]
    fn test_service_debug_lists_providers() {
        let discovery = DiscoveryService::new(&DiscoveryConfig::default());
        let rendered = format!("{:?}", discovery);
        assert!(rendered.contains("KubernetesDiscoveryProvider"));
        assert!(rendered.contains("LocatorDiscoveryProvider"));
    }
}
