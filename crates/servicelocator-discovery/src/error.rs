//! Error types for service discovery

use thiserror::Error;

/// Result type for discovery operations
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Errors that can occur during service discovery
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// No provider registered under the requested name
    #[error("Discovery provider '{0}' not found")]
    ProviderNotFound(String),

    /// The service-account namespace could not be read (not running in Kubernetes)
    #[error("Kubernetes namespace unavailable: {0}")]
    NamespaceUnavailable(String),

    /// The in-cluster client could not be configured
    #[error("Kubernetes client configuration error: {0}")]
    ClusterConfig(String),

    /// Listing pods or services failed
    #[error("Kubernetes API error: {0}")]
    ClusterList(String),

    /// No pod matching the selector is running and ready
    #[error("No ready pods: {0}")]
    NoReadyPods(String),

    /// No service matching the selector is usable
    #[error("Service not found in Kubernetes Discovery: {0}")]
    ServiceNotFound(String),

    /// The environment locator produced no URLs
    #[error("Service not found in Locator Discovery: {0}")]
    LocatorNotFound(String),

    /// No provider produced a candidate URL
    #[error("not found in Discovery")]
    NotFound,

    /// An external call exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DiscoveryError {
    /// Whether the error means "nothing to resolve here" rather than an outage
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DiscoveryError::ProviderNotFound(_)
                | DiscoveryError::NoReadyPods(_)
                | DiscoveryError::ServiceNotFound(_)
                | DiscoveryError::LocatorNotFound(_)
                | DiscoveryError::NotFound
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DiscoveryError::ProviderNotFound("consul".to_string());
        assert_eq!(err.to_string(), "Discovery provider 'consul' not found");

        let err = DiscoveryError::NamespaceUnavailable("no such file".to_string());
        assert!(err.to_string().contains("namespace unavailable"));

        let err = DiscoveryError::ClusterConfig("missing token".to_string());
        assert!(err.to_string().contains("client configuration error"));

        let err = DiscoveryError::ClusterList("connection refused".to_string());
        assert!(err.to_string().contains("Kubernetes API error"));

        let err = DiscoveryError::ServiceNotFound("billing".to_string());
        assert!(err.to_string().contains("Kubernetes Discovery"));

        let err = DiscoveryError::LocatorNotFound("billing".to_string());
        assert!(err.to_string().contains("Locator Discovery"));

        let err = DiscoveryError::NotFound;
        assert_eq!(err.to_string(), "not found in Discovery");

        let err = DiscoveryError::Timeout("list pods".to_string());
        assert!(err.to_string().contains("Timed out"));
    }

    #[test]
    fn test_is_not_found() {
        assert!(DiscoveryError::NotFound.is_not_found());
        assert!(DiscoveryError::NoReadyPods("billing".to_string()).is_not_found());
        assert!(DiscoveryError::ServiceNotFound("billing".to_string()).is_not_found());
        assert!(DiscoveryError::LocatorNotFound("billing".to_string()).is_not_found());
        assert!(!DiscoveryError::Timeout("list pods".to_string()).is_not_found());
        assert!(!DiscoveryError::ClusterList("boom".to_string()).is_not_found());
        assert!(!DiscoveryError::NamespaceUnavailable("boom".to_string()).is_not_found());
    }
}
