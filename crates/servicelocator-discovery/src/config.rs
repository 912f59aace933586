//! Configuration types for service discovery

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{DiscoveryError, Result};

/// Label used to select pods and services when none is configured
pub const DEFAULT_LABEL_NAME: &str = "app";

/// Where the container platform mounts the current namespace
pub const DEFAULT_NAMESPACE_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

/// Service discovery configuration
///
/// A TTL of zero disables the corresponding cache, so every lookup goes live.
///
/// ```yaml
/// locator:
///   url_cache_ttl: 60
/// kubernetes:
///   url_cache_ttl: 30
///   namespace_cache_ttl: 3600
///   label_name: "app"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default)]
    pub locator: LocatorConfig,
    #[serde(default)]
    pub kubernetes: KubernetesConfig,
}

/// Environment locator configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorConfig {
    /// Cache lifetime for URLs read from the environment (in seconds)
    #[serde(default)]
    pub url_cache_ttl: u64,

    /// Drop empty entries from the comma-separated list and report
    /// "not found" when nothing is left
    #[serde(default)]
    pub skip_empty: bool,
}

impl LocatorConfig {
    pub fn url_cache_duration(&self) -> Duration {
        Duration::from_secs(self.url_cache_ttl)
    }
}

/// Kubernetes provider configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KubernetesConfig {
    /// Cache lifetime for resolved service URLs (in seconds)
    #[serde(default)]
    pub url_cache_ttl: u64,

    /// Cache lifetime for the current namespace (in seconds)
    #[serde(default)]
    pub namespace_cache_ttl: u64,

    /// Label name pods and services are selected by (`{label_name}={service_name}`)
    #[serde(default = "default_label_name")]
    pub label_name: String,

    /// File exposing the current namespace
    #[serde(default = "default_namespace_path")]
    pub namespace_path: String,

    /// Deadline applied to every call leaving the process (in milliseconds)
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

impl Default for KubernetesConfig {
    fn default() -> Self {
        Self {
            url_cache_ttl: 0,
            namespace_cache_ttl: 0,
            label_name: default_label_name(),
            namespace_path: default_namespace_path(),
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

impl KubernetesConfig {
    pub fn url_cache_duration(&self) -> Duration {
        Duration::from_secs(self.url_cache_ttl)
    }

    pub fn namespace_cache_duration(&self) -> Duration {
        Duration::from_secs(self.namespace_cache_ttl)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Label name with the empty string falling back to the default
    pub fn effective_label_name(&self) -> &str {
        if self.label_name.is_empty() { DEFAULT_LABEL_NAME } else { &self.label_name }
    }
}

fn default_label_name() -> String {
    DEFAULT_LABEL_NAME.to_string()
}

fn default_namespace_path() -> String {
    DEFAULT_NAMESPACE_PATH.to_string()
}

fn default_call_timeout_ms() -> u64 {
    5000 // 5 seconds
}

impl DiscoveryConfig {
    /// Load configuration from an optional file, overridden by environment variables
    ///
    /// Environment variables use the `DISCOVERY` prefix and `__` as the nesting
    /// separator, e.g. `DISCOVERY__KUBERNETES__LABEL_NAME=component`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let builder = ::config::Config::builder()
            .add_source(::config::File::from(path.as_ref()).required(false));

        let builder = builder.add_source(
            ::config::Environment::with_prefix("DISCOVERY").separator("__").try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| DiscoveryError::Config(format!("Failed to build config: {}", e)))?;

        let config: DiscoveryConfig = config
            .try_deserialize()
            .map_err(|e| DiscoveryError::Config(format!("Failed to deserialize config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults on any failure
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => {
                tracing::info!("Discovery configuration loaded from {:?}", path.as_ref());
                config
            },
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Failed to load discovery config from {:?}. Using defaults.",
                    path.as_ref()
                );
                Self::default()
            },
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.kubernetes.call_timeout_ms == 0 {
            return Err(DiscoveryError::Config(
                "kubernetes.call_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.kubernetes.call_timeout_ms > 60000 {
            tracing::warn!(
                call_timeout_ms = self.kubernetes.call_timeout_ms,
                "kubernetes.call_timeout_ms is very high (>60s). Lookups may stall."
            );
        }

        if self.kubernetes.namespace_path.is_empty() {
            return Err(DiscoveryError::Config(
                "kubernetes.namespace_path must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
