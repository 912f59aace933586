//! Prometheus metrics for service discovery

use std::fmt;

use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};

/// Discovery metrics
#[derive(Clone)]
pub struct DiscoveryMetrics {
    /// Provider lookups by provider and outcome
    pub provider_lookups: IntCounterVec,
    /// Lookups where no provider produced a candidate
    pub not_found: IntCounter,
    /// Candidates gathered by the most recent lookup
    pub last_candidate_count: IntGauge,
}

impl DiscoveryMetrics {
    /// Create and register discovery metrics
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let provider_lookups = IntCounterVec::new(
            Opts::new(
                "servicelocator_provider_lookups_total",
                "Total number of provider lookups",
            ),
            &["provider", "status"],
        )?;
        registry.register(Box::new(provider_lookups.clone()))?;

        let not_found = IntCounter::new(
            "servicelocator_not_found_total",
            "Total number of lookups with no candidate URL",
        )?;
        registry.register(Box::new(not_found.clone()))?;

        let last_candidate_count = IntGauge::new(
            "servicelocator_last_candidate_count",
            "Number of candidate URLs gathered by the most recent lookup",
        )?;
        registry.register(Box::new(last_candidate_count.clone()))?;

        Ok(Self { provider_lookups, not_found, last_candidate_count })
    }

    /// Record one provider lookup
    pub fn record_lookup(&self, provider: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        self.provider_lookups.with_label_values(&[provider, status]).inc();
    }

    pub fn record_not_found(&self) {
        self.not_found.inc();
    }

    pub fn set_candidate_count(&self, count: usize) {
        self.last_candidate_count.set(count as i64);
    }
}

impl fmt::Debug for DiscoveryMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoveryMetrics")
            .field("not_found", &self.not_found.get())
            .field("last_candidate_count", &self.last_candidate_count.get())
            .finish_non_exhaustive()
    }
}
