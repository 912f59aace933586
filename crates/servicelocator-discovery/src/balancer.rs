//! Selection of one URL among discovered candidates
//!
//! The aggregator gathers candidates from every provider and hands them to a
//! [`SelectionPolicy`]. [`FirstCandidate`] is the default; [`RoundRobin`]
//! spreads consecutive lookups across the candidate list.

use std::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
};

use tracing::debug;

use crate::{DiscoveryError, Result};

/// Picks exactly one URL from a candidate list
pub trait SelectionPolicy: Send + Sync + fmt::Debug {
    /// Select one candidate
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::NotFound`] if `candidates` is empty
    fn select_one(&self, candidates: &[String]) -> Result<String>;
}

/// Pick the first candidate, with a trailing `/` removed
pub fn balanced(candidates: &[String]) -> Result<String> {
    FirstCandidate.select_one(candidates)
}

fn normalize(url: &str) -> String {
    url.strip_suffix('/').unwrap_or(url).to_string()
}

/// Always selects the first candidate
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstCandidate;

impl SelectionPolicy for FirstCandidate {
    fn select_one(&self, candidates: &[String]) -> Result<String> {
        let first = candidates.first().ok_or(DiscoveryError::NotFound)?;
        Ok(normalize(first))
    }
}

/// Cycles through candidates on successive selections
#[derive(Debug, Default)]
pub struct RoundRobin {
    current_index: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionPolicy for RoundRobin {
    fn select_one(&self, candidates: &[String]) -> Result<String> {
        if candidates.is_empty() {
            return Err(DiscoveryError::NotFound);
        }

        let index = self.current_index.fetch_add(1, Ordering::Relaxed) % candidates.len();
        debug!(index, candidate_count = candidates.len(), "Round-robin selection");

        Ok(normalize(&candidates[index]))
    }
}
