//! Connection history.
//!
//! # Responsibilities
//! - Record the outcome and response time of every attempt per endpoint
//! - Keep success/failure counters for reporting
//! - Bound the number of tracked endpoints
//!
//! # Design Decisions
//! - Entries are never removed by outcomes, only by the size cap
//! - Eviction picks the least recently touched endpoint (logical clock)
//! - Serialized as one JSON blob under a single store key

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Last known state of one endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EndpointRecord {
    /// Outcome of the most recent attempt.
    pub succeeded: bool,
    /// Response time of the most recent attempt.
    pub last_response_time_ms: u64,
    pub successes: u64,
    pub failures: u64,
    /// Logical timestamp of the last update, used for eviction.
    pub touched: u64,
}

/// Per-endpoint outcome history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionHistory {
    endpoints: BTreeMap<String, EndpointRecord>,
    clock: u64,
}

impl ConnectionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one attempt outcome, evicting down to `cap` entries.
    pub fn record(&mut self, endpoint: &str, succeeded: bool, response_time_ms: u64, cap: usize) {
        self.clock += 1;
        let clock = self.clock;

        let entry = self.endpoints.entry(endpoint.to_string()).or_default();
        entry.succeeded = succeeded;
        entry.last_response_time_ms = response_time_ms;
        entry.touched = clock;
        if succeeded {
            entry.successes += 1;
        } else {
            entry.failures += 1;
        }

        while self.endpoints.len() > cap.max(1) {
            let oldest = self
                .endpoints
                .iter()
                .filter(|(k, _)| k.as_str() != endpoint)
                .min_by_key(|(_, r)| r.touched)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(key) => {
                    tracing::debug!(endpoint = %key, "Evicting endpoint from connection history");
                    self.endpoints.remove(&key);
                }
                None => break,
            }
        }
    }

    pub fn get(&self, endpoint: &str) -> Option<&EndpointRecord> {
        self.endpoints.get(endpoint)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EndpointRecord)> {
        self.endpoints.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Endpoints whose latest attempt succeeded.
    pub fn successful_endpoints(&self) -> Vec<&str> {
        self.iter().filter(|(_, r)| r.succeeded).map(|(k, _)| k).collect()
    }

    /// Endpoints whose latest attempt failed.
    pub fn failed_endpoints(&self) -> Vec<&str> {
        self.iter().filter(|(_, r)| !r.succeeded).map(|(k, _)| k).collect()
    }
}
