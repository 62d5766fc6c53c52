// Copyright 2025 Geocoder Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Server information returned by `/_info`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub version: String,
    pub uptime_ms: u64,
    /// Provider names in resolution order
    pub providers: Vec<String>,
    pub cache_entries: usize,
}

impl ServerInfo {
    pub fn new(uptime_ms: u64, providers: Vec<String>, cache_entries: usize) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_ms,
            providers,
            cache_entries,
        }
    }
}

/// Counts of resolution outcomes, one field per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeCounts {
    pub found: u64,
    pub not_found: u64,
    pub validation: u64,
    pub rate_limited: u64,
    pub transport: u64,
    pub auth: u64,
    pub malformed: u64,
}

/// Metrics for one provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMetrics {
    /// Adapter calls made (requests that reached the network)
    pub attempts: u64,
    pub failures: u64,
    /// Times the rate limiter refused a permit
    pub rate_limited: u64,
    pub avg_latency_ms: u64,
    pub max_latency_ms: u64,
}

/// Complete metrics snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub uptime_ms: u64,
    pub outcomes: OutcomeCounts,
    pub providers: BTreeMap<String, ProviderMetrics>,
}

impl MetricsSnapshot {
    /// Fraction of lookups answered from the cache, or 0 before any lookup.
    pub fn cache_hit_ratio(&self) -> f64 {
        let lookups = self.cache_hits + self.cache_misses;
        if lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 / lookups as f64
        }
    }
}
