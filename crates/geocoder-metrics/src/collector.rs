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

use crate::registry::MetricsRegistry;
use crate::snapshot::{MetricsSnapshot, ServerInfo};
use geocoder_common::ErrorKind;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Metrics handle shared by the resolver and the HTTP server.
///
/// Cloning is cheap; clones record into the same registry.
///
/// # Example
///
/// ```rust
/// use geocoder_metrics::ResolverMetrics;
///
/// let metrics = ResolverMetrics::new();
/// metrics.record_rate_limited("nominatim");
///
/// let info = metrics.info(vec!["nominatim".to_string()], 0);
/// assert_eq!(info.providers, vec!["nominatim"]);
/// ```
#[derive(Debug, Clone)]
pub struct ResolverMetrics {
    registry: Arc<MetricsRegistry>,
    started: Instant,
}

impl ResolverMetrics {
    pub fn new() -> Self {
        Self::with_registry(Arc::new(MetricsRegistry::new()))
    }

    pub fn with_registry(registry: Arc<MetricsRegistry>) -> Self {
        Self {
            registry,
            started: Instant::now(),
        }
    }

    pub fn uptime_ms(&self) -> u64 {
        self.started.elapsed().as_millis().min(u64::MAX as u128) as u64
    }

    pub fn record_request(&self) {
        self.registry.record_request();
    }

    pub fn record_cache_hit(&self) {
        self.registry.record_cache_hit();
    }

    pub fn record_cache_miss(&self) {
        self.registry.record_cache_miss();
    }

    /// See [`MetricsRegistry::record_outcome`].
    pub fn record_outcome(&self, kind: Option<ErrorKind>) {
        self.registry.record_outcome(kind);
    }

    pub fn record_attempt(&self, provider: &str, latency: Duration, success: bool) {
        self.registry.record_attempt(provider, latency, success);
    }

    pub fn record_rate_limited(&self, provider: &str) {
        self.registry.record_rate_limited(provider);
    }

    /// Takes a snapshot of the current metrics state.
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.registry.snapshot(self.uptime_ms())
    }

    /// Builds the `/_info` payload.
    ///
    /// # Arguments
    /// * `providers` - Configured provider names, in resolution order
    /// * `cache_entries` - Current result cache size
    pub fn info(&self, providers: Vec<String>, cache_entries: usize) -> ServerInfo {
        ServerInfo::new(self.uptime_ms(), providers, cache_entries)
    }
}

impl Default for ResolverMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_registry() {
        let metrics = ResolverMetrics::new();
        let clone = metrics.clone();

        metrics.record_request();
        clone.record_request();
        clone.record_cache_miss();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 2);
        assert_eq!(snapshot.cache_misses, 1);
    }

    #[test]
    fn test_info_payload_shape() {
        let metrics = ResolverMetrics::new();
        let info = metrics.info(vec!["opencage".to_string(), "nominatim".to_string()], 3);

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(json["providers"][1], "nominatim");
        assert_eq!(json["cacheEntries"], 3);
        assert!(json.get("uptimeMs").is_some());
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let metrics = ResolverMetrics::new();
        metrics.record_attempt("google", Duration::from_millis(10), false);
        metrics.record_outcome(Some(ErrorKind::RateLimited));

        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["outcomes"]["rateLimited"], 1);
        assert_eq!(json["providers"]["google"]["failures"], 1);
        assert_eq!(json["providers"]["google"]["avgLatencyMs"], 10);
    }
}
