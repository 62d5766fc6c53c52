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

use crate::snapshot::{MetricsSnapshot, OutcomeCounts, ProviderMetrics};
use geocoder_common::ErrorKind;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

/// Per-provider counters.
///
/// All fields are atomics so recording only needs the registry's read lock.
#[derive(Debug, Default)]
struct ProviderStats {
    attempts: AtomicU64,
    failures: AtomicU64,
    rate_limited: AtomicU64,
    total_latency_ms: AtomicU64,
    max_latency_ms: AtomicU64,
}

impl ProviderStats {
    fn record_attempt(&self, latency: Duration, success: bool) {
        let latency_ms = latency.as_millis().min(u64::MAX as u128) as u64;
        self.attempts.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.max_latency_ms.fetch_max(latency_ms, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ProviderMetrics {
        let attempts = self.attempts.load(Ordering::Relaxed);
        let total_latency_ms = self.total_latency_ms.load(Ordering::Relaxed);
        ProviderMetrics {
            attempts,
            failures: self.failures.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            avg_latency_ms: if attempts == 0 { 0 } else { total_latency_ms / attempts },
            max_latency_ms: self.max_latency_ms.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Default)]
struct OutcomeCounters {
    found: AtomicU64,
    not_found: AtomicU64,
    validation: AtomicU64,
    rate_limited: AtomicU64,
    transport: AtomicU64,
    auth: AtomicU64,
    malformed: AtomicU64,
}

impl OutcomeCounters {
    fn counter(&self, kind: Option<ErrorKind>) -> &AtomicU64 {
        match kind {
            None => &self.found,
            Some(ErrorKind::NotFound) => &self.not_found,
            Some(ErrorKind::Validation) => &self.validation,
            Some(ErrorKind::RateLimited) => &self.rate_limited,
            Some(ErrorKind::Transport) => &self.transport,
            Some(ErrorKind::Auth) => &self.auth,
            Some(ErrorKind::Malformed) => &self.malformed,
        }
    }

    fn snapshot(&self) -> OutcomeCounts {
        OutcomeCounts {
            found: self.found.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            validation: self.validation.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            transport: self.transport.load(Ordering::Relaxed),
            auth: self.auth.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
        }
    }
}

/// Thread-safe storage for resolution metrics.
///
/// Global counters are plain atomics. The provider table sits behind a
/// `RwLock` that is only write-locked the first time a provider name is seen;
/// the provider set is fixed at startup, so this happens at most once per
/// provider.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    total_requests: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    outcomes: OutcomeCounters,
    providers: RwLock<HashMap<String, ProviderStats>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Records the final outcome of one resolution.
    ///
    /// `None` means the place was found; otherwise the outcome's error kind.
    pub fn record_outcome(&self, kind: Option<ErrorKind>) {
        self.outcomes.counter(kind).fetch_add(1, Ordering::Relaxed);
    }

    /// Records one adapter call.
    ///
    /// `success` is `true` for any authoritative answer (found or not found).
    pub fn record_attempt(&self, provider: &str, latency: Duration, success: bool) {
        self.with_provider(provider, |stats| stats.record_attempt(latency, success));
    }

    /// Records a permit refusal by the rate limiter.
    pub fn record_rate_limited(&self, provider: &str) {
        self.with_provider(provider, |stats| {
            stats.rate_limited.fetch_add(1, Ordering::Relaxed);
        });
    }

    fn with_provider(&self, provider: &str, f: impl FnOnce(&ProviderStats)) {
        // A poisoned lock only means a panic happened mid-insert; the counters
        // themselves are still consistent.
        {
            let providers = self.providers.read().unwrap_or_else(|e| e.into_inner());
            if let Some(stats) = providers.get(provider) {
                f(stats);
                return;
            }
        }

        let mut providers = self.providers.write().unwrap_or_else(|e| e.into_inner());
        let stats = providers.entry(provider.to_string()).or_default();
        f(stats);
    }

    pub fn snapshot(&self, uptime_ms: u64) -> MetricsSnapshot {
        let providers: BTreeMap<String, ProviderMetrics> = self
            .providers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(name, stats)| (name.clone(), stats.snapshot()))
            .collect();

        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            uptime_ms,
            outcomes: self.outcomes.snapshot(),
            providers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_empty_snapshot() {
        let registry = MetricsRegistry::new();
        let snapshot = registry.snapshot(42);

        assert_eq!(snapshot.total_requests, 0);
        assert_eq!(snapshot.uptime_ms, 42);
        assert_eq!(snapshot.outcomes, OutcomeCounts::default());
        assert!(snapshot.providers.is_empty());
        assert_eq!(snapshot.cache_hit_ratio(), 0.0);
    }

    #[test]
    fn test_outcomes_are_counted_by_kind() {
        let registry = MetricsRegistry::new();
        registry.record_outcome(None);
        registry.record_outcome(None);
        registry.record_outcome(Some(ErrorKind::NotFound));
        registry.record_outcome(Some(ErrorKind::Auth));
        registry.record_outcome(Some(ErrorKind::Validation));

        let outcomes = registry.snapshot(0).outcomes;
        assert_eq!(outcomes.found, 2);
        assert_eq!(outcomes.not_found, 1);
        assert_eq!(outcomes.auth, 1);
        assert_eq!(outcomes.validation, 1);
        assert_eq!(outcomes.transport, 0);
    }

    #[test]
    fn test_provider_latency_and_failures() {
        let registry = MetricsRegistry::new();
        registry.record_attempt("nominatim", Duration::from_millis(100), true);
        registry.record_attempt("nominatim", Duration::from_millis(300), false);
        registry.record_rate_limited("nominatim");
        registry.record_rate_limited("google");

        let snapshot = registry.snapshot(0);
        let nominatim = &snapshot.providers["nominatim"];
        assert_eq!(nominatim.attempts, 2);
        assert_eq!(nominatim.failures, 1);
        assert_eq!(nominatim.rate_limited, 1);
        assert_eq!(nominatim.avg_latency_ms, 200);
        assert_eq!(nominatim.max_latency_ms, 300);

        let google = &snapshot.providers["google"];
        assert_eq!(google.attempts, 0);
        assert_eq!(google.rate_limited, 1);
        assert_eq!(google.avg_latency_ms, 0);
    }

    #[test]
    fn test_cache_hit_ratio() {
        let registry = MetricsRegistry::new();
        registry.record_cache_hit();
        registry.record_cache_hit();
        registry.record_cache_hit();
        registry.record_cache_miss();

        assert_eq!(registry.snapshot(0).cache_hit_ratio(), 0.75);
    }

    #[test]
    fn test_concurrent_recording() {
        let registry = Arc::new(MetricsRegistry::new());
        let mut handles = Vec::new();

        for i in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                let provider = if i % 2 == 0 { "opencage" } else { "google" };
                for _ in 0..100 {
                    registry.record_request();
                    registry.record_attempt(provider, Duration::from_millis(1), true);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = registry.snapshot(0);
        assert_eq!(snapshot.total_requests, 800);
        assert_eq!(snapshot.providers["opencage"].attempts, 400);
        assert_eq!(snapshot.providers["google"].attempts, 400);
    }
}
