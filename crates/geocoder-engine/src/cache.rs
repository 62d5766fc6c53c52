//! Process-lifetime memo of normalized query to coordinates.
//!
//! Backed by a sharded `DashMap`: readers of different shards never contend,
//! and a write only locks the shard it lands in. Writes are last-writer-wins.

use std::sync::Mutex;
use std::time::Duration;

use dashmap::DashMap;
use geocoder_common::{GeoResult, NormalizedQuery};
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry {
    result: GeoResult,
    inserted_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Option<Duration>, now: Instant) -> bool {
        match ttl {
            Some(ttl) => now.duration_since(self.inserted_at) >= ttl,
            None => false,
        }
    }
}

/// Cache of successful resolutions.
///
/// Only `Found` results are ever stored. With no TTL, entries live until the
/// process exits. With a TTL, an expired entry reads as a miss and is
/// removed, and `put` sweeps every expired entry at most once per TTL.
#[derive(Debug)]
pub struct ResultCache {
    entries: DashMap<NormalizedQuery, CacheEntry>,
    ttl: Option<Duration>,
    last_sweep: Mutex<Instant>,
}

impl ResultCache {
    /// Creates an empty cache. `ttl` of `None` caches for the process lifetime.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    /// Looks up `query`, treating expired entries as absent.
    pub fn get(&self, query: &NormalizedQuery) -> Option<GeoResult> {
        let now = Instant::now();
        {
            let entry = self.entries.get(query)?;
            if !entry.is_expired(self.ttl, now) {
                return Some(entry.result.clone());
            }
        }

        // Re-check under the shard's write lock; a fresh put may have landed.
        self.entries
            .remove_if(query, |_, entry| entry.is_expired(self.ttl, now));
        None
    }

    pub fn put(&self, query: NormalizedQuery, result: GeoResult) {
        let now = Instant::now();
        self.entries.insert(
            query,
            CacheEntry {
                result,
                inserted_at: now,
            },
        );
        self.sweep_if_due(now);
    }

    /// Drops expired entries that were never read again.
    fn sweep_if_due(&self, now: Instant) {
        let Some(ttl) = self.ttl else {
            return;
        };
        {
            let mut last_sweep = match self.last_sweep.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if now.saturating_duration_since(*last_sweep) < ttl {
                return;
            }
            *last_sweep = now;
        }
        self.entries.retain(|_, entry| !entry.is_expired(self.ttl, now));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
