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

//! Geocoder Metrics Collection
//!
//! Thread-safe counters for the resolution engine, exposed by the HTTP
//! server as the `/_metrics` and `/_info` endpoints.
//!
//! # Architecture
//!
//! - [`MetricsRegistry`]: atomic counters plus a per-provider table
//! - [`ResolverMetrics`]: the handle the resolver records into; adds uptime
//! - [`MetricsSnapshot`] / [`ServerInfo`]: serializable views
//!
//! # Usage Example
//!
//! ```rust
//! use geocoder_metrics::ResolverMetrics;
//! use std::time::Duration;
//!
//! let metrics = ResolverMetrics::new();
//! metrics.record_request();
//! metrics.record_cache_miss();
//! metrics.record_attempt("nominatim", Duration::from_millis(120), true);
//! metrics.record_outcome(None);
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.total_requests, 1);
//! assert_eq!(snapshot.outcomes.found, 1);
//! ```

mod collector;
mod registry;
mod snapshot;

pub use collector::ResolverMetrics;
pub use registry::MetricsRegistry;
pub use snapshot::{MetricsSnapshot, OutcomeCounts, ProviderMetrics, ServerInfo};
