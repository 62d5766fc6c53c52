//! Geocoder Common Types
//!
//! This crate provides the shared vocabulary of the geocoding resolution
//! engine: the query and result types, the error taxonomy, provider
//! configuration and the per-provider token-bucket rate limiter.
//!
//! # Overview
//!
//! A resolution turns a free-text place name into a coordinate pair. Every
//! layer of the workspace speaks in terms of the types defined here:
//!
//! - **Protocol Layer**: [`NormalizedQuery`], [`GeoResult`], [`ResolutionOutcome`]
//!   and the [`ErrorKind`] taxonomy
//! - **Configuration**: [`ProviderKind`], [`ProviderConfig`] and [`EngineConfig`],
//!   built once at process start and immutable thereafter
//! - **Rate Limiting**: [`rate_limit::RateLimiter`], one token bucket per provider
//!
//! # Example
//!
//! ```
//! use geocoder_common::{GeoResult, NormalizedQuery, ResolutionOutcome};
//!
//! let query = NormalizedQuery::parse("  Tokyo ").unwrap();
//! assert_eq!(query.as_str(), "tokyo");
//!
//! let result = GeoResult::new(35.6762, 139.6503, "Tokyo, Japan").unwrap();
//! let outcome = ResolutionOutcome::Found(result);
//! assert!(outcome.is_found());
//! ```

pub mod config;
pub mod protocol;
pub mod rate_limit;

pub use config::{EngineConfig, ProviderConfig, ProviderKind};
pub use protocol::*;
