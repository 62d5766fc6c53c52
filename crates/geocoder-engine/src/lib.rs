//! Geocoding Resolution Engine
//!
//! Turns a free-text place name into coordinates by walking an ordered list
//! of provider adapters behind a shared cache and rate limiter, then shapes
//! the outcome for the invoking agent.
//!
//! - [`Resolver`]: cache lookup, permit acquisition, adapter call, fallback
//! - [`ResultCache`]: sharded memo of normalized query to result
//! - [`ActionResponse`]: caller-facing response schema
//! - [`resolve_distance`]: two-place lookup with great-circle distance
//! - [`handle_action`]: agent action-group envelope
//! - [`HttpServer`]: axum surface for all of the above

pub mod action;
pub mod cache;
pub mod distance;
pub mod formatter;
pub mod http_server;
pub mod orchestrator;

pub use action::{handle_action, ActionEnvelope, ActionEvent, ActionParameter};
pub use cache::ResultCache;
pub use distance::{resolve_distance, CardinalDirection, Distance, DistanceResponse};
pub use formatter::ActionResponse;
pub use http_server::HttpServer;
pub use orchestrator::{Resolution, Resolver};
