//! Geocoding Provider Adapters
//!
//! Each external geocoding API has its own authentication scheme, response
//! envelope and way of saying "no match". This crate hides those differences
//! behind the [`GeocodingProvider`] trait: every adapter takes a normalized
//! query and answers with [`Lookup::Found`](geocoder_common::Lookup::Found),
//! [`Lookup::NotFound`](geocoder_common::Lookup::NotFound) or a classified
//! [`ProviderError`](geocoder_common::ProviderError).
//!
//! # Adapters
//!
//! - [`NominatimProvider`] - OpenStreetMap, keyless, requires a `User-Agent`
//! - [`OpenCageProvider`] - API key in the query string
//! - [`GoogleProvider`] - API key in the query string, status carried in the body
//!
//! # Example
//!
//! ```no_run
//! use geocoder_common::{EngineConfig, NormalizedQuery, ProviderConfig, ProviderKind};
//! use geocoder_providers::build_providers;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::new(vec![ProviderConfig::new(ProviderKind::Nominatim)])?;
//! let providers = build_providers(&config)?;
//!
//! let query = NormalizedQuery::parse("Tokyo")?;
//! let lookup = providers[0].resolve(&query).await?;
//! # Ok(())
//! # }
//! ```

mod http;
pub mod google;
pub mod nominatim;
pub mod opencage;
pub mod provider;

pub use google::GoogleProvider;
pub use nominatim::NominatimProvider;
pub use opencage::OpenCageProvider;
pub use provider::{build_http_client, build_provider, build_providers, GeocodingProvider};
