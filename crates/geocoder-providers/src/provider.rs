use std::sync::Arc;

use async_trait::async_trait;
use geocoder_common::protocol::error::{GeocoderError, Result};
use geocoder_common::{EngineConfig, Lookup, NormalizedQuery, ProviderConfig, ProviderError, ProviderKind};

use crate::google::GoogleProvider;
use crate::nominatim::NominatimProvider;
use crate::opencage::OpenCageProvider;

/// A geocoding backend that resolves a normalized place name.
///
/// Implementations perform exactly one outbound request per call and no
/// normalization of their own.
#[async_trait]
pub trait GeocodingProvider: Send + Sync {
    /// Configuration name, also used as the rate limiter key.
    fn name(&self) -> &str;

    /// Returns `false` when a required credential is missing.
    ///
    /// The orchestrator never calls [`resolve`](Self::resolve) on a provider
    /// that is not selectable.
    fn is_selectable(&self) -> bool;

    /// Resolves `query` to its first candidate.
    async fn resolve(&self, query: &NormalizedQuery) -> std::result::Result<Lookup, ProviderError>;
}

/// Builds the HTTP client shared by every adapter.
///
/// The client carries the request timeout and `User-Agent` from `config`.
pub fn build_http_client(config: &EngineConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| GeocoderError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Builds the adapter for one provider configuration.
pub fn build_provider(config: &ProviderConfig, client: reqwest::Client) -> Arc<dyn GeocodingProvider> {
    match config.kind() {
        ProviderKind::Nominatim => Arc::new(NominatimProvider::new(client, config)),
        ProviderKind::OpenCage => Arc::new(OpenCageProvider::new(client, config)),
        ProviderKind::Google => Arc::new(GoogleProvider::new(client, config)),
    }
}

/// Builds adapters for every configured provider, in resolution order.
pub fn build_providers(config: &EngineConfig) -> Result<Vec<Arc<dyn GeocodingProvider>>> {
    let client = build_http_client(config)?;
    Ok(config
        .providers
        .iter()
        .map(|provider| build_provider(provider, client.clone()))
        .collect())
}
