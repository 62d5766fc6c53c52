//! Google Maps Geocoding adapter.
//!
//! Google answers HTTP 200 for almost everything and puts the verdict in a
//! `status` string, so classification happens on the body.

use async_trait::async_trait;
use geocoder_common::{GeoResult, Lookup, NormalizedQuery, ProviderConfig, ProviderError};
use serde::Deserialize;

use crate::http;
use crate::provider::GeocodingProvider;

const NAME: &str = "google";

#[derive(Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    results: Vec<Candidate>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct Candidate {
    formatted_address: String,
    geometry: Geometry,
    #[serde(default)]
    address_components: Vec<AddressComponent>,
}

#[derive(Deserialize)]
struct Geometry {
    location: Location,
    #[serde(default)]
    location_type: Option<String>,
}

#[derive(Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct AddressComponent {
    long_name: String,
    short_name: String,
    #[serde(default)]
    types: Vec<String>,
}

/// Maps Google's `location_type` precision onto [0, 1].
fn location_type_confidence(location_type: &str) -> Option<f64> {
    match location_type {
        "ROOFTOP" => Some(1.0),
        "RANGE_INTERPOLATED" => Some(0.8),
        "GEOMETRIC_CENTER" => Some(0.6),
        "APPROXIMATE" => Some(0.4),
        _ => None,
    }
}

pub struct GoogleProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl GoogleProvider {
    pub fn new(client: reqwest::Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            base_url: config.base_url().to_string(),
            api_key: config.api_key().map(str::to_string),
        }
    }
}

#[async_trait]
impl GeocodingProvider for GoogleProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn is_selectable(&self) -> bool {
        self.api_key.is_some()
    }

    async fn resolve(&self, query: &NormalizedQuery) -> Result<Lookup, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::Auth("google API key not configured".to_string()))?;

        let url = format!("{}/maps/api/geocode/json", self.base_url);
        let request = self
            .client
            .get(&url)
            .query(&[("address", query.as_str()), ("key", api_key)]);

        tracing::debug!("Calling Google Maps for: {}", query);
        let response = http::send(NAME, request).await?;
        if let Some(error) = http::classify_status(NAME, response.status, &response.body) {
            return Err(error);
        }

        let envelope: Envelope = http::decode(NAME, &response.body)?;
        let detail = || {
            format!(
                "google status {}: {}",
                envelope.status,
                envelope.error_message.as_deref().unwrap_or("no message")
            )
        };

        match envelope.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Ok(Lookup::NotFound),
            "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => return Err(ProviderError::Throttled(detail())),
            "REQUEST_DENIED" => return Err(ProviderError::Auth(detail())),
            "INVALID_REQUEST" => return Err(ProviderError::Malformed(detail())),
            "UNKNOWN_ERROR" => return Err(ProviderError::Transport(detail())),
            _ => return Err(ProviderError::Malformed(detail())),
        }

        let Some(first) = envelope.results.into_iter().next() else {
            return Ok(Lookup::NotFound);
        };

        let country = first
            .address_components
            .iter()
            .find(|c| c.types.iter().any(|t| t == "country"));
        let (country_name, country_code) = match country {
            Some(c) => (Some(c.long_name.clone()), Some(c.short_name.clone())),
            None => (None, None),
        };

        let mut result = GeoResult::new(
            first.geometry.location.lat,
            first.geometry.location.lng,
            first.formatted_address,
        )?
        .with_source(NAME)
        .with_country(country_name, country_code);
        if let Some(confidence) = first
            .geometry
            .location_type
            .as_deref()
            .and_then(location_type_confidence)
        {
            result = result.with_confidence(confidence);
        }

        Ok(Lookup::Found(result))
    }
}
