//! OpenCage Data adapter.
//!
//! Authenticates with a `key` query parameter. Errors are signalled with
//! HTTP status codes mirrored in the body's `status.code`; an empty
//! `results` array means no match.

use async_trait::async_trait;
use geocoder_common::{GeoResult, Lookup, NormalizedQuery, ProviderConfig, ProviderError};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::http;
use crate::provider::GeocodingProvider;

const NAME: &str = "opencage";

/// OpenCage reports confidence on a 0-10 scale.
const CONFIDENCE_SCALE: f64 = 10.0;

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    results: Vec<Candidate>,
    #[serde(default)]
    status: Option<Status>,
}

#[derive(Deserialize)]
struct Status {
    code: u16,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct Candidate {
    geometry: Geometry,
    formatted: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    components: Option<Components>,
}

#[derive(Deserialize)]
struct Geometry {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct Components {
    country: Option<String>,
    country_code: Option<String>,
}

pub struct OpenCageProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenCageProvider {
    pub fn new(client: reqwest::Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            base_url: config.base_url().to_string(),
            api_key: config.api_key().map(str::to_string),
        }
    }
}

#[async_trait]
impl GeocodingProvider for OpenCageProvider {
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
            .ok_or_else(|| ProviderError::Auth("opencage API key not configured".to_string()))?;

        let url = format!("{}/geocode/v1/json", self.base_url);
        let request = self.client.get(&url).query(&[
            ("q", query.as_str()),
            ("key", api_key),
            ("limit", "1"),
            ("no_annotations", "1"),
            ("language", "en"),
        ]);

        tracing::debug!("Calling OpenCage for: {}", query);
        let response = http::send(NAME, request).await?;
        if let Some(error) = http::classify_status(NAME, response.status, &response.body) {
            return Err(error);
        }

        let envelope: Envelope = http::decode(NAME, &response.body)?;

        // A 200 response can still carry an error code in the body.
        if let Some(status) = &envelope.status {
            if let Ok(code) = StatusCode::from_u16(status.code) {
                if let Some(error) = http::classify_status(NAME, code, status.message.as_bytes()) {
                    return Err(error);
                }
            }
        }

        let Some(first) = envelope.results.into_iter().next() else {
            return Ok(Lookup::NotFound);
        };

        let mut result =
            GeoResult::new(first.geometry.lat, first.geometry.lng, first.formatted)?.with_source(NAME);
        if let Some(confidence) = first.confidence {
            result = result.with_confidence(confidence / CONFIDENCE_SCALE);
        }
        if let Some(components) = first.components {
            result = result.with_country(components.country, components.country_code);
        }

        Ok(Lookup::Found(result))
    }
}
