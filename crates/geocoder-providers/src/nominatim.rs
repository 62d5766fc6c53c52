//! OpenStreetMap Nominatim adapter.
//!
//! Free and keyless, but the usage policy requires an identifying
//! `User-Agent` and at most one request per second. A match set is a JSON
//! array; an empty array means no match.

use async_trait::async_trait;
use geocoder_common::{GeoResult, Lookup, NormalizedQuery, ProviderConfig, ProviderError};
use serde::Deserialize;

use crate::http;
use crate::provider::GeocodingProvider;

const NAME: &str = "nominatim";

#[derive(Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
    display_name: String,
    #[serde(default)]
    importance: Option<f64>,
    #[serde(default)]
    address: Option<Address>,
}

#[derive(Deserialize)]
struct Address {
    country: Option<String>,
    country_code: Option<String>,
}

pub struct NominatimProvider {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimProvider {
    pub fn new(client: reqwest::Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            base_url: config.base_url().to_string(),
        }
    }
}

#[async_trait]
impl GeocodingProvider for NominatimProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn is_selectable(&self) -> bool {
        true
    }

    async fn resolve(&self, query: &NormalizedQuery) -> Result<Lookup, ProviderError> {
        let url = format!("{}/search", self.base_url);
        let request = self.client.get(&url).query(&[
            ("q", query.as_str()),
            ("format", "jsonv2"),
            ("limit", "1"),
            ("addressdetails", "1"),
        ]);

        tracing::debug!("Calling Nominatim for: {}", query);
        let response = http::send(NAME, request).await?;
        if let Some(error) = http::classify_status(NAME, response.status, &response.body) {
            return Err(error);
        }

        let results: Vec<SearchResult> = http::decode(NAME, &response.body)?;
        let Some(first) = results.into_iter().next() else {
            return Ok(Lookup::NotFound);
        };

        let latitude = http::parse_coordinate(NAME, "lat", &first.lat)?;
        let longitude = http::parse_coordinate(NAME, "lon", &first.lon)?;
        let mut result = GeoResult::new(latitude, longitude, first.display_name)?.with_source(NAME);
        if let Some(importance) = first.importance {
            result = result.with_confidence(importance);
        }
        if let Some(address) = first.address {
            result = result.with_country(address.country, address.country_code);
        }

        Ok(Lookup::Found(result))
    }
}
