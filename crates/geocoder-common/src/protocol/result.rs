//! Resolution Result Types
//!
//! This module defines what a provider returns ([`Lookup`]), the normalized
//! coordinate record ([`GeoResult`]) and the per-invocation verdict the
//! orchestrator hands to the formatter ([`ResolutionOutcome`]).

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::{ErrorKind, ProviderError};

/// A resolved coordinate pair with the place name the provider matched.
///
/// # Invariants
///
/// - `latitude` is finite and within [-90, 90]
/// - `longitude` is finite and within [-180, 180]
/// - `confidence`, when present, is within [0, 1]
///
/// Instances are only built through [`GeoResult::new`], which enforces the
/// coordinate ranges.
///
/// # Example
///
/// ```
/// use geocoder_common::GeoResult;
///
/// let tokyo = GeoResult::new(35.6762, 139.6503, "Tokyo, Japan").unwrap();
/// assert_eq!(tokyo.latitude, 35.6762);
///
/// assert!(GeoResult::new(91.0, 0.0, "Nowhere").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoResult {
    /// Latitude in decimal degrees (WGS84)
    pub latitude: f64,
    /// Longitude in decimal degrees (WGS84)
    pub longitude: f64,
    /// Display name of the candidate the provider matched
    pub matched_name: String,
    /// Match quality normalized to [0, 1], when the provider reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Country name of the match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// ISO 3166-1 alpha-2 country code, upper-case
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    /// Name of the provider that produced this result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl GeoResult {
    /// Creates a result after checking the WGS84 ranges.
    ///
    /// # Returns
    ///
    /// - `Ok(result)` - coordinates are in range
    /// - `Err(ProviderError::Malformed)` - a coordinate is out of range or not
    ///   finite; a provider sending such a value sent an unusable response
    pub fn new(
        latitude: f64,
        longitude: f64,
        matched_name: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ProviderError::Malformed(format!(
                "latitude {} outside [-90, 90]",
                latitude
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ProviderError::Malformed(format!(
                "longitude {} outside [-180, 180]",
                longitude
            )));
        }

        Ok(Self {
            latitude,
            longitude,
            matched_name: matched_name.into(),
            confidence: None,
            country: None,
            country_code: None,
            source: None,
        })
    }

    /// Attaches a confidence score, clamped to [0, 1]. Non-finite scores are dropped.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.is_finite().then(|| confidence.clamp(0.0, 1.0));
        self
    }

    /// Attaches country details. Empty strings are treated as absent.
    pub fn with_country(mut self, country: Option<String>, country_code: Option<String>) -> Self {
        self.country = country.filter(|c| !c.is_empty());
        self.country_code = country_code
            .filter(|c| !c.is_empty())
            .map(|c| c.to_uppercase());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// What a provider adapter found for one query.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// First candidate of a non-empty match set
    Found(GeoResult),
    /// The provider answered and had no candidate
    NotFound,
}

/// Verdict of one resolution, handed to the formatter.
///
/// Produced once per invocation and never persisted. Validation failures are
/// not an outcome: they are rejected earlier as
/// [`GeocoderError::Validation`](super::GeocoderError::Validation).
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionOutcome {
    /// A provider (or the cache) produced coordinates
    Found(GeoResult),
    /// A provider authoritatively reported no match
    NotFound,
    /// Every attempted provider failed; carries the last failure
    ProviderError(ProviderError),
    /// Every attempted provider was rate limited, locally or upstream
    RateLimited {
        /// Time until the local bucket refills, when known
        retry_after: Option<Duration>,
    },
}

impl ResolutionOutcome {
    /// Builds the outcome for a terminal provider failure.
    ///
    /// Provider-side throttling becomes [`ResolutionOutcome::RateLimited`].
    pub fn from_failure(error: ProviderError) -> Self {
        match error {
            ProviderError::Throttled(_) => Self::RateLimited { retry_after: None },
            other => Self::ProviderError(other),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Returns the found result, if any.
    pub fn result(&self) -> Option<&GeoResult> {
        match self {
            Self::Found(result) => Some(result),
            _ => None,
        }
    }

    /// Returns the taxonomy kind, or `None` for `Found`.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Found(_) => None,
            Self::NotFound => Some(ErrorKind::NotFound),
            Self::ProviderError(error) => Some(error.kind()),
            Self::RateLimited { .. } => Some(ErrorKind::RateLimited),
        }
    }
}
