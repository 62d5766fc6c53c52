//! Action Response Formatter
//!
//! Shapes a resolution into the fixed schema the invoking agent consumes:
//!
//! - found: `{"latitude": .., "longitude": .., "matchedName": ..}` plus any
//!   optional details the provider supplied
//! - no match: `{"notFound": true}`, never a default coordinate
//! - failure: `{"error": {"kind": "TRANSPORT", "message": ".."}}`
//!
//! Error messages are fixed per kind. Provider details are logged by the
//! resolver for the operator and never reach this layer's output.

use geocoder_common::{ErrorKind, GeoResult, GeocoderError, ResolutionOutcome};
use serde::{Deserialize, Serialize};

/// Explicit no-match marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotFoundBody {
    pub not_found: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: ErrorDetail,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_paths: Option<Vec<String>>,
}

/// The caller-facing shape of one resolution.
///
/// Untagged: the three variants are told apart by their fields (`latitude`,
/// `notFound` or `error`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionResponse {
    Found(GeoResult),
    NotFound(NotFoundBody),
    Error(ErrorBody),
}

impl ActionResponse {
    pub fn not_found() -> Self {
        Self::NotFound(NotFoundBody { not_found: true })
    }

    /// Builds an error body with a caller-supplied message.
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Error(ErrorBody {
            error: ErrorDetail {
                kind,
                message: message.into(),
                retry_after_ms: None,
            },
            supported_paths: None,
        })
    }

    /// Formats an engine outcome.
    pub fn from_outcome(outcome: &ResolutionOutcome) -> Self {
        match outcome {
            ResolutionOutcome::Found(result) => Self::Found(result.clone()),
            ResolutionOutcome::NotFound => Self::not_found(),
            ResolutionOutcome::ProviderError(error) => {
                let kind = error.kind();
                Self::error(kind, generic_message(kind))
            }
            ResolutionOutcome::RateLimited { retry_after } => Self::Error(ErrorBody {
                error: ErrorDetail {
                    kind: ErrorKind::RateLimited,
                    message: generic_message(ErrorKind::RateLimited).to_string(),
                    retry_after_ms: retry_after
                        .map(|d| d.as_millis().min(u64::MAX as u128) as u64),
                },
                supported_paths: None,
            }),
        }
    }

    /// Formats an error raised before resolution started.
    ///
    /// Validation messages are our own and are passed through; anything else
    /// gets the fixed message for its kind.
    pub fn from_error(error: &GeocoderError) -> Self {
        match error {
            GeocoderError::Validation(detail) => Self::error(ErrorKind::Validation, detail.clone()),
            other => {
                let kind = other.kind();
                Self::error(kind, generic_message(kind))
            }
        }
    }

    /// Formats either side of a resolution attempt.
    pub fn from_result(result: &geocoder_common::Result<ResolutionOutcome>) -> Self {
        match result {
            Ok(outcome) => Self::from_outcome(outcome),
            Err(error) => Self::from_error(error),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Returns the error kind, or `None` for found and not-found bodies.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Error(body) => Some(body.error.kind),
            _ => None,
        }
    }

    /// HTTP status for the inbound surfaces.
    ///
    /// A confirmed no-match is a successful answer, so it is a 200.
    pub fn http_status(&self) -> u16 {
        match self.error_kind() {
            None | Some(ErrorKind::NotFound) => 200,
            Some(ErrorKind::Validation) => 400,
            Some(ErrorKind::RateLimited) => 429,
            Some(ErrorKind::Transport) => 503,
            Some(ErrorKind::Auth) | Some(ErrorKind::Malformed) => 502,
        }
    }
}

impl From<&ResolutionOutcome> for ActionResponse {
    fn from(outcome: &ResolutionOutcome) -> Self {
        Self::from_outcome(outcome)
    }
}

/// Caller-safe message for each error kind.
pub fn generic_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Validation => "The place name is missing or invalid.",
        ErrorKind::NotFound => "No location matches that place name.",
        ErrorKind::RateLimited => "The geocoding service is busy. Try again shortly.",
        ErrorKind::Transport => "The geocoding service could not be reached.",
        ErrorKind::Auth => "The geocoding service is not configured correctly.",
        ErrorKind::Malformed => "The geocoding service returned an unusable response.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geocoder_common::ProviderError;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_tokyo_found_shape() {
        let outcome = ResolutionOutcome::Found(
            GeoResult::new(35.6762, 139.6503, "Tokyo, Japan").unwrap(),
        );

        let json = serde_json::to_value(ActionResponse::from_outcome(&outcome)).unwrap();
        assert_eq!(
            json,
            json!({"latitude": 35.6762, "longitude": 139.6503, "matchedName": "Tokyo, Japan"})
        );
    }

    #[test]
    fn test_found_round_trip_preserves_fields() {
        let result = GeoResult::new(-33.8688, 151.2093, "Sydney NSW, Australia")
            .unwrap()
            .with_confidence(0.9);
        let response = ActionResponse::from_outcome(&ResolutionOutcome::Found(result.clone()));

        let text = serde_json::to_string(&response).unwrap();
        let parsed: ActionResponse = serde_json::from_str(&text).unwrap();
        let ActionResponse::Found(parsed) = parsed else {
            panic!("expected a found body, got {}", text);
        };
        assert_eq!(parsed.latitude, result.latitude);
        assert_eq!(parsed.longitude, result.longitude);
        assert_eq!(parsed.matched_name, result.matched_name);
        assert_eq!(parsed.confidence, Some(0.9));
    }

    #[test]
    fn test_not_found_is_explicit() {
        let response = ActionResponse::from_outcome(&ResolutionOutcome::NotFound);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json, json!({"notFound": true}));
        assert!(json.get("latitude").is_none());
        assert_eq!(response.http_status(), 200);
    }

    #[test]
    fn test_provider_detail_is_not_leaked() {
        let outcome = ResolutionOutcome::ProviderError(ProviderError::Auth(
            "google status REQUEST_DENIED: The provided API key is invalid. key=abc123".into(),
        ));
        let response = ActionResponse::from_outcome(&outcome);
        let text = serde_json::to_string(&response).unwrap();

        assert!(!text.contains("abc123"));
        assert!(!text.contains("REQUEST_DENIED"));
        assert_eq!(response.error_kind(), Some(ErrorKind::Auth));
        assert_eq!(
            serde_json::to_value(&response).unwrap()["error"]["kind"],
            "AUTH"
        );
    }

    #[test]
    fn test_rate_limited_carries_retry_hint() {
        let outcome = ResolutionOutcome::RateLimited {
            retry_after: Some(Duration::from_millis(750)),
        };
        let json = serde_json::to_value(ActionResponse::from_outcome(&outcome)).unwrap();

        assert_eq!(json["error"]["kind"], "RATE_LIMITED");
        assert_eq!(json["error"]["retryAfterMs"], 750);
    }

    #[test]
    fn test_validation_error_message() {
        let error = GeocoderError::Validation("place name must not be empty".into());
        let response = ActionResponse::from_error(&error);

        assert_eq!(response.error_kind(), Some(ErrorKind::Validation));
        assert_eq!(response.http_status(), 400);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["error"]["message"], "place name must not be empty");
    }

    #[test]
    fn test_http_status_mapping() {
        let cases = [
            (ResolutionOutcome::ProviderError(ProviderError::Transport("x".into())), 503),
            (ResolutionOutcome::ProviderError(ProviderError::Auth("x".into())), 502),
            (ResolutionOutcome::ProviderError(ProviderError::Malformed("x".into())), 502),
            (ResolutionOutcome::RateLimited { retry_after: None }, 429),
        ];

        for (outcome, status) in cases {
            assert_eq!(ActionResponse::from_outcome(&outcome).http_status(), status);
        }
    }

    #[test]
    fn test_error_body_deserializes_as_error() {
        let parsed: ActionResponse = serde_json::from_value(json!({
            "error": {"kind": "TRANSPORT", "message": "down"}
        }))
        .unwrap();
        assert_eq!(parsed.error_kind(), Some(ErrorKind::Transport));
    }
}
