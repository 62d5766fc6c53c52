//! Shared HTTP plumbing for the adapters: sending a request, and mapping
//! transport failures and HTTP status codes onto [`ProviderError`].

use geocoder_common::ProviderError;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

/// Longest body excerpt kept in an operator-facing error detail.
const MAX_DETAIL_CHARS: usize = 200;

/// Raw response of one provider call.
pub(crate) struct RawResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// Sends `request` and reads the whole body.
///
/// Connection failures, timeouts and body read failures are all
/// [`ProviderError::Transport`]. The request URL (which may carry an API key)
/// is stripped from the error before it is rendered.
pub(crate) async fn send(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> Result<RawResponse, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| transport_error(provider, e))?;

    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| transport_error(provider, e))?
        .to_vec();

    Ok(RawResponse { status, body })
}

fn transport_error(provider: &str, error: reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Transport(format!("{} request timed out", provider))
    } else {
        ProviderError::Transport(format!("{} request failed: {}", provider, error.without_url()))
    }
}

/// Maps a non-success HTTP status onto the error taxonomy.
///
/// # Returns
///
/// - `None` - the status is 2xx
/// - `Some(ProviderError::Auth)` - 401 / 403
/// - `Some(ProviderError::Throttled)` - 402 (quota) / 429
/// - `Some(ProviderError::Transport)` - 408 / 5xx / anything unexpected
/// - `Some(ProviderError::Malformed)` - any other 4xx
pub(crate) fn classify_status(provider: &str, status: StatusCode, body: &[u8]) -> Option<ProviderError> {
    if status.is_success() {
        return None;
    }

    let detail = format!("{} returned HTTP {}: {}", provider, status.as_u16(), excerpt(body));
    let error = match status.as_u16() {
        401 | 403 => ProviderError::Auth(detail),
        402 | 429 => ProviderError::Throttled(detail),
        408 => ProviderError::Transport(detail),
        400..=499 => ProviderError::Malformed(detail),
        _ => ProviderError::Transport(detail),
    };
    Some(error)
}

/// Decodes a JSON body; undecodable bodies are [`ProviderError::Malformed`].
pub(crate) fn decode<T: DeserializeOwned>(provider: &str, body: &[u8]) -> Result<T, ProviderError> {
    serde_json::from_slice(body).map_err(|e| {
        ProviderError::Malformed(format!("failed to parse {} response: {}", provider, e))
    })
}

/// Parses a coordinate sent as a string (Nominatim does this).
pub(crate) fn parse_coordinate(provider: &str, axis: &str, raw: &str) -> Result<f64, ProviderError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|e| ProviderError::Malformed(format!("{} sent invalid {} {:?}: {}", provider, axis, raw, e)))
}

fn excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.chars().count() > MAX_DETAIL_CHARS {
        let cut: String = text.chars().take(MAX_DETAIL_CHARS).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
