use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Machine-readable classification of a resolution result.
///
/// Serialized in `SCREAMING_SNAKE_CASE` (`"NOT_FOUND"`, `"RATE_LIMITED"`, ...)
/// so the invoking agent can branch on it without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Empty or otherwise unusable query, rejected before any side effect
    Validation,
    /// Authoritative zero-match answer from a provider
    NotFound,
    /// Local token bucket exhausted or the provider throttled us
    RateLimited,
    /// Network failure or timeout
    Transport,
    /// Missing or rejected credential
    Auth,
    /// The provider rejected the request or sent an unusable response
    Malformed,
}

impl ErrorKind {
    /// Returns `true` if the orchestrator may try the next configured provider.
    ///
    /// `NotFound` is terminal and `Validation` never reaches a provider, so
    /// neither is eligible. Every other kind is.
    pub fn is_fallback_eligible(self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::Transport | Self::Auth | Self::Malformed
        )
    }

    /// Returns the wire name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION",
            Self::NotFound => "NOT_FOUND",
            Self::RateLimited => "RATE_LIMITED",
            Self::Transport => "TRANSPORT",
            Self::Auth => "AUTH",
            Self::Malformed => "MALFORMED",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a provider adapter.
///
/// The payload is operator-facing detail (status codes, provider messages).
/// It is logged but never forwarded to the invoking agent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("credential missing or rejected: {0}")]
    Auth(String),

    #[error("malformed request or response: {0}")]
    Malformed(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("throttled by provider: {0}")]
    Throttled(String),
}

impl ProviderError {
    /// Returns the taxonomy kind for this failure.
    ///
    /// Provider-side throttling is reported as [`ErrorKind::RateLimited`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(_) => ErrorKind::Auth,
            Self::Malformed(_) => ErrorKind::Malformed,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Throttled(_) => ErrorKind::RateLimited,
        }
    }

    /// Returns the operator-facing detail message.
    pub fn detail(&self) -> &str {
        match self {
            Self::Auth(d) | Self::Malformed(d) | Self::Transport(d) | Self::Throttled(d) => d,
        }
    }
}

#[derive(Error, Debug)]
pub enum GeocoderError {
    #[error("Invalid query: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GeocoderError {
    /// Returns the taxonomy kind used when this error is shown to a caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Transport(_) | Self::Io(_) => ErrorKind::Transport,
            Self::Config(_) | Self::UnknownProvider(_) | Self::JsonSerialization(_) => {
                ErrorKind::Malformed
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, GeocoderError>;
