//! Provider and Engine Configuration
//!
//! Configuration is assembled once at process start (by the CLI, from flags
//! and environment variables) and never mutated afterwards.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::protocol::error::{GeocoderError, Result};
use crate::rate_limit::{AcquireMode, RateLimitConfig};

/// Default timeout for a single outbound provider call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default `User-Agent`; the keyless provider rejects anonymous clients.
pub const DEFAULT_USER_AGENT: &str = concat!("geocoder/", env!("CARGO_PKG_VERSION"));

/// The geocoding backends this engine knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// OpenStreetMap Nominatim: free, keyless, 1 request/second
    Nominatim,
    /// OpenCage: API key in the query string
    OpenCage,
    /// Google Maps Geocoding: API key in the query string
    Google,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [Self::Nominatim, Self::OpenCage, Self::Google];

    /// Returns the configuration name of this provider.
    pub fn name(self) -> &'static str {
        match self {
            Self::Nominatim => "nominatim",
            Self::OpenCage => "opencage",
            Self::Google => "google",
        }
    }

    /// Returns `true` if the provider cannot be used without an API key.
    pub fn requires_credential(self) -> bool {
        !matches!(self, Self::Nominatim)
    }

    /// Environment variable conventionally holding the provider's API key.
    pub fn credential_env_var(self) -> Option<&'static str> {
        match self {
            Self::Nominatim => None,
            Self::OpenCage => Some("OPENCAGE_API_KEY"),
            Self::Google => Some("GOOGLE_MAPS_API_KEY"),
        }
    }

    /// Public endpoint base URL (scheme and host).
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Nominatim => "https://nominatim.openstreetmap.org",
            Self::OpenCage => "https://api.opencagedata.com",
            Self::Google => "https://maps.googleapis.com",
        }
    }

    /// The provider's documented request ceiling.
    pub fn default_rate_limit(self) -> RateLimitConfig {
        match self {
            Self::Nominatim => RateLimitConfig::pinned_keyless(),
            Self::OpenCage => RateLimitConfig::per_second(1.0),
            Self::Google => RateLimitConfig::per_second(50.0),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = GeocoderError;

    /// Parses a provider name, case-insensitively.
    ///
    /// # Example
    ///
    /// ```
    /// use geocoder_common::ProviderKind;
    ///
    /// assert_eq!("Nominatim".parse::<ProviderKind>().unwrap(), ProviderKind::Nominatim);
    /// assert_eq!("osm".parse::<ProviderKind>().unwrap(), ProviderKind::Nominatim);
    /// assert!("bing".parse::<ProviderKind>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nominatim" | "osm" | "openstreetmap" => Ok(Self::Nominatim),
            "opencage" => Ok(Self::OpenCage),
            "google" | "googlemaps" | "google_maps" => Ok(Self::Google),
            other => Err(GeocoderError::UnknownProvider(other.to_string())),
        }
    }
}

/// Configuration of one provider.
///
/// # Invariants
///
/// - A provider that requires a credential is selectable only when
///   `api_key` is present and non-empty
/// - The keyless provider never runs faster than one request per second
#[derive(Clone)]
pub struct ProviderConfig {
    kind: ProviderKind,
    api_key: Option<String>,
    rate_limit: Option<RateLimitConfig>,
    base_url: String,
}

impl ProviderConfig {
    /// Creates a configuration with the provider's defaults and no credential.
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            api_key: None,
            rate_limit: Some(kind.default_rate_limit()),
            base_url: kind.default_base_url().to_string(),
        }
    }

    /// Sets the API key. Blank keys are treated as absent.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        self
    }

    /// Overrides the declared rate limit; `None` declares no limit.
    ///
    /// The keyless provider keeps its one-request-per-second pin: only slower
    /// policies are accepted for it.
    pub fn with_rate_limit(mut self, rate_limit: Option<RateLimitConfig>) -> Self {
        if self.kind.requires_credential() {
            self.rate_limit = rate_limit;
            return self;
        }

        let pinned = RateLimitConfig::pinned_keyless();
        self.rate_limit = match rate_limit {
            Some(config) if config.requests_per_second <= pinned.requests_per_second => {
                Some(RateLimitConfig::new(config.requests_per_second, 1))
            }
            _ => {
                tracing::warn!(
                    "Ignoring rate limit override for {}: pinned at 1 request/second",
                    self.kind
                );
                Some(pinned)
            }
        };
        self
    }

    /// Points the provider at a different host (proxy or test double).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn rate_limit(&self) -> Option<&RateLimitConfig> {
        self.rate_limit.as_ref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn requires_credential(&self) -> bool {
        self.kind.requires_credential()
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Returns `true` if the orchestrator may send requests to this provider.
    pub fn is_selectable(&self) -> bool {
        !self.requires_credential() || self.has_credential()
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("rate_limit", &self.rate_limit)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Engine-wide configuration.
///
/// # Fields
///
/// * `providers` - Providers in resolution order; the first is the primary,
///   the rest are fallbacks
/// * `request_timeout` - Bound on each outbound call
/// * `invocation_timeout` - Optional bound on a whole resolution
/// * `cache_ttl` - Optional expiry of cached results; `None` caches for the
///   process lifetime
/// * `blocking_wait` - When set, rate limit acquisition blocks up to this long
/// * `user_agent` - `User-Agent` sent to every provider
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub providers: Vec<ProviderConfig>,
    pub request_timeout: Duration,
    pub invocation_timeout: Option<Duration>,
    pub cache_ttl: Option<Duration>,
    pub blocking_wait: Option<Duration>,
    pub user_agent: String,
}

impl EngineConfig {
    /// Creates a configuration for the given provider order.
    ///
    /// # Returns
    ///
    /// - `Ok(config)` - with default timeouts and no cache expiry
    /// - `Err(GeocoderError::Config)` - the list is empty or names a provider twice
    pub fn new(providers: Vec<ProviderConfig>) -> Result<Self> {
        if providers.is_empty() {
            return Err(GeocoderError::Config(
                "at least one provider must be configured".to_string(),
            ));
        }
        for (i, provider) in providers.iter().enumerate() {
            if providers[..i].iter().any(|p| p.kind() == provider.kind()) {
                return Err(GeocoderError::Config(format!(
                    "provider {} is configured more than once",
                    provider.name()
                )));
            }
        }

        Ok(Self {
            providers,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            invocation_timeout: None,
            cache_ttl: None,
            blocking_wait: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_invocation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.invocation_timeout = timeout;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_blocking_wait(mut self, wait: Option<Duration>) -> Self {
        self.blocking_wait = wait;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Returns the rate limit acquisition mode implied by `blocking_wait`.
    pub fn acquire_mode(&self) -> AcquireMode {
        match self.blocking_wait {
            Some(max_wait) => AcquireMode::Blocking { max_wait },
            None => AcquireMode::NonBlocking,
        }
    }

    /// Provider names in resolution order.
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(ProviderConfig::name).collect()
    }
}
