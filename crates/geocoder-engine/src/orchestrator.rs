//! Resolution Orchestrator
//!
//! Turns a raw place name into a [`ResolutionOutcome`] by walking the
//! configured providers in order. The cache is consulted before any network
//! call, and each provider's rate limit permit is acquired before its
//! adapter is called.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use geocoder_common::protocol::error::Result;
use geocoder_common::rate_limit::{AcquireMode, RateLimiter};
use geocoder_common::config::DEFAULT_REQUEST_TIMEOUT;
use geocoder_common::{
    EngineConfig, ErrorKind, Lookup, NormalizedQuery, ProviderError, ResolutionOutcome,
};
use geocoder_metrics::ResolverMetrics;
use geocoder_providers::{build_providers, GeocodingProvider};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::cache::ResultCache;

/// The result of one resolution, with provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub outcome: ResolutionOutcome,
    /// Provider that produced the answer, when one did
    pub provider: Option<String>,
    pub from_cache: bool,
    /// Adapter calls made; skipped and rate-limited providers do not count
    pub attempts: usize,
}

impl Resolution {
    fn cached(outcome: ResolutionOutcome, provider: Option<String>) -> Self {
        Self {
            outcome,
            provider,
            from_cache: true,
            attempts: 0,
        }
    }
}

/// Geocoding Resolution Engine.
///
/// Sits between callers and provider adapters. For each query it:
///
/// 1. **Validates**: empty input is rejected before any side effect
/// 2. **Consults the cache**: a hit answers with no network call
/// 3. **Walks the provider order**: per provider, acquire a rate limit permit,
///    then call the adapter exactly once
/// 4. **Classifies**: `Found` is cached and returned, `NotFound` is terminal,
///    every failure moves on to the next provider
///
/// At most one adapter call is made per configured provider, so an invocation
/// makes at most N outbound requests.
///
/// # Shared state
///
/// The cache, limiter and metrics are explicit objects handed in by the
/// caller, so a warm process shares them across invocations and tests can
/// inject fresh ones.
pub struct Resolver {
    providers: Vec<Arc<dyn GeocodingProvider>>,
    cache: Arc<ResultCache>,
    limiter: RateLimiter,
    metrics: ResolverMetrics,
    acquire_mode: AcquireMode,
    request_timeout: Duration,
    invocation_timeout: Option<Duration>,
}

impl Resolver {
    /// Creates a resolver over `providers`, tried in the given order.
    ///
    /// Uses non-blocking rate limiting, the default 10 s per-call timeout and
    /// no invocation timeout.
    pub fn new(
        providers: Vec<Arc<dyn GeocodingProvider>>,
        cache: Arc<ResultCache>,
        limiter: RateLimiter,
        metrics: ResolverMetrics,
    ) -> Self {
        Self {
            providers,
            cache,
            limiter,
            metrics,
            acquire_mode: AcquireMode::NonBlocking,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            invocation_timeout: None,
        }
    }

    /// Builds the adapters, cache and limiter described by `config`.
    ///
    /// # Example
    /// ```no_run
    /// # use geocoder_common::{EngineConfig, ProviderConfig, ProviderKind};
    /// # use geocoder_engine::Resolver;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = EngineConfig::new(vec![ProviderConfig::new(ProviderKind::Nominatim)])?;
    /// let resolver = Resolver::from_config(&config)?;
    ///
    /// let resolution = resolver.resolve("Tokyo").await?;
    /// println!("{:?}", resolution.outcome);
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let providers = build_providers(config)?;
        let limiter = RateLimiter::from_policies(config.providers.iter().filter_map(|provider| {
            provider
                .rate_limit()
                .map(|policy| (provider.name(), policy.clone()))
        }));
        let cache = Arc::new(ResultCache::new(config.cache_ttl));

        info!(
            "Resolver initialized with providers [{}]",
            config.provider_names().join(", ")
        );

        Ok(Self::new(providers, cache, limiter, ResolverMetrics::new())
            .with_acquire_mode(config.acquire_mode())
            .with_request_timeout(config.request_timeout)
            .with_invocation_timeout(config.invocation_timeout))
    }

    pub fn with_acquire_mode(mut self, mode: AcquireMode) -> Self {
        self.acquire_mode = mode;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_invocation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.invocation_timeout = timeout;
        self
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn metrics(&self) -> &ResolverMetrics {
        &self.metrics
    }

    /// Provider names in resolution order.
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Resolves a raw place name.
    ///
    /// # Returns
    /// - `Ok(resolution)` - any outcome, including `NotFound` and provider failures
    /// - `Err(GeocoderError::Validation)` - the query is empty after trimming or
    ///   too long; nothing was looked up
    pub async fn resolve(&self, raw: &str) -> Result<Resolution> {
        self.resolve_with_mode(raw, self.acquire_mode).await
    }

    /// Resolves a raw place name, acquiring rate limit permits with `mode`.
    pub async fn resolve_with_mode(&self, raw: &str, mode: AcquireMode) -> Result<Resolution> {
        self.metrics.record_request();

        let query = match NormalizedQuery::parse(raw) {
            Ok(query) => query,
            Err(e) => {
                self.metrics.record_outcome(Some(ErrorKind::Validation));
                return Err(e);
            }
        };

        let attempts = AtomicUsize::new(0);
        let resolution = match self.invocation_timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, self.resolve_normalized(&query, mode, &attempts)).await {
                    Ok(resolution) => resolution,
                    Err(_) => {
                        warn!(
                            "Resolution of '{}' abandoned after {}ms",
                            query,
                            limit.as_millis()
                        );
                        Resolution {
                            outcome: ResolutionOutcome::ProviderError(ProviderError::Transport(
                                format!("invocation timed out after {}ms", limit.as_millis()),
                            )),
                            provider: None,
                            from_cache: false,
                            attempts: attempts.load(Ordering::Relaxed),
                        }
                    }
                }
            }
            None => self.resolve_normalized(&query, mode, &attempts).await,
        };

        self.metrics.record_outcome(resolution.outcome.kind());
        Ok(resolution)
    }

    async fn resolve_normalized(
        &self,
        query: &NormalizedQuery,
        mode: AcquireMode,
        attempts: &AtomicUsize,
    ) -> Resolution {
        if let Some(hit) = self.cache.get(query) {
            self.metrics.record_cache_hit();
            debug!("Cache hit for '{}'", query);
            let provider = hit.source.clone();
            return Resolution::cached(ResolutionOutcome::Found(hit), provider);
        }
        self.metrics.record_cache_miss();

        let mut last_failure: Option<ResolutionOutcome> = None;

        for provider in &self.providers {
            let name = provider.name();

            if !provider.is_selectable() {
                debug!("Skipping {}: credential not configured", name);
                // A real failure from an earlier provider is more useful than this.
                last_failure.get_or_insert_with(|| {
                    ResolutionOutcome::ProviderError(ProviderError::Auth(format!(
                        "{} credential not configured",
                        name
                    )))
                });
                continue;
            }

            match self.limiter.acquire(name, mode).await {
                Ok(permit) => {
                    if !permit.waited().is_zero() {
                        debug!("Waited {:?} for a {} slot", permit.waited(), permit.provider());
                    }
                }
                Err(limited) => {
                    self.metrics.record_rate_limited(name);
                    warn!("{}, trying next provider", limited);
                    last_failure = Some(ResolutionOutcome::RateLimited {
                        retry_after: Some(limited.retry_after),
                    });
                    continue;
                }
            }

            let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            debug!("Attempt {} for '{}' via {}", attempt, query, name);

            let started = Instant::now();
            let result = self.call_provider(provider.as_ref(), query).await;
            self.metrics
                .record_attempt(name, started.elapsed(), result.is_ok());

            match result {
                Ok(Lookup::Found(result)) => {
                    info!(
                        "Resolved '{}' via {} to ({}, {})",
                        query, name, result.latitude, result.longitude
                    );
                    self.cache.put(query.clone(), result.clone());
                    return Resolution {
                        outcome: ResolutionOutcome::Found(result),
                        provider: Some(name.to_string()),
                        from_cache: false,
                        attempts: attempts.load(Ordering::Relaxed),
                    };
                }
                Ok(Lookup::NotFound) => {
                    info!("No match for '{}' via {}", query, name);
                    return Resolution {
                        outcome: ResolutionOutcome::NotFound,
                        provider: Some(name.to_string()),
                        from_cache: false,
                        attempts: attempts.load(Ordering::Relaxed),
                    };
                }
                Err(e) => {
                    match e.kind() {
                        ErrorKind::Auth | ErrorKind::Malformed => {
                            error!("{} rejected the request for '{}': {}", name, query, e)
                        }
                        _ => warn!("{} failed for '{}': {}, trying next provider", name, query, e),
                    }
                    last_failure = Some(ResolutionOutcome::from_failure(e));
                }
            }
        }

        let outcome = last_failure.unwrap_or_else(|| {
            ResolutionOutcome::ProviderError(ProviderError::Malformed(
                "no providers configured".to_string(),
            ))
        });
        Resolution {
            outcome,
            provider: None,
            from_cache: false,
            attempts: attempts.load(Ordering::Relaxed),
        }
    }

    /// Calls one adapter, bounding the call by the request timeout.
    async fn call_provider(
        &self,
        provider: &dyn GeocodingProvider,
        query: &NormalizedQuery,
    ) -> std::result::Result<Lookup, ProviderError> {
        match tokio::time::timeout(self.request_timeout, provider.resolve(query)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Transport(format!(
                "{} request timed out after {}ms",
                provider.name(),
                self.request_timeout.as_millis()
            ))),
        }
    }

    /// Acquisition mode for a second lookup within the same invocation.
    ///
    /// A non-blocking resolver waits for one slot instead, bounded by the
    /// request timeout.
    pub fn follow_up_mode(&self) -> AcquireMode {
        match self.acquire_mode {
            AcquireMode::NonBlocking => AcquireMode::Blocking {
                max_wait: self.request_timeout,
            },
            blocking => blocking,
        }
    }
}
