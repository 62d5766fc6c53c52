//! Rate Limiting for Geocoding Providers
//!
//! This module paces outbound calls to each geocoding provider with a token
//! bucket. Buckets are keyed by provider name and shared by every caller that
//! holds the same [`RateLimiter`] handle, so one process never exceeds a
//! provider's declared ceiling no matter how many resolutions run at once.
//!
//! # Architecture
//!
//! - **Unlisted providers**: always allowed (no declared limit)
//! - **Listed providers**: token bucket refilled at `requests_per_second`, holding
//!   at most `burst_size` tokens
//! - **Keyless provider**: pinned at one request per second with no burst
//!   ([`RateLimitConfig::pinned_keyless`])
//!
//! Acquisition is non-blocking by default. [`AcquireMode::Blocking`] waits for
//! the next token, but never longer than its `max_wait`.
//!
//! # Example
//!
//! ```
//! use geocoder_common::rate_limit::{AcquireMode, RateLimitConfig, RateLimiter};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let limiter = RateLimiter::from_policies([("nominatim", RateLimitConfig::pinned_keyless())]);
//!
//! assert!(limiter.acquire("nominatim", AcquireMode::NonBlocking).await.is_ok());
//! assert!(limiter.acquire("nominatim", AcquireMode::NonBlocking).await.is_err());
//!
//! // No declared limit
//! assert!(limiter.acquire("google", AcquireMode::NonBlocking).await.is_ok());
//! # });
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Token bucket parameters for one provider.
///
/// # Fields
///
/// * `requests_per_second` - Sustained refill rate
/// * `burst_size` - Bucket capacity; the bucket starts full
///
/// # Example
///
/// ```
/// use geocoder_common::rate_limit::RateLimitConfig;
///
/// let config = RateLimitConfig::new(10.0, 20);
/// assert_eq!(config.requests_per_second, 10.0);
/// assert_eq!(config.burst_size, 20);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct RateLimitConfig {
    /// Maximum sustained request rate (requests per second)
    pub requests_per_second: f64,
    /// Maximum burst size (number of tokens)
    pub burst_size: u32,
}

impl RateLimitConfig {
    /// Creates a new rate limit configuration.
    ///
    /// A zero burst size is raised to one so the bucket can ever admit a request.
    pub fn new(requests_per_second: f64, burst_size: u32) -> Self {
        Self {
            requests_per_second,
            burst_size: burst_size.max(1),
        }
    }

    /// Creates a configuration admitting `rps` requests per second.
    ///
    /// The burst size is one second's allowance (rounded up), so a caller can
    /// never exceed `rps` within any one-second window.
    ///
    /// # Example
    ///
    /// ```
    /// use geocoder_common::rate_limit::RateLimitConfig;
    ///
    /// let config = RateLimitConfig::per_second(10.0);
    /// assert_eq!(config.burst_size, 10);
    ///
    /// let config = RateLimitConfig::per_second(0.5);
    /// assert_eq!(config.burst_size, 1);
    /// ```
    pub fn per_second(rps: f64) -> Self {
        let burst_size = rps.ceil() as u32;
        Self::new(rps, burst_size)
    }

    /// The fixed policy of the free keyless provider: one request per second,
    /// no burst.
    pub fn pinned_keyless() -> Self {
        Self::new(1.0, 1)
    }
}

/// How [`RateLimiter::acquire`] behaves when the bucket is empty.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AcquireMode {
    /// Return [`RateLimited`] immediately
    #[default]
    NonBlocking,
    /// Sleep until the next token if it arrives within `max_wait`
    Blocking {
        /// Upper bound on the total time spent waiting
        max_wait: Duration,
    },
}

/// Permission to make one outbound call to a provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Permit {
    provider: String,
    waited: Duration,
}

impl Permit {
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Time spent waiting for the token (zero in non-blocking mode).
    pub fn waited(&self) -> Duration {
        self.waited
    }
}

/// The provider's bucket is empty.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("rate limit exceeded for {provider}, next slot in {retry_after:?}")]
pub struct RateLimited {
    /// Provider whose bucket is exhausted
    pub provider: String,
    /// Time until the next token will be available
    pub retry_after: Duration,
}

/// Token bucket state for a single provider.
#[derive(Debug)]
struct TokenBucket {
    /// Current number of available tokens
    tokens: f64,
    /// Last time this bucket was updated
    last_update: Instant,
}

impl TokenBucket {
    /// Creates a new token bucket with full tokens.
    fn new(burst_size: u32) -> Self {
        Self {
            tokens: burst_size as f64,
            last_update: Instant::now(),
        }
    }

    /// Refills according to elapsed time, then attempts to consume a token.
    ///
    /// # Returns
    ///
    /// `true` if a token was consumed, `false` if rate limited
    fn try_consume(&mut self, config: &RateLimitConfig, now: Instant) -> bool {
        let elapsed_secs = now.saturating_duration_since(self.last_update).as_secs_f64();

        let new_tokens = elapsed_secs * config.requests_per_second;
        self.tokens = (self.tokens + new_tokens).min(config.burst_size as f64);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Returns the time until the next token will be available.
    fn time_until_next_token(&self, config: &RateLimitConfig) -> Duration {
        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            let tokens_needed = 1.0 - self.tokens;
            let secs_needed = tokens_needed / config.requests_per_second;
            // Vanishingly small rates put the next token past any representable wait.
            Duration::try_from_secs_f64(secs_needed).unwrap_or(Duration::MAX)
        }
    }
}

/// A provider's policy together with its live bucket.
#[derive(Debug)]
struct ProviderBucket {
    config: RateLimitConfig,
    bucket: TokenBucket,
}

/// Per-provider rate limiter using the token bucket algorithm.
///
/// # Thread Safety
///
/// Buckets live behind an `Arc<RwLock<HashMap>>`; token accounting happens
/// under the write lock, so concurrent acquisitions never over-admit. Cloning
/// is cheap and yields a handle to the same buckets.
#[derive(Clone, Default)]
pub struct RateLimiter {
    buckets: Arc<RwLock<HashMap<String, ProviderBucket>>>,
}

impl RateLimiter {
    /// Creates a limiter with no declared limits; every provider is allowed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a limiter from `(provider, policy)` pairs.
    pub fn from_policies<I, S>(policies: I) -> Self
    where
        I: IntoIterator<Item = (S, RateLimitConfig)>,
        S: Into<String>,
    {
        let buckets = policies
            .into_iter()
            .map(|(provider, config)| {
                let bucket = TokenBucket::new(config.burst_size);
                (provider.into(), ProviderBucket { config, bucket })
            })
            .collect();

        Self {
            buckets: Arc::new(RwLock::new(buckets)),
        }
    }

    /// Attempts to take one token for `provider` without waiting.
    pub async fn try_acquire(&self, provider: &str) -> Result<Permit, RateLimited> {
        let mut buckets = self.buckets.write().await;
        let Some(entry) = buckets.get_mut(provider) else {
            return Ok(Permit {
                provider: provider.to_string(),
                waited: Duration::ZERO,
            });
        };

        if entry.bucket.try_consume(&entry.config, Instant::now()) {
            Ok(Permit {
                provider: provider.to_string(),
                waited: Duration::ZERO,
            })
        } else {
            Err(RateLimited {
                provider: provider.to_string(),
                retry_after: entry.bucket.time_until_next_token(&entry.config),
            })
        }
    }

    /// Acquires a token for `provider` according to `mode`.
    ///
    /// In blocking mode the limiter sleeps outside the lock and re-checks, so
    /// concurrent waiters compete fairly for refilled tokens. It gives up as
    /// soon as the next token cannot arrive before `max_wait` has elapsed.
    ///
    /// # Returns
    ///
    /// - `Ok(permit)` - a token was consumed
    /// - `Err(RateLimited)` - no token within the allowed wait
    pub async fn acquire(&self, provider: &str, mode: AcquireMode) -> Result<Permit, RateLimited> {
        let max_wait = match mode {
            AcquireMode::NonBlocking => return self.try_acquire(provider).await,
            AcquireMode::Blocking { max_wait } => max_wait,
        };

        let start = Instant::now();
        let deadline = start.checked_add(max_wait);
        loop {
            match self.try_acquire(provider).await {
                Ok(permit) => {
                    return Ok(Permit {
                        waited: start.elapsed(),
                        ..permit
                    })
                }
                Err(limited) => {
                    let ready_at = Instant::now().checked_add(limited.retry_after);
                    let in_time = match (ready_at, deadline) {
                        (Some(ready_at), Some(deadline)) => ready_at <= deadline,
                        (Some(_), None) => true,
                        (None, _) => false,
                    };
                    if !in_time {
                        return Err(limited);
                    }
                    tracing::debug!(
                        "Waiting {:?} for a {} rate limit token",
                        limited.retry_after,
                        provider
                    );
                    tokio::time::sleep(limited.retry_after).await;
                }
            }
        }
    }
}
