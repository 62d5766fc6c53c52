// Copyright 2025 Geocoder Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Startup settings.
//!
//! Flags win over environment variables, which win over built-in defaults.
//! The environment is passed in as a lookup function so the merge can be
//! tested without touching the process environment.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use geocoder_common::rate_limit::RateLimitConfig;
use geocoder_common::{EngineConfig, ProviderConfig, ProviderKind};

pub const PROVIDER_ENV: &str = "GEOCODING_PROVIDER";
pub const FALLBACK_ENV: &str = "GEOCODING_FALLBACK";
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Slowest accepted `--rate-limit`: one request per day.
pub const MIN_RATE_PER_SECOND: f64 = 1.0 / 86_400.0;

/// Validates that a URL string starts with http:// or https://
///
/// # Arguments
///
/// * `url` - The URL string to validate
/// * `description` - Human-readable description of what the URL is for (e.g., "nominatim base URL")
pub fn validate_http_url(url: &str, description: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow!(
            "Invalid {}: '{}' must start with http:// or https://",
            description,
            url
        ))
    }
}

/// Raw startup settings, as given on the command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    /// Primary provider name
    pub provider: Option<String>,
    /// Fallback provider names, in order
    pub fallback: Vec<String>,
    pub opencage_key: Option<String>,
    pub google_key: Option<String>,
    /// `provider=rps` or `provider=none` entries
    pub rate_limits: Vec<String>,
    /// `provider=url` entries
    pub base_urls: Vec<String>,
    pub request_timeout_ms: Option<u64>,
    pub invocation_timeout_ms: Option<u64>,
    pub cache_ttl_secs: Option<u64>,
    pub blocking_wait_ms: Option<u64>,
    pub user_agent: Option<String>,
}

impl Settings {
    /// Merges the settings with the environment into an [`EngineConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error for unknown provider names, malformed `--rate-limit`
    /// or `--base-url` entries, a zero request timeout, or a provider order
    /// the engine rejects.
    pub fn into_engine_config(self, env: &dyn Fn(&str) -> Option<String>) -> Result<EngineConfig> {
        let order = self.provider_order(env)?;

        let rate_limits = parse_assignments(&self.rate_limits, "rate limit")?
            .into_iter()
            .map(|(kind, value)| Ok((kind, parse_rate(kind, &value)?)))
            .collect::<Result<HashMap<_, _>>>()?;

        let base_urls = parse_assignments(&self.base_urls, "base URL")?;
        for (kind, url) in &base_urls {
            validate_http_url(url, &format!("{} base URL", kind))?;
        }
        let base_urls: HashMap<_, _> = base_urls.into_iter().collect();

        let mut providers = Vec::with_capacity(order.len());
        for kind in order {
            let mut provider =
                ProviderConfig::new(kind).with_api_key(self.credential(kind, env));
            if let Some(rate_limit) = rate_limits.get(&kind) {
                provider = provider.with_rate_limit(rate_limit.clone());
            }
            if let Some(url) = base_urls.get(&kind) {
                provider = provider.with_base_url(url.as_str());
            }
            if !provider.is_selectable() {
                tracing::warn!(
                    "Provider {} has no API key and will be skipped",
                    provider.name()
                );
            }
            providers.push(provider);
        }

        let mut config = EngineConfig::new(providers)?;

        if let Some(ms) = self.request_timeout_ms {
            if ms == 0 {
                bail!("request timeout must be greater than zero");
            }
            config = config.with_request_timeout(Duration::from_millis(ms));
        }

        Ok(config
            .with_invocation_timeout(self.invocation_timeout_ms.map(Duration::from_millis))
            .with_cache_ttl(self.cache_ttl_secs.map(Duration::from_secs))
            .with_blocking_wait(self.blocking_wait_ms.map(Duration::from_millis))
            .with_user_agent(
                self.user_agent
                    .unwrap_or_else(|| geocoder_common::config::DEFAULT_USER_AGENT.to_string()),
            ))
    }

    /// Primary then fallbacks, without duplicates.
    fn provider_order(&self, env: &dyn Fn(&str) -> Option<String>) -> Result<Vec<ProviderKind>> {
        let primary = self
            .provider
            .clone()
            .or_else(|| env(PROVIDER_ENV))
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| ProviderKind::Nominatim.name().to_string());

        let fallback = if self.fallback.is_empty() {
            env(FALLBACK_ENV)
                .map(|list| list.split(',').map(str::to_string).collect())
                .unwrap_or_default()
        } else {
            self.fallback.clone()
        };

        let mut order = Vec::new();
        for name in std::iter::once(primary).chain(fallback) {
            if name.trim().is_empty() {
                continue;
            }
            let kind: ProviderKind = name
                .parse()
                .with_context(|| format!("invalid provider '{}'", name.trim()))?;
            if order.contains(&kind) {
                tracing::warn!("Provider {} listed more than once; keeping the first", kind);
                continue;
            }
            order.push(kind);
        }
        Ok(order)
    }

    fn credential(&self, kind: ProviderKind, env: &dyn Fn(&str) -> Option<String>) -> Option<String> {
        let flag = match kind {
            ProviderKind::Nominatim => None,
            ProviderKind::OpenCage => self.opencage_key.clone(),
            ProviderKind::Google => self.google_key.clone(),
        };
        flag.or_else(|| kind.credential_env_var().and_then(env))
    }
}

/// Splits `provider=value` entries.
fn parse_assignments(entries: &[String], what: &str) -> Result<Vec<(ProviderKind, String)>> {
    entries
        .iter()
        .map(|entry| {
            let (name, value) = entry
                .split_once('=')
                .ok_or_else(|| anyhow!("invalid {} '{}': expected provider=value", what, entry))?;
            let kind: ProviderKind = name
                .parse()
                .with_context(|| format!("invalid {} '{}'", what, entry))?;
            Ok((kind, value.trim().to_string()))
        })
        .collect()
}

fn parse_rate(kind: ProviderKind, value: &str) -> Result<Option<RateLimitConfig>> {
    if value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    let rps: f64 = value
        .parse()
        .with_context(|| format!("invalid rate limit for {}: '{}'", kind, value))?;
    if !rps.is_finite() || rps < MIN_RATE_PER_SECOND {
        bail!(
            "rate limit for {} must be a finite number of at least {} requests/second, got {}",
            kind,
            MIN_RATE_PER_SECOND,
            value
        );
    }
    Ok(Some(RateLimitConfig::per_second(rps)))
}

/// Maps a `LOG_LEVEL` value to an `EnvFilter` directive.
///
/// Accepts the usual level names case-insensitively, including `WARNING`
/// and `CRITICAL`. Anything else falls back to `default`.
pub fn filter_directive(log_level: Option<&str>, default: &str) -> String {
    let level = match log_level.map(|l| l.trim().to_ascii_lowercase()) {
        Some(level) => level,
        None => return default.to_string(),
    };
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" | "off" => level,
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        _ => default.to_string(),
    }
}
