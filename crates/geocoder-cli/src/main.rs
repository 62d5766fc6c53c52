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

//! # Geocoder CLI Entry Point
//!
//! ## Usage
//!
//! ```bash
//! # Serve the HTTP API with Google first and Nominatim as fallback
//! GOOGLE_MAPS_API_KEY=... geocoder --provider google --fallback nominatim serve -b 0.0.0.0:8080
//!
//! # Resolve one place name (outputs raw JSON)
//! geocoder resolve Tokyo
//!
//! # Distance between two places
//! geocoder distance London Paris
//!
//! # Run one agent action event from a file, or from stdin
//! geocoder invoke -e event.json
//! cat event.json | geocoder invoke
//! ```
//!
//! Provider options go before the subcommand.

use std::io::Read;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use argh::FromArgs;
use geocoder_cli::settings::{filter_directive, Settings, LOG_LEVEL_ENV};
use geocoder_engine::{handle_action, resolve_distance, ActionEvent, ActionResponse, HttpServer, Resolver};
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// Geocoder - resolve place names to coordinates
struct Cli {
    /// primary provider: nominatim, opencage or google
    ///
    /// Falls back to the GEOCODING_PROVIDER env var, then nominatim.
    #[argh(option, short = 'p')]
    provider: Option<String>,

    /// fallback provider, tried in order after the primary (repeatable)
    ///
    /// Falls back to the comma-separated GEOCODING_FALLBACK env var.
    #[argh(option, short = 'f')]
    fallback: Vec<String>,

    /// the OpenCage API key (default: OPENCAGE_API_KEY env var)
    #[argh(option, long = "opencage-key")]
    opencage_key: Option<String>,

    /// the Google Maps API key (default: GOOGLE_MAPS_API_KEY env var)
    #[argh(option, long = "google-key")]
    google_key: Option<String>,

    /// per-provider rate limit as provider=rps or provider=none (repeatable)
    ///
    /// The nominatim limit can only be lowered.
    #[argh(option, long = "rate-limit")]
    rate_limit: Vec<String>,

    /// per-provider endpoint override as provider=url (repeatable)
    ///
    /// Must include the http:// or https:// prefix.
    #[argh(option, long = "base-url")]
    base_url: Vec<String>,

    /// timeout for each provider call in milliseconds (default 10000)
    #[argh(option, long = "request-timeout-ms")]
    request_timeout_ms: Option<u64>,

    /// optional bound on a whole resolution in milliseconds
    #[argh(option, long = "invocation-timeout-ms")]
    invocation_timeout_ms: Option<u64>,

    /// cache entry lifetime in seconds (default: never expire)
    #[argh(option, long = "cache-ttl-secs")]
    cache_ttl_secs: Option<u64>,

    /// wait up to this many milliseconds for a rate limit token
    ///
    /// Without it, a provider with no token is reported as rate limited
    /// immediately.
    #[argh(option, long = "blocking-wait-ms")]
    blocking_wait_ms: Option<u64>,

    /// the User-Agent sent to providers
    #[argh(option, long = "user-agent")]
    user_agent: Option<String>,

    #[argh(subcommand)]
    command: Commands,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            provider: self.provider.clone(),
            fallback: self.fallback.clone(),
            opencage_key: self.opencage_key.clone(),
            google_key: self.google_key.clone(),
            rate_limits: self.rate_limit.clone(),
            base_urls: self.base_url.clone(),
            request_timeout_ms: self.request_timeout_ms,
            invocation_timeout_ms: self.invocation_timeout_ms,
            cache_ttl_secs: self.cache_ttl_secs,
            blocking_wait_ms: self.blocking_wait_ms,
            user_agent: self.user_agent.clone(),
        }
    }
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Serve(ServeArgs),
    Resolve(ResolveArgs),
    Distance(DistanceArgs),
    Invoke(InvokeArgs),
}

#[derive(FromArgs)]
#[argh(subcommand, name = "serve")]
/// serve the HTTP API
struct ServeArgs {
    /// address to bind the HTTP server to
    #[argh(option, short = 'b', default = "\"0.0.0.0:8080\".into()")]
    bind: String,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "resolve")]
/// resolve one place name and print the JSON body
struct ResolveArgs {
    /// the place name, e.g. "Tokyo"
    #[argh(positional)]
    city: String,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "distance")]
/// resolve two place names and print the distance between them
struct DistanceArgs {
    /// source place name
    #[argh(positional)]
    from: String,

    /// destination place name
    #[argh(positional)]
    to: String,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "invoke")]
/// run one agent action event and print the envelope
struct InvokeArgs {
    /// path to the event JSON; reads stdin when omitted
    #[argh(option, short = 'e', long = "event")]
    event: Option<String>,
}

/// Initializes tracing.
///
/// `RUST_LOG` wins, then `LOG_LEVEL`, then `default`. One-shot commands
/// log to stderr so stdout stays pipeable.
fn init_tracing(default: &str, to_stderr: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let log_level = std::env::var(LOG_LEVEL_ENV).ok();
        EnvFilter::new(filter_directive(log_level.as_deref(), default))
    });

    if to_stderr {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

fn build_resolver(cli: &Cli) -> Result<Resolver> {
    let config = cli
        .settings()
        .into_engine_config(&|name: &str| std::env::var(name).ok())?;
    tracing::info!("Provider order: {:?}", config.provider_names());
    Ok(Resolver::from_config(&config)?)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli: Cli = argh::from_env();

    match &cli.command {
        Commands::Serve(_) => init_tracing("info", false),
        _ => init_tracing("warn", true),
    }

    let resolver = build_resolver(&cli)?;

    match cli.command {
        Commands::Serve(args) => {
            tracing::info!("Starting geocoder HTTP server");
            let addr: SocketAddr = args
                .bind
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid bind address {}: {}", args.bind, e))?;
            HttpServer::new(Arc::new(resolver)).run(addr).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Resolve(args) => run_resolve(&resolver, &args.city).await,
        Commands::Distance(args) => run_distance(&resolver, &args.from, &args.to).await,
        Commands::Invoke(args) => run_invoke(&resolver, args.event.as_deref()).await,
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Executes the `resolve` subcommand.
///
/// Prints the formatted body to stdout. Found and not-found exit 0; any
/// error body exits 1.
async fn run_resolve(resolver: &Resolver, city: &str) -> Result<ExitCode> {
    let response = match resolver.resolve(city).await {
        Ok(resolution) => ActionResponse::from_outcome(&resolution.outcome),
        Err(e) => ActionResponse::from_error(&e),
    };

    println!("{}", serde_json::to_string(&response)?);
    Ok(exit_code(response.error_kind().is_none()))
}

/// Executes the `distance` subcommand.
async fn run_distance(resolver: &Resolver, from: &str, to: &str) -> Result<ExitCode> {
    match resolve_distance(resolver, from, to).await {
        Ok(response) => {
            println!("{}", serde_json::to_string(&response)?);
            let success = response.source.error_kind().is_none()
                && response.destination.error_kind().is_none();
            Ok(exit_code(success))
        }
        Err(e) => {
            println!("{}", serde_json::to_string(&ActionResponse::from_error(&e))?);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Executes the `invoke` subcommand.
///
/// Exits 1 when the envelope carries a 4xx or 5xx status.
async fn run_invoke(resolver: &Resolver, path: Option<&str>) -> Result<ExitCode> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read event file {}", path))?,
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("Failed to read event from stdin")?;
            raw
        }
    };

    let event: ActionEvent = serde_json::from_str(&raw).context("Invalid action event JSON")?;
    let envelope = handle_action(resolver, &event).await;

    println!("{}", serde_json::to_string(&envelope)?);
    Ok(exit_code(envelope.status() < 400))
}
