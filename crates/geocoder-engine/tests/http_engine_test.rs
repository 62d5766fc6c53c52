//! Engine HTTP Integration Tests
//!
//! These tests run the full stack in-process:
//! - a mock upstream (Nominatim and Google wire formats) on one port
//! - a `Resolver` built from `EngineConfig` pointed at the mock
//! - the engine's `HttpServer` on another port, driven with `reqwest`
//!
//! All servers bind `127.0.0.1:0`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use geocoder_common::{EngineConfig, ProviderConfig, ProviderKind};
use geocoder_engine::{HttpServer, Resolver};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Known places served by the mock upstream.
fn gazetteer(name: &str) -> Option<(f64, f64, &'static str, &'static str)> {
    match name {
        "tokyo" => Some((35.6762, 139.6503, "Tokyo, Japan", "jp")),
        "paris" => Some((48.8566, 2.3522, "Paris, France", "fr")),
        "london" => Some((51.5074, -0.1278, "London, United Kingdom", "gb")),
        _ => None,
    }
}

#[derive(Clone, Default)]
struct UpstreamCounters {
    nominatim: Arc<AtomicUsize>,
    google: Arc<AtomicUsize>,
}

async fn nominatim_search(
    State(counters): State<UpstreamCounters>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    counters.nominatim.fetch_add(1, Ordering::SeqCst);
    let q = params.get("q").cloned().unwrap_or_default();
    match gazetteer(&q) {
        Some((lat, lon, name, _)) => Json(json!([{
            "lat": lat.to_string(),
            "lon": lon.to_string(),
            "display_name": name,
        }])),
        None => Json(json!([])),
    }
}

async fn google_geocode(
    State(counters): State<UpstreamCounters>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    counters.google.fetch_add(1, Ordering::SeqCst);
    let address = params.get("address").cloned().unwrap_or_default();
    match gazetteer(&address) {
        Some((lat, lng, name, code)) => Json(json!({
            "status": "OK",
            "results": [{
                "formatted_address": name,
                "geometry": { "location": { "lat": lat, "lng": lng }, "location_type": "APPROXIMATE" },
                "address_components": [
                    { "long_name": code.to_uppercase(), "short_name": code.to_uppercase(), "types": ["country"] }
                ]
            }]
        })),
        None => Json(json!({ "status": "ZERO_RESULTS", "results": [] })),
    }
}

async fn spawn(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn spawn_upstream() -> (String, UpstreamCounters) {
    let counters = UpstreamCounters::default();
    let app = Router::new()
        .route("/search", get(nominatim_search))
        .route("/maps/api/geocode/json", get(google_geocode))
        .with_state(counters.clone());
    (spawn(app).await, counters)
}

/// Starts the engine over `providers` and returns its base URL.
async fn spawn_engine(providers: Vec<ProviderConfig>) -> String {
    let config = EngineConfig::new(providers).unwrap();
    let resolver = Arc::new(Resolver::from_config(&config).unwrap());
    spawn(HttpServer::new(resolver).router()).await
}

fn nominatim(upstream: &str) -> ProviderConfig {
    ProviderConfig::new(ProviderKind::Nominatim).with_base_url(upstream)
}

fn google(upstream: &str) -> ProviderConfig {
    ProviderConfig::new(ProviderKind::Google)
        .with_api_key(Some("test-key".to_string()))
        .with_base_url(upstream)
}

async fn closed_port() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_tokyo_then_cached_variant() {
    let (upstream, counters) = spawn_upstream().await;
    let engine = spawn_engine(vec![nominatim(&upstream)]).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/coordinates", engine))
        .query(&[("city", "Tokyo")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["latitude"], 35.6762);
    assert_eq!(body["longitude"], 139.6503);
    assert_eq!(body["matchedName"], "Tokyo, Japan");

    let again: Value = client
        .get(format!("{}/coordinates", engine))
        .query(&[("city", " tokyo ")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(again["matchedName"], "Tokyo, Japan");
    assert_eq!(counters.nominatim.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_post_empty_city_is_validation() {
    let (upstream, counters) = spawn_upstream().await;
    let engine = spawn_engine(vec![nominatim(&upstream)]).await;

    let response = reqwest::Client::new()
        .post(format!("{}/coordinates", engine))
        .json(&json!({ "city": "   " }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["kind"], "VALIDATION");
    assert_eq!(counters.nominatim.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_not_found_never_falls_back() {
    let (upstream, counters) = spawn_upstream().await;
    let engine = spawn_engine(vec![nominatim(&upstream), google(&upstream)]).await;

    let response = reqwest::Client::new()
        .post(format!("{}/coordinates", engine))
        .json(&json!({ "city": "Nonexistentplacexyz" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "notFound": true }));
    assert_eq!(counters.nominatim.load(Ordering::SeqCst), 1);
    assert_eq!(counters.google.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_transport_failure_falls_back() {
    let (upstream, counters) = spawn_upstream().await;
    let dead = closed_port().await;
    let engine = spawn_engine(vec![google(&dead), nominatim(&upstream)]).await;

    let body: Value = reqwest::get(format!("{}/coordinates?city=Paris", engine))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["matchedName"], "Paris, France");
    assert_eq!(body["source"], "nominatim");
    assert_eq!(counters.nominatim.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_keyless_burst_is_rate_limited() {
    let (upstream, counters) = spawn_upstream().await;
    let engine = spawn_engine(vec![nominatim(&upstream)]).await;
    let client = reqwest::Client::new();

    let first = client
        .get(format!("{}/coordinates?city=Paris", engine))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = client
        .get(format!("{}/coordinates?city=London", engine))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["error"]["kind"], "RATE_LIMITED");
    assert_eq!(counters.nominatim.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_keyed_provider_without_key_degrades() {
    let (upstream, counters) = spawn_upstream().await;
    let keyless_google = ProviderConfig::new(ProviderKind::Google).with_base_url(upstream.as_str());
    let engine = spawn_engine(vec![keyless_google, nominatim(&upstream)]).await;

    let body: Value = reqwest::get(format!("{}/coordinates?city=London", engine))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["source"], "nominatim");
    assert_eq!(counters.google.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_distance_endpoint() {
    let (upstream, _) = spawn_upstream().await;
    let engine = spawn_engine(vec![google(&upstream)]).await;

    let body: Value = reqwest::get(format!("{}/distance?from=London&to=Paris", engine))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let km = body["distance"]["distanceKm"].as_f64().unwrap();
    assert!((km - 343.5).abs() < 2.0, "{}", km);
    assert_eq!(body["distance"]["direction"], "SE");
    assert_eq!(body["travelContext"]["summary"], "From GB to FR");
}

#[tokio::test]
async fn test_distance_with_default_keyless_provider() {
    let (upstream, counters) = spawn_upstream().await;
    let engine = spawn_engine(vec![nominatim(&upstream)]).await;

    let response = reqwest::get(format!("{}/distance?from=London&to=Paris", engine))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();

    assert_eq!(body["source"]["matchedName"], "London, United Kingdom");
    assert_eq!(body["destination"]["matchedName"], "Paris, France");
    let km = body["distance"]["distanceKm"].as_f64().unwrap();
    assert!((km - 343.5).abs() < 2.0, "{}", km);
    assert_eq!(body["distance"]["direction"], "SE");
    assert!(body.get("note").is_none());
    assert_eq!(counters.nominatim.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_agent_two_cities_action() {
    let (upstream, _) = spawn_upstream().await;
    let engine = spawn_engine(vec![google(&upstream)]).await;

    let event = json!({
        "messageVersion": "1.0",
        "actionGroup": "CityCoordinatesActions",
        "apiPath": "/getTwoCitiesCoordinates",
        "httpMethod": "GET",
        "parameters": [
            { "name": "sourceCity", "type": "string", "value": "Tokyo" },
            { "name": "destinationCity", "type": "string", "value": "Atlantis" }
        ]
    });
    let envelope: Value = reqwest::Client::new()
        .post(format!("{}/agent", engine))
        .json(&event)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(envelope["messageVersion"], "1.0");
    assert_eq!(envelope["response"]["httpStatusCode"], 200);
    let body: Value = serde_json::from_str(
        envelope["response"]["responseBody"]["application/json"]["body"]
            .as_str()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(body["source"]["matchedName"], "Tokyo, Japan");
    assert_eq!(body["destination"], json!({ "notFound": true }));
    assert!(body.get("distance").is_none());
    assert!(body["note"].as_str().unwrap().contains("could not be geocoded"));
}

#[tokio::test]
async fn test_monitoring_endpoints() {
    let (upstream, _) = spawn_upstream().await;
    let engine = spawn_engine(vec![google(&upstream), nominatim(&upstream)]).await;

    let health = reqwest::get(format!("{}/__health", engine)).await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(health.text().await.unwrap(), "OK");

    reqwest::get(format!("{}/coordinates?city=Tokyo", engine)).await.unwrap();
    reqwest::get(format!("{}/coordinates?city=Tokyo", engine)).await.unwrap();

    let metrics: Value = reqwest::get(format!("{}/_metrics", engine))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(metrics["totalRequests"], 2);
    assert_eq!(metrics["cacheHits"], 1);
    assert_eq!(metrics["outcomes"]["found"], 2);
    assert_eq!(metrics["providers"]["google"]["attempts"], 1);

    let info: Value = reqwest::get(format!("{}/_info", engine))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(info["providers"], json!(["google", "nominatim"]));
    assert_eq!(info["cacheEntries"], 1);
}
