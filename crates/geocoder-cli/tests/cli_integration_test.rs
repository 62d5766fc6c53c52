//! CLI Integration Tests
//!
//! Runs the built `geocoder` binary end to end. Tests that need an upstream
//! provider point `--base-url` at an in-process axum mock bound to
//! `127.0.0.1:0`.

use std::io::Write;
use std::process::{Command, Stdio};

use axum::extract::Query;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::net::TcpListener;

fn geocoder() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_geocoder"));
    command
        .env_remove("RUST_LOG")
        .env_remove("GEOCODING_PROVIDER")
        .env_remove("GEOCODING_FALLBACK")
        .env_remove("OPENCAGE_API_KEY")
        .env_remove("GOOGLE_MAPS_API_KEY");
    command
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({}): {}",
            e,
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

async fn nominatim_search(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    match params.get("q").map(String::as_str) {
        Some("tokyo") => Json(json!([{
            "lat": "35.6762",
            "lon": "139.6503",
            "display_name": "Tokyo, Japan",
        }])),
        _ => Json(json!([])),
    }
}

async fn spawn_nominatim() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/search", get(nominatim_search));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Runs the binary off the async runtime so the mock keeps serving.
async fn run(mut command: Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || command.output().unwrap())
        .await
        .unwrap()
}

#[test]
fn test_help_lists_subcommands() {
    let output = geocoder().arg("--help").output().unwrap();
    let text = String::from_utf8_lossy(&output.stdout);

    for subcommand in ["serve", "resolve", "distance", "invoke"] {
        assert!(text.contains(subcommand), "help is missing {}: {}", subcommand, text);
    }
}

#[test]
fn test_resolve_empty_name_is_validation() {
    let output = geocoder().args(["resolve", "   "]).output().unwrap();

    assert!(!output.status.success());
    let body = stdout_json(&output);
    assert_eq!(body["error"]["kind"], "VALIDATION");
}

#[test]
fn test_unknown_provider_fails_startup() {
    let output = geocoder()
        .args(["--provider", "bing", "resolve", "Tokyo"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("bing"));
}

#[test]
fn test_base_url_requires_scheme() {
    let output = geocoder()
        .args(["--base-url", "nominatim=127.0.0.1:9", "resolve", "Tokyo"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("http://"));
}

#[test]
fn test_invoke_unknown_path_from_stdin() {
    let mut child = geocoder()
        .arg("invoke")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    let event = json!({
        "messageVersion": "1.0",
        "actionGroup": "CityCoordinatesActions",
        "apiPath": "/getWeather",
        "httpMethod": "GET",
        "parameters": []
    });
    child
        .stdin
        .take()
        .unwrap()
        .write_all(event.to_string().as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(!output.status.success());
    let envelope = stdout_json(&output);
    assert_eq!(envelope["response"]["httpStatusCode"], 404);
    assert_eq!(envelope["response"]["apiPath"], "/getWeather");
}

#[tokio::test]
async fn test_resolve_against_mock_provider() {
    let base = spawn_nominatim().await;

    let mut command = geocoder();
    command.args(["--base-url", &format!("nominatim={}", base), "resolve", "Tokyo"]);
    let output = run(command).await;

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let body = stdout_json(&output);
    assert_eq!(body["latitude"], 35.6762);
    assert_eq!(body["longitude"], 139.6503);
    assert_eq!(body["matchedName"], "Tokyo, Japan");
}

#[tokio::test]
async fn test_resolve_not_found_exits_zero() {
    let base = spawn_nominatim().await;

    let mut command = geocoder();
    command.args(["--base-url", &format!("nominatim={}", base), "resolve", "Atlantis"]);
    let output = run(command).await;

    assert!(output.status.success());
    assert_eq!(stdout_json(&output), json!({ "notFound": true }));
}
