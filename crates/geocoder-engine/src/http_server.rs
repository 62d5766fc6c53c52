//! HTTP Server for the resolution engine
//!
//! Serves the coordinate lookup, distance and agent action surfaces plus the
//! built-in monitoring endpoints, using axum.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use geocoder_common::protocol::error::GeocoderError;
use geocoder_common::ErrorKind;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::action::{handle_action, ActionEvent};
use crate::distance::resolve_distance;
use crate::formatter::ActionResponse;
use crate::orchestrator::Resolver;

/// HTTP server for the resolver.
///
/// Routes:
/// - `GET /coordinates?city=..` and `POST /coordinates` (`{"city": ".."}`)
/// - `GET /distance?from=..&to=..`
/// - `POST /agent` - agent action-group envelope
/// - `GET /__health`, `GET /_metrics`, `GET /_info`
pub struct HttpServer {
    resolver: Arc<Resolver>,
}

impl HttpServer {
    pub fn new(resolver: Arc<Resolver>) -> Self {
        Self { resolver }
    }

    /// Builds the axum application.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/coordinates", get(coordinates_get).post(coordinates_post))
            .route("/distance", get(distance))
            .route("/agent", post(agent))
            .route("/__health", get(health_check))
            .route("/_metrics", get(metrics))
            .route("/_info", get(server_info))
            .layer(CorsLayer::permissive())
            .with_state(self.resolver.clone())
    }

    /// Runs the HTTP server.
    ///
    /// # Arguments
    /// * `addr` - Socket address to bind to (e.g., "0.0.0.0:8080")
    ///
    /// # Returns
    /// - `Ok(())` - Server ran successfully
    /// - `Err(GeocoderError::Transport)` - Server failed to bind or run
    pub async fn run(self, addr: SocketAddr) -> Result<(), GeocoderError> {
        let app = self.router();

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GeocoderError::Transport(format!("Failed to bind to {}: {}", addr, e)))?;

        info!(
            "Geocoder HTTP server listening on {}",
            listener
                .local_addr()
                .map_err(|e| GeocoderError::Transport(format!("Failed to get local addr: {}", e)))?
        );

        axum::serve(listener, app)
            .await
            .map_err(|e| GeocoderError::Transport(format!("Server error: {}", e)))?;

        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct CityRequest {
    city: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DistanceRequest {
    from: Option<String>,
    to: Option<String>,
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn reply(response: ActionResponse) -> (StatusCode, Json<ActionResponse>) {
    (status(response.http_status()), Json(response))
}

fn invalid(message: &str) -> (StatusCode, Json<ActionResponse>) {
    reply(ActionResponse::error(ErrorKind::Validation, message))
}

async fn resolve_city(resolver: &Resolver, city: Option<String>) -> (StatusCode, Json<ActionResponse>) {
    let Some(city) = city else {
        return invalid("city parameter is required");
    };

    match resolver.resolve(&city).await {
        Ok(resolution) => reply(ActionResponse::from_outcome(&resolution.outcome)),
        Err(e) => reply(ActionResponse::from_error(&e)),
    }
}

async fn coordinates_get(
    State(resolver): State<Arc<Resolver>>,
    Query(request): Query<CityRequest>,
) -> impl IntoResponse {
    resolve_city(&resolver, request.city).await
}

async fn coordinates_post(State(resolver): State<Arc<Resolver>>, body: Bytes) -> impl IntoResponse {
    match serde_json::from_slice::<CityRequest>(&body) {
        Ok(request) => resolve_city(&resolver, request.city).await,
        Err(e) => invalid(&format!("request body must be {{\"city\": \"...\"}}: {}", e)),
    }
}

async fn distance(
    State(resolver): State<Arc<Resolver>>,
    Query(request): Query<DistanceRequest>,
) -> impl IntoResponse {
    let (Some(from), Some(to)) = (request.from, request.to) else {
        return invalid("both from and to parameters are required").into_response();
    };

    match resolve_distance(&resolver, &from, &to).await {
        Ok(response) => (status(response.http_status()), Json(response)).into_response(),
        Err(e) => reply(ActionResponse::from_error(&e)).into_response(),
    }
}

/// Handles agent action events.
///
/// The transport status is always 200 once the event parses; the envelope's
/// own `httpStatusCode` carries the outcome.
async fn agent(State(resolver): State<Arc<Resolver>>, body: Bytes) -> impl IntoResponse {
    match serde_json::from_slice::<ActionEvent>(&body) {
        Ok(event) => (StatusCode::OK, Json(handle_action(&resolver, &event).await)).into_response(),
        Err(e) => invalid(&format!("invalid action event: {}", e)).into_response(),
    }
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn metrics(State(resolver): State<Arc<Resolver>>) -> impl IntoResponse {
    Json(resolver.metrics().snapshot())
}

async fn server_info(State(resolver): State<Arc<Resolver>>) -> impl IntoResponse {
    Json(
        resolver
            .metrics()
            .info(resolver.provider_names(), resolver.cache().len()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResultCache;
    use geocoder_common::rate_limit::RateLimiter;
    use geocoder_metrics::ResolverMetrics;

    fn empty_resolver() -> Arc<Resolver> {
        Arc::new(Resolver::new(
            Vec::new(),
            Arc::new(ResultCache::new(None)),
            RateLimiter::new(),
            ResolverMetrics::new(),
        ))
    }

    #[tokio::test]
    async fn test_http_server_creation() {
        let resolver = empty_resolver();
        let server = HttpServer::new(resolver.clone());
        let _router = server.router();
        assert!(Arc::strong_count(&resolver) >= 2);
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = health_check().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_city_is_bad_request() {
        let resolver = empty_resolver();
        let (code, Json(body)) = resolve_city(&resolver, None).await;

        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(body.error_kind(), Some(ErrorKind::Validation));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status(429), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(status(503), StatusCode::SERVICE_UNAVAILABLE);
    }
}
