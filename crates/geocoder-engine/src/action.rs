//! Agent action-group envelope.
//!
//! The agent runtime sends an event naming an `apiPath` and a flat parameter
//! list, and expects the response body back as a JSON *string* nested under
//! `responseBody["application/json"].body`.

use std::collections::HashMap;

use geocoder_common::ErrorKind;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::distance::resolve_distance;
use crate::formatter::{ActionResponse, ErrorBody, ErrorDetail};
use crate::orchestrator::Resolver;

pub const MESSAGE_VERSION: &str = "1.0";

pub const CITY_COORDINATES_PATH: &str = "/getCityCoordinates";
pub const TWO_CITIES_PATH: &str = "/getTwoCitiesCoordinates";

/// One named parameter of an action event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionParameter {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub value: String,
}

/// Inbound action-group event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEvent {
    #[serde(default)]
    pub message_version: String,
    #[serde(default)]
    pub action_group: String,
    #[serde(default)]
    pub api_path: String,
    #[serde(default = "default_http_method")]
    pub http_method: String,
    #[serde(default)]
    pub parameters: Vec<ActionParameter>,
}

fn default_http_method() -> String {
    "GET".to_string()
}

impl ActionEvent {
    /// Parameters by name. Nameless entries are ignored; later duplicates win.
    pub fn parameter_map(&self) -> HashMap<&str, &str> {
        self.parameters
            .iter()
            .filter(|p| !p.name.is_empty())
            .map(|p| (p.name.as_str(), p.value.as_str()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonBody {
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseBody {
    #[serde(rename = "application/json")]
    pub application_json: JsonBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub action_group: String,
    pub api_path: String,
    pub http_method: String,
    pub http_status_code: u16,
    pub response_body: ResponseBody,
}

/// Outbound envelope returned to the agent runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEnvelope {
    pub message_version: String,
    pub response: ActionResult,
}

impl ActionEnvelope {
    /// Wraps `body` for `event`, serializing it into the nested string field.
    pub fn new<T: Serialize>(event: &ActionEvent, status: u16, body: &T) -> Self {
        let body = serde_json::to_string(body).unwrap_or_else(|e| {
            serde_json::json!({
                "error": {
                    "kind": "MALFORMED",
                    "message": format!("failed to encode response: {}", e),
                }
            })
            .to_string()
        });

        Self {
            message_version: MESSAGE_VERSION.to_string(),
            response: ActionResult {
                action_group: event.action_group.clone(),
                api_path: event.api_path.clone(),
                http_method: event.http_method.clone(),
                http_status_code: status,
                response_body: ResponseBody {
                    application_json: JsonBody { body },
                },
            },
        }
    }

    /// The nested response body string.
    pub fn body(&self) -> &str {
        &self.response.response_body.application_json.body
    }

    pub fn status(&self) -> u16 {
        self.response.http_status_code
    }
}

/// Routes one action event and wraps the result.
///
/// Never fails: every problem is expressed as an error body with a status.
pub async fn handle_action(resolver: &Resolver, event: &ActionEvent) -> ActionEnvelope {
    let params = event.parameter_map();
    debug!("Action {} with {} parameters", event.api_path, params.len());

    let envelope = match event.api_path.as_str() {
        CITY_COORDINATES_PATH => match non_blank(&params, "cityName") {
            Some(city) => {
                let response = match resolver.resolve(city).await {
                    Ok(resolution) => ActionResponse::from_outcome(&resolution.outcome),
                    Err(e) => ActionResponse::from_error(&e),
                };
                ActionEnvelope::new(event, response.http_status(), &response)
            }
            None => validation(event, "cityName parameter is required"),
        },
        TWO_CITIES_PATH => {
            match (
                non_blank(&params, "sourceCity"),
                non_blank(&params, "destinationCity"),
            ) {
                (Some(source), Some(destination)) => {
                    match resolve_distance(resolver, source, destination).await {
                        Ok(response) => ActionEnvelope::new(event, response.http_status(), &response),
                        Err(e) => {
                            let response = ActionResponse::from_error(&e);
                            ActionEnvelope::new(event, response.http_status(), &response)
                        }
                    }
                }
                _ => validation(
                    event,
                    "Both sourceCity and destinationCity parameters are required",
                ),
            }
        }
        other => {
            let response = ActionResponse::Error(ErrorBody {
                error: ErrorDetail {
                    kind: ErrorKind::Malformed,
                    message: format!("Unknown API path: {}", other),
                    retry_after_ms: None,
                },
                supported_paths: Some(vec![
                    CITY_COORDINATES_PATH.to_string(),
                    TWO_CITIES_PATH.to_string(),
                ]),
            });
            ActionEnvelope::new(event, 404, &response)
        }
    };

    info!(
        "Action {} completed with status {}",
        event.api_path,
        envelope.status()
    );
    envelope
}

fn non_blank<'a>(params: &HashMap<&str, &'a str>, name: &str) -> Option<&'a str> {
    params.get(name).copied().filter(|v| !v.trim().is_empty())
}

fn validation(event: &ActionEvent, message: &str) -> ActionEnvelope {
    let response = ActionResponse::error(ErrorKind::Validation, message);
    ActionEnvelope::new(event, 400, &response)
}
