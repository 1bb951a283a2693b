//! HTTP client for the vendor cloud API.
//!
//! Every exchange carries the `X-Gizwits-Application-Id` header;
//! authenticated calls add `X-Gizwits-User-token`. The login and control
//! endpoints expect `Content-Type: text/plain` even though the bodies are
//! JSON; the vendor endpoint rejects anything else.

use crate::endpoints::Endpoints;
use reqwest::Client;
use serde_json::{json, Value};
use spalink_core::{Command, DeviceState};
use std::time::Duration;

const APP_ID_HEADER: &str = "X-Gizwits-Application-Id";
const USER_TOKEN_HEADER: &str = "X-Gizwits-User-token";

/// Default request timeout for all API calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// API client configuration.
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL of the vendor cloud API (e.g. <https://euapi.gizwits.com/app>)
    pub base_url: String,
    /// Application id issued by the vendor
    pub application_id: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://euapi.gizwits.com/app".to_string(),
            application_id: String::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Session material returned by a successful login.
#[derive(Debug, Clone)]
pub struct Session {
    /// Session token required on all authenticated calls
    pub token: String,
    /// Account uid, when the API reports one
    pub uid: Option<String>,
}

/// HTTP client for the spa cloud API.
pub struct ApiClient {
    client: Client,
    endpoints: Endpoints,
    config: ApiClientConfig,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying HTTP client cannot be created.
    pub fn new(config: ApiClientConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Init(e.to_string()))?;

        let endpoints = Endpoints::new(&config.base_url);

        Ok(Self {
            client,
            endpoints,
            config,
        })
    }

    /// Log in with account credentials.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Auth` on a non-200 response or a body without a
    /// `token` field. The caller must persist the returned session.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let url = self.endpoints.login();
        let body = json!({"username": email, "password": password});

        tracing::debug!(url, "POST login");

        let response = self
            .client
            .post(&url)
            .header(APP_ID_HEADER, &self.config.application_id)
            .header("Content-Type", "text/plain")
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(ApiError::Auth {
                status: status.as_u16(),
                message: text,
            });
        }

        let body: Value =
            serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))?;

        let Some(token) = body.get("token").and_then(Value::as_str) else {
            return Err(ApiError::Auth {
                status: status.as_u16(),
                message: body.to_string(),
            });
        };
        let uid = body
            .get("uid")
            .and_then(Value::as_str)
            .map(ToString::to_string);

        tracing::info!("login accepted");
        Ok(Session {
            token: token.to_string(),
            uid,
        })
    }

    /// Look up device bindings and return the first bound device id.
    ///
    /// The account is assumed to own a single device, so the first binding
    /// wins.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Auth` on a non-200 or malformed response and
    /// `ApiError::NoDeviceBound` when the binding list is empty.
    pub async fn first_binding(&self, token: &str) -> Result<String, ApiError> {
        let url = self.endpoints.bindings();

        tracing::debug!(url, "GET bindings");

        let response = self
            .client
            .get(&url)
            .header(APP_ID_HEADER, &self.config.application_id)
            .header(USER_TOKEN_HEADER, token)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(ApiError::Auth {
                status: status.as_u16(),
                message: text,
            });
        }

        let body: Value =
            serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))?;

        let devices = body
            .get("devices")
            .and_then(Value::as_array)
            .ok_or_else(|| ApiError::Auth {
                status: status.as_u16(),
                message: body.to_string(),
            })?;

        let device_id = devices
            .first()
            .and_then(|d| d.get("did"))
            .and_then(Value::as_str)
            .ok_or(ApiError::NoDeviceBound)?;

        tracing::info!(device_id, bound = devices.len(), "binding lookup done");
        Ok(device_id.to_string())
    }

    /// Fetch the latest telemetry snapshot for a bound device.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` on a non-200 response and
    /// `ApiError::EmptyResponse` when the body carries no `attr` map; both
    /// are per-cycle conditions the caller logs and skips.
    pub async fn fetch_telemetry(
        &self,
        device_id: &str,
        token: &str,
    ) -> Result<DeviceState, ApiError> {
        let url = self.endpoints.latest_data(device_id);

        tracing::debug!(device_id, url, "GET device data");

        let response = self
            .client
            .get(&url)
            .header(APP_ID_HEADER, &self.config.application_id)
            .header(USER_TOKEN_HEADER, token)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;

        let Some(attrs) = body.get("attr").and_then(Value::as_object) else {
            return Err(ApiError::EmptyResponse {
                body: body.to_string(),
            });
        };

        let state = DeviceState::from_attrs(attrs.clone());
        if state.get("power").and_then(Value::as_i64) == Some(0) {
            tracing::info!("device reachable but powered off");
        }
        Ok(state)
    }

    /// Dispatch a control command to a bound device.
    ///
    /// The acknowledgment is an empty JSON object; any other body is a
    /// soft-fail, logged but treated as delivered.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` on a non-200 response.
    pub async fn send_command(
        &self,
        device_id: &str,
        token: &str,
        command: &Command,
    ) -> Result<(), ApiError> {
        let url = self.endpoints.control(device_id);

        let mut attrs = serde_json::Map::new();
        attrs.insert(
            command.name.clone(),
            serde_json::to_value(&command.value).map_err(|e| ApiError::Parse(e.to_string()))?,
        );
        let body = json!({ "attrs": attrs });

        tracing::debug!(device_id, command = %command.name, url, "POST control");

        let response = self
            .client
            .post(&url)
            .header(APP_ID_HEADER, &self.config.application_id)
            .header(USER_TOKEN_HEADER, token)
            .header("Content-Type", "text/plain")
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let ack: Value = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;

        if ack.as_object().is_some_and(|o| o.is_empty()) {
            tracing::debug!(command = %command.name, "command acknowledged");
        } else {
            tracing::warn!(
                command = %command.name,
                response = %ack,
                "command accepted with unexpected response body"
            );
        }
        Ok(())
    }
}

/// Errors for cloud API exchanges.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// Client initialization failed
    #[error("client init error: {0}")]
    Init(String),
    /// HTTP request failed (transport error or timeout)
    #[error("request error: {0}")]
    Request(String),
    /// Login or binding exchange rejected
    #[error("auth error (status {status}): {message}")]
    Auth {
        /// HTTP status code
        status: u16,
        /// Response body from the API
        message: String,
    },
    /// Account has no bound device
    #[error("account has no bound device")]
    NoDeviceBound,
    /// Telemetry or control call returned an error status
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body from the API
        message: String,
    },
    /// Telemetry body carried no attributes
    #[error("empty telemetry response: {body}")]
    EmptyResponse {
        /// The attribute-less response body
        body: String,
    },
    /// Response parsing failed
    #[error("parse error: {0}")]
    Parse(String),
}
