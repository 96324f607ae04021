//! Tessie HTTP client with bounded retries.
//!
//! Every call gets at most one retry, taken after a fixed pause, and only
//! for transient failure classes: transport errors, HTTP 408/409, or a
//! response body reporting the vehicle asleep. The retry budget is an
//! explicit loop with an attempt counter; after exhaustion the last error
//! propagates unchanged.

use super::{LockAction, LockState, VehicleClient};
use crate::domain::error::UpstreamError;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_RETRY_PAUSE: Duration = Duration::from_millis(1500);
const DEFAULT_MAX_RETRIES: u32 = 1;

#[derive(Debug, Deserialize)]
struct StateResponse {
    vehicle_state: Option<VehicleStateBody>,
}

#[derive(Debug, Deserialize)]
struct VehicleStateBody {
    locked: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct CommandResponse {
    #[allow(dead_code)]
    result: Option<bool>,
    reason: Option<String>,
    message: Option<String>,
}

/// Retrying client for the Tessie vehicle API.
pub struct TessieClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    retry_pause: Duration,
    max_retries: u32,
}

impl TessieClient {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self::with_retry(
            base_url,
            access_token,
            DEFAULT_RETRY_PAUSE,
            DEFAULT_MAX_RETRIES,
        )
    }

    /// Client with an explicit retry schedule. Tests use a short pause.
    pub fn with_retry(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        retry_pause: Duration,
        max_retries: u32,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            retry_pause,
            max_retries,
        }
    }

    async fn request_with_retry(
        &self,
        method: Method,
        path: &str,
    ) -> Result<String, UpstreamError> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(self.retry_pause).await;
            }

            let sent = self
                .http
                .request(method.clone(), &url)
                .bearer_auth(&self.access_token)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .send()
                .await;

            let response = match sent {
                Ok(response) => response,
                Err(err) => {
                    let transport = UpstreamError::Transport(err.to_string());
                    if attempt < self.max_retries {
                        warn!(%url, error = %transport, "transport error, retrying");
                        last_error = Some(transport);
                        continue;
                    }
                    return Err(transport);
                }
            };

            let status = response.status();
            let body = match response.text().await {
                Ok(body) => body,
                Err(err) => {
                    let transport = UpstreamError::Transport(err.to_string());
                    if attempt < self.max_retries {
                        warn!(%url, error = %transport, "body read failed, retrying");
                        last_error = Some(transport);
                        continue;
                    }
                    return Err(transport);
                }
            };

            if status.is_success() {
                debug!(%url, attempt, "vehicle API call succeeded");
                return Ok(body);
            }

            let err = UpstreamError::Status {
                status: status.as_u16(),
                body: body.clone(),
            };
            if attempt < self.max_retries && is_transient(status, &body) {
                warn!(%url, status = status.as_u16(), "transient upstream failure, retrying");
                last_error = Some(err);
                continue;
            }
            return Err(err);
        }

        Err(last_error
            .unwrap_or_else(|| UpstreamError::Transport("retry budget exhausted".to_string())))
    }
}

/// Transient upstream conditions worth one retry: request timeout, command
/// conflict, or a body reporting the vehicle asleep.
fn is_transient(status: StatusCode, body: &str) -> bool {
    if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::CONFLICT {
        return true;
    }
    let parsed: CommandResponse = serde_json::from_str(body).unwrap_or_default();
    parsed
        .message
        .or(parsed.reason)
        .map(|text| text.to_ascii_lowercase().contains("asleep"))
        .unwrap_or(false)
}

#[async_trait]
impl VehicleClient for TessieClient {
    async fn lock_state(&self, vehicle_id: &str) -> Result<LockState, UpstreamError> {
        let body = self
            .request_with_retry(Method::GET, &format!("/{vehicle_id}/state"))
            .await?;
        let state: StateResponse = serde_json::from_str(&body)
            .map_err(|err| UpstreamError::MalformedResponse(err.to_string()))?;
        let locked = state
            .vehicle_state
            .and_then(|vehicle| vehicle.locked)
            .ok_or_else(|| {
                UpstreamError::MalformedResponse("missing vehicle_state.locked".to_string())
            })?;
        Ok(LockState::from_locked(locked))
    }

    async fn send_command(
        &self,
        vehicle_id: &str,
        action: LockAction,
    ) -> Result<(), UpstreamError> {
        self.request_with_retry(
            Method::POST,
            &format!("/{vehicle_id}/command/{}", action.path_segment()),
        )
        .await?;
        Ok(())
    }
}
