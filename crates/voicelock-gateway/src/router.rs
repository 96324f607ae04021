//! HTTP routes for the voice webhook.
//!
//! The webhook provider POSTs form-encoded call events; the handler decodes
//! the body, reconstructs the URL the provider signed against, runs the
//! gateway pipeline, and renders the outcome as either a bare 403 or a
//! spoken-prompt document.

use crate::domain::outcome::AttemptOutcome;
use crate::gateway::{CallRequest, VoiceGateway};
use crate::twiml;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

const SIGNATURE_HEADER: &str = "x-twilio-signature";

/// State shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<VoiceGateway>,
    /// Public base URL the webhook provider signs against
    pub public_base_url: String,
}

/// Build the webhook router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/voice/incoming", post(incoming_call))
        .route("/voice/pin", post(pin_retired))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn incoming_call(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = CallRequest {
        canonical_url: canonical_url(&state.public_base_url, &uri),
        form_params: parse_form_body(&body),
        signature: headers
            .get(SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
    };
    let outcome = state.gateway.handle_call(request).await;
    render_outcome(&outcome)
}

/// Second-factor PIN entry was retired; keep a tombstone so stale webhook
/// configurations get a clear answer instead of a 404.
async fn pin_retired() -> Response {
    (
        StatusCode::GONE,
        [(header::CONTENT_TYPE, "text/xml")],
        twiml::say_and_hangup("PIN entry is no longer required."),
    )
        .into_response()
}

async fn health() -> Response {
    Json(serde_json::json!({
        "service": "voicelock-gateway",
        "version": crate::VERSION,
        "status": "ok",
    }))
    .into_response()
}

/// Reconstruct the exact URL the provider signed: configured public base
/// plus the request's path and query.
fn canonical_url(public_base_url: &str, uri: &Uri) -> String {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or(uri.path());
    format!(
        "{}{}",
        public_base_url.trim_end_matches('/'),
        path_and_query
    )
}

/// Decode a form-encoded body. Duplicate keys keep the last value, matching
/// the signer's view of the parameter set.
pub fn parse_form_body(body: &[u8]) -> BTreeMap<String, String> {
    url::form_urlencoded::parse(body).into_owned().collect()
}

fn render_outcome(outcome: &AttemptOutcome) -> Response {
    if outcome.is_forbidden() {
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    }
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/xml")],
        twiml::say_and_hangup(outcome.spoken_message()),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_form_body_decodes_percent_encoding() {
        let params = parse_form_body(b"From=%2B15551234567&CallStatus=ringing");
        assert_eq!(params["From"], "+15551234567");
        assert_eq!(params["CallStatus"], "ringing");
    }

    #[test]
    fn test_parse_form_body_last_duplicate_wins() {
        let params = parse_form_body(b"From=a&From=b");
        assert_eq!(params["From"], "b");
    }

    #[test]
    fn test_canonical_url_joins_base_and_path() {
        let uri: Uri = "/voice/incoming?x=1".parse().unwrap();
        assert_eq!(
            canonical_url("https://example.com/", &uri),
            "https://example.com/voice/incoming?x=1"
        );
        assert_eq!(
            canonical_url("https://example.com", &uri),
            "https://example.com/voice/incoming?x=1"
        );
    }
}
