//! Gateway error taxonomy.
//!
//! Authentication and authorization failures block the attempt before any
//! throttle state is touched. Throttle failures block with a wait hint.
//! Configuration and upstream failures surface as "failed" outcomes.

use crate::domain::config::ConfigError;
use std::time::Duration;

/// Failure classes for one gated attempt, plus service-level errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Webhook signature missing or did not verify
    #[error("webhook signature invalid or missing")]
    Authentication,

    /// Caller absent or not on the allow-list
    #[error("caller is not on the allow-list")]
    Authorization,

    /// Rate limit window exhausted
    #[error("rate limit exceeded, retry in {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// Successful toggle too recent
    #[error("toggle too soon after the last one, wait {wait:?}")]
    ReplayWindow { wait: Duration },

    /// Required configuration missing or invalid
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Vehicle API failure after retries
    #[error("vehicle API error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),
}

/// Upstream vehicle API failures.
///
/// Transient classes (timeout, conflict, vehicle asleep, transport) are
/// retried once inside the client; whatever survives the retry budget
/// propagates here unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    /// Connection, TLS, or body-read failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status. The body is captured for logs only and is
    /// never spoken back to the caller.
    #[error("vehicle API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response parsed but did not carry the expected shape
    #[error("malformed vehicle response: {0}")]
    MalformedResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_error_display() {
        let err = UpstreamError::Status {
            status: 409,
            body: "{\"reason\":\"vehicle busy\"}".into(),
        };
        assert!(err.to_string().contains("409"));
    }

    #[test]
    fn test_config_error_converts() {
        let err: GatewayError = ConfigError::MissingVehicleId.into();
        assert!(matches!(err, GatewayError::Config(_)));
    }
}
