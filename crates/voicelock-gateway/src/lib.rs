//! Voice command security gateway.
//!
//! Gates a remote, irreversible physical action (locking and unlocking a
//! vehicle) behind an inbound voice-call webhook.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     VOICE GATEWAY                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  POST /voice/incoming                                        │
//! │         │                                                    │
//! │  ┌──────┴──────────────────────────────────────┐             │
//! │  │              Pipeline                       │             │
//! │  │  Signature → Allow-list → RateLimit →       │             │
//! │  │  ReplayGuard → ToggleOrchestrator           │             │
//! │  └──────────────────────┬──────────────────────┘             │
//! │                         │                                    │
//! │  ┌──────────────────────┴──────────────────────┐             │
//! │  │             VehicleClient                   │             │
//! │  │   GET /{vin}/state                          │             │
//! │  │   POST /{vin}/command/{lock|unlock}         │             │
//! │  │   (single retry for transient failures)     │             │
//! │  └─────────────────────────────────────────────┘             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Security
//!
//! - HMAC-SHA1 webhook signature over URL + sorted form parameters,
//!   compared in constant time
//! - Caller allow-list; absent identity always rejected
//! - Per-caller fixed-window rate limit and replay suppression
//! - Toggle direction derived from freshly observed lock state, never
//!   from caller input
//! - No upstream call for an unauthenticated or unauthorized request

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod domain;
pub mod gateway;
pub mod orchestrator;
pub mod router;
pub mod security;
pub mod service;
pub mod twiml;
pub mod vehicle;

// Re-exports for public API
pub use domain::caller::CallerIdentity;
pub use domain::config::{
    ConfigError, GatewayConfig, HttpConfig, SecurityConfig, ThrottleConfig, VehicleConfig,
};
pub use domain::error::{GatewayError, UpstreamError};
pub use domain::outcome::{AttemptOutcome, AttemptStatus, Reason};
pub use gateway::{CallRequest, VoiceGateway};
pub use orchestrator::ToggleOrchestrator;
pub use router::{build_router, AppState};
pub use security::{
    AbuseGuard, CallerAuthorizer, Clock, ManualClock, RateLimiter, ReplayGuard, SystemClock,
};
pub use service::GatewayService;
pub use vehicle::{LockAction, LockState, TessieClient, VehicleClient};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
