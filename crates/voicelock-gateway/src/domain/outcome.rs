//! Terminal outcome of one gated call attempt.
//!
//! The gateway produces exactly one [`AttemptOutcome`] per attempt; the HTTP
//! layer renders it as either a plain 403 or a spoken-prompt document, and
//! the logging layer records it as one structured event.

use crate::vehicle::LockState;
use serde::Serialize;

/// Terminal status of an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// Rejected by a security or throttle check
    Blocked,
    /// Accepted but the command could not be completed
    Failed,
    /// Vehicle state toggled
    Success,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blocked => "blocked",
            Self::Failed => "failed",
            Self::Success => "success",
        }
    }
}

/// Machine-readable reason code for an attempt's terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    InvalidSignature,
    CallerNotAllowed,
    RateLimited,
    ReplayWindow,
    MissingConfig,
    VehicleError,
    Locked,
    Unlocked,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidSignature => "invalid_signature",
            Self::CallerNotAllowed => "caller_not_allowed",
            Self::RateLimited => "rate_limited",
            Self::ReplayWindow => "replay_window",
            Self::MissingConfig => "missing_config",
            Self::VehicleError => "vehicle_error",
            Self::Locked => "locked",
            Self::Unlocked => "unlocked",
        }
    }
}

/// One attempt's terminal outcome with optional structured detail
#[derive(Debug, Clone, Serialize)]
pub struct AttemptOutcome {
    pub status: AttemptStatus,
    pub reason: Reason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl AttemptOutcome {
    pub fn blocked(reason: Reason) -> Self {
        Self {
            status: AttemptStatus::Blocked,
            reason,
            detail: None,
        }
    }

    pub fn failed(reason: Reason, detail: Option<serde_json::Value>) -> Self {
        Self {
            status: AttemptStatus::Failed,
            reason,
            detail,
        }
    }

    pub fn success(final_state: LockState) -> Self {
        let reason = match final_state {
            LockState::Locked => Reason::Locked,
            LockState::Unlocked => Reason::Unlocked,
        };
        Self {
            status: AttemptStatus::Success,
            reason,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Authentication and authorization rejections render as a bare HTTP 403
    /// instead of a spoken prompt.
    pub fn is_forbidden(&self) -> bool {
        matches!(
            self.reason,
            Reason::InvalidSignature | Reason::CallerNotAllowed
        )
    }

    /// Message spoken back to the caller. Upstream error text is never
    /// spoken verbatim.
    pub fn spoken_message(&self) -> &'static str {
        match self.reason {
            Reason::InvalidSignature | Reason::CallerNotAllowed => "Forbidden.",
            Reason::RateLimited => "Too many attempts. Goodbye.",
            Reason::ReplayWindow => "Please wait before trying again. Goodbye.",
            Reason::MissingConfig => "Configuration error. Goodbye.",
            Reason::VehicleError => "Unable to reach vehicle. Goodbye.",
            Reason::Locked => "Locked.",
            Reason::Unlocked => "Unlocked.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_reason_tracks_final_state() {
        let outcome = AttemptOutcome::success(LockState::Locked);
        assert_eq!(outcome.status, AttemptStatus::Success);
        assert_eq!(outcome.reason, Reason::Locked);
        assert_eq!(outcome.spoken_message(), "Locked.");
    }

    #[test]
    fn test_forbidden_outcomes() {
        assert!(AttemptOutcome::blocked(Reason::InvalidSignature).is_forbidden());
        assert!(AttemptOutcome::blocked(Reason::CallerNotAllowed).is_forbidden());
        assert!(!AttemptOutcome::blocked(Reason::RateLimited).is_forbidden());
    }

    #[test]
    fn test_throttle_messages_are_distinct() {
        let rate = AttemptOutcome::blocked(Reason::RateLimited);
        let replay = AttemptOutcome::blocked(Reason::ReplayWindow);
        assert_ne!(rate.spoken_message(), replay.spoken_message());
        assert_ne!(rate.spoken_message(), "Forbidden.");
    }

    #[test]
    fn test_reason_codes_serialize_snake_case() {
        let json = serde_json::to_string(&Reason::InvalidSignature).unwrap();
        assert_eq!(json, "\"invalid_signature\"");
    }
}
