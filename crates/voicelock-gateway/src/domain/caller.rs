//! Caller identity normalization.

use std::fmt;

/// Normalized phone-number-like identity of the person on the call.
///
/// Construction goes through [`CallerIdentity::normalize`], which guarantees
/// the inner string is trimmed and non-empty. All per-caller throttle state
/// is keyed by this type, so an empty-string key can never exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerIdentity(String);

impl CallerIdentity {
    /// Normalize a raw caller value (typically the webhook's `From` field).
    ///
    /// Absent or whitespace-only input yields `None`.
    pub fn normalize(raw: Option<&str>) -> Option<Self> {
        let trimmed = raw?.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
