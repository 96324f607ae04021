//! Caller allow-list.

use crate::domain::caller::CallerIdentity;
use std::collections::HashSet;

/// Membership test against the configured set of permitted callers.
///
/// An absent identity is always rejected. Entries are normalized the same way
/// inbound callers are, so configured whitespace can never widen the set.
#[derive(Debug, Clone, Default)]
pub struct CallerAuthorizer {
    allowed: HashSet<CallerIdentity>,
}

impl CallerAuthorizer {
    pub fn new(entries: impl IntoIterator<Item = String>) -> Self {
        let allowed = entries
            .into_iter()
            .filter_map(|entry| CallerIdentity::normalize(Some(&entry)))
            .collect();
        Self { allowed }
    }

    pub fn is_allowed(&self, caller: Option<&CallerIdentity>) -> bool {
        caller.is_some_and(|caller| self.allowed.contains(caller))
    }

    /// Number of configured callers, for startup logging.
    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(raw: &str) -> CallerIdentity {
        CallerIdentity::normalize(Some(raw)).unwrap()
    }

    #[test]
    fn test_allows_listed_caller() {
        let authorizer = CallerAuthorizer::new(vec!["+15551234567".to_string()]);
        assert!(authorizer.is_allowed(Some(&caller("+15551234567"))));
    }

    #[test]
    fn test_rejects_unlisted_caller() {
        let authorizer = CallerAuthorizer::new(vec!["+15551234567".to_string()]);
        assert!(!authorizer.is_allowed(Some(&caller("+19998887777"))));
    }

    #[test]
    fn test_rejects_absent_caller() {
        let authorizer = CallerAuthorizer::new(vec!["+15551234567".to_string()]);
        assert!(!authorizer.is_allowed(None));
    }

    #[test]
    fn test_empty_list_rejects_everyone() {
        let authorizer = CallerAuthorizer::new(Vec::new());
        assert!(!authorizer.is_allowed(Some(&caller("+15551234567"))));
    }

    #[test]
    fn test_entries_are_normalized() {
        let authorizer =
            CallerAuthorizer::new(vec![" +15551234567 ".to_string(), "   ".to_string()]);
        assert_eq!(authorizer.len(), 1);
        assert!(authorizer.is_allowed(Some(&caller("+15551234567"))));
    }
}
