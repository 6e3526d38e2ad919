//! Route matching logic.
//!
//! # Responsibilities
//! - Match path prefix (case-sensitive, literal)
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Literal prefix, not segment-aware: `/api` claims `/apix` too
//! - No regex to guarantee O(n) matching

/// Matches the request path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Returns true if `path` starts with this prefix.
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Prefix length in bytes; longer prefixes are more specific.
    pub fn specificity(&self) -> usize {
        self.prefix.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/api");

        assert!(matcher.matches("/api/v1"));
        assert!(matcher.matches("/api"));
        assert!(!matcher.matches("/images"));
        assert!(!matcher.matches("/API/v1")); // Case sensitive
    }

    #[test]
    fn prefix_is_literal() {
        let matcher = PathPrefixMatcher::new("/ws");
        assert!(matcher.matches("/wsx"));
        assert!(!matcher.matches("/w"));
    }
}
