//! Mount prefix matching.
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - A mount only matches on a segment boundary: `/api/proxy` matches
//!   `/api/proxy` and `/api/proxy/x`, never `/api/proxyx`
//! - No regex, prefix comparison only

/// Matches requests whose path lies under a fixed prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountMatcher {
    prefix: String,
}

impl MountMatcher {
    /// Create a matcher. A trailing `/` on the prefix is ignored.
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        while prefix.ends_with('/') {
            prefix.pop();
        }
        Self { prefix }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the remainder of `path` after the prefix, if it matches.
    /// The remainder is empty or starts with `/`.
    pub fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.prefix.as_str())?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        self.strip(path).is_some()
    }
}
