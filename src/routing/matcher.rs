//! Route matching logic.
//!
//! # Responsibilities
//! - Match path prefixes on segment boundaries (case-sensitive)
//! - Match exact paths for route sets mounted at the root
//!
//! # Design Decisions
//! - `/api/ai` matches `/api/ai` and `/api/ai/...`, never `/api/aix`
//! - No regex to guarantee O(n) matching

/// Trait for matching request paths against a mount point.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the path matches this condition.
    fn matches(&self, path: &str) -> bool;

    /// Path handed to the mounted handler.
    fn rewrite<'a>(&self, path: &'a str) -> &'a str {
        path
    }
}

/// Matches a path prefix on a segment boundary and strips it.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher. A trailing `/` is ignored.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim_end_matches('/');
        Self {
            prefix: trimmed.to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    fn rewrite<'a>(&self, path: &'a str) -> &'a str {
        match path.strip_prefix(self.prefix.as_str()) {
            Some("") | None => "/",
            Some(rest) => rest,
        }
    }
}

/// Matches any of a fixed set of paths.
#[derive(Debug, Clone)]
pub struct ExactPathMatcher {
    paths: Vec<String>,
}

impl ExactPathMatcher {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }
}

impl Matcher for ExactPathMatcher {
    fn matches(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/api/ai");

        assert!(matcher.matches("/api/ai"));
        assert!(matcher.matches("/api/ai/generate"));
        assert!(!matcher.matches("/api/aix"));
        assert!(!matcher.matches("/api"));
        assert!(!matcher.matches("/API/ai")); // Case sensitive
    }

    #[test]
    fn test_prefix_rewrite() {
        let matcher = PathPrefixMatcher::new("/auth/");
        assert_eq!(matcher.prefix(), "/auth");
        assert_eq!(matcher.rewrite("/auth"), "/");
        assert_eq!(matcher.rewrite("/auth/logout"), "/logout");
    }

    #[test]
    fn test_root_prefix_matches_everything() {
        let matcher = PathPrefixMatcher::new("/");
        assert!(matcher.matches("/"));
        assert!(matcher.matches("/anything"));
        assert_eq!(matcher.rewrite("/anything"), "/anything");
    }

    #[test]
    fn test_exact_matcher() {
        let matcher = ExactPathMatcher::new(["/test-server", "/profile"]);
        assert!(matcher.matches("/profile"));
        assert!(!matcher.matches("/profile/edit"));
        assert_eq!(matcher.rewrite("/profile"), "/profile");
    }
}
