//! Route conditions.
//!
//! # Responsibilities
//! - Match path prefix (case-sensitive, raw string prefix)
//! - Match regex path prefix, capturing named groups as params
//! - Match method (case-insensitive)
//! - Combine conditions: `And` as a guard, `Chain` for sequential descent
//!
//! # Design Decisions
//! - `rewrite` is only called after `applies_to` succeeded on the same request
//! - Rewrites return a fresh `Request`; the input is never mutated
//! - `"/users"` also matches `"/usersettings"`: prefixes are not segment-aware

use regex::Regex;
use serde::Serialize;

use crate::http::Request;

/// Predicate guarding descent into a child context, plus the request rewrite
/// applied when it matches.
pub trait Condition: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn applies_to(&self, req: &Request) -> bool;

    /// Request handed to the child context.
    fn rewrite(&self, req: &Request) -> Request;

    /// `applies_to` followed by `rewrite`, in one pass.
    fn descend(&self, req: &Request) -> Option<Request> {
        if self.applies_to(req) {
            Some(self.rewrite(req))
        } else {
            None
        }
    }

    /// Read-only summary for introspection.
    fn describe(&self) -> ConditionInfo {
        ConditionInfo::default()
    }
}

/// What a condition contributes to an introspection node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConditionInfo {
    pub path: Option<String>,
    pub method: Option<String>,
}

impl ConditionInfo {
    fn merge(mut self, other: ConditionInfo) -> Self {
        self.path = match (self.path, other.path) {
            (Some(a), Some(b)) => Some(a + &b),
            (a, b) => a.or(b),
        };
        self.method = other.method.or(self.method);
        self
    }
}

/// Matches the remaining path prefix and consumes it.
#[derive(Debug, Clone)]
pub struct PathCondition {
    prefix: String,
}

impl PathCondition {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Condition for PathCondition {
    fn applies_to(&self, req: &Request) -> bool {
        req.path.starts_with(&self.prefix)
    }

    fn rewrite(&self, req: &Request) -> Request {
        req.consume(&self.prefix)
    }

    fn describe(&self) -> ConditionInfo {
        ConditionInfo {
            path: Some(self.prefix.clone()),
            method: None,
        }
    }
}

/// Matches a regex anchored at the start of the remaining path and consumes
/// the matched span. Named groups are copied into `params`.
#[derive(Debug, Clone)]
pub struct PathRegexCondition {
    source: String,
    regex: Regex,
}

impl PathRegexCondition {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            source: pattern.to_string(),
            regex: Regex::new(&format!("^(?:{})", pattern))?,
        })
    }
}

impl Condition for PathRegexCondition {
    fn applies_to(&self, req: &Request) -> bool {
        self.regex.is_match(&req.path)
    }

    fn rewrite(&self, req: &Request) -> Request {
        self.descend(req).unwrap_or_else(|| req.clone())
    }

    fn descend(&self, req: &Request) -> Option<Request> {
        let captures = self.regex.captures(&req.path)?;
        let matched = captures.get(0)?.as_str();
        let mut next = req.consume(matched);
        for name in self.regex.capture_names().flatten() {
            if let Some(value) = captures.name(name) {
                next.params.insert(name.to_string(), value.as_str().to_string());
            }
        }
        Some(next)
    }

    fn describe(&self) -> ConditionInfo {
        ConditionInfo {
            path: Some(self.source.clone()),
            method: None,
        }
    }
}

/// Matches the request method, case-insensitively. Does not rewrite.
#[derive(Debug, Clone)]
pub struct MethodCondition {
    method: String,
}

impl MethodCondition {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
        }
    }
}

impl Condition for MethodCondition {
    fn applies_to(&self, req: &Request) -> bool {
        req.method.eq_ignore_ascii_case(&self.method)
    }

    fn rewrite(&self, req: &Request) -> Request {
        req.clone()
    }

    fn describe(&self) -> ConditionInfo {
        ConditionInfo {
            path: None,
            method: Some(self.method.clone()),
        }
    }
}

/// Always matches. Backs `Context::any`.
#[derive(Debug, Clone, Default)]
pub struct AnyCondition;

impl Condition for AnyCondition {
    fn applies_to(&self, _req: &Request) -> bool {
        true
    }

    fn rewrite(&self, req: &Request) -> Request {
        req.clone()
    }

    fn describe(&self) -> ConditionInfo {
        ConditionInfo {
            path: None,
            method: Some("ANY".to_string()),
        }
    }
}

/// All conditions must match the original request.
///
/// A guard only: `rewrite` returns the request unchanged, so path-consuming
/// conditions inside an `And` do not narrow the request.
#[derive(Debug)]
pub struct AndCondition {
    conditions: Vec<Box<dyn Condition>>,
}

impl AndCondition {
    pub fn new(conditions: Vec<Box<dyn Condition>>) -> Self {
        Self { conditions }
    }
}

impl Condition for AndCondition {
    fn applies_to(&self, req: &Request) -> bool {
        self.conditions.iter().all(|c| c.applies_to(req))
    }

    fn rewrite(&self, req: &Request) -> Request {
        req.clone()
    }

    fn describe(&self) -> ConditionInfo {
        self.conditions
            .iter()
            .fold(ConditionInfo::default(), |info, c| info.merge(c.describe()))
    }
}

/// Conditions applied left to right, each seeing the previous rewrite.
/// Stops at the first condition that does not match.
#[derive(Debug)]
pub struct ChainCondition {
    conditions: Vec<Box<dyn Condition>>,
}

impl ChainCondition {
    pub fn new(conditions: Vec<Box<dyn Condition>>) -> Self {
        Self { conditions }
    }
}

impl Condition for ChainCondition {
    fn applies_to(&self, req: &Request) -> bool {
        self.descend(req).is_some()
    }

    fn rewrite(&self, req: &Request) -> Request {
        self.descend(req).unwrap_or_else(|| req.clone())
    }

    fn descend(&self, req: &Request) -> Option<Request> {
        let mut current = req.clone();
        for condition in &self.conditions {
            current = condition.descend(&current)?;
        }
        Some(current)
    }

    fn describe(&self) -> ConditionInfo {
        self.conditions
            .iter()
            .fold(ConditionInfo::default(), |info, c| info.merge(c.describe()))
    }
}

/// `Chain(Path(prefix), Method(method))`.
pub fn path_and_method(prefix: impl Into<String>, method: impl Into<String>) -> ChainCondition {
    ChainCondition::new(vec![
        Box::new(PathCondition::new(prefix)),
        Box::new(MethodCondition::new(method)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Records how often it is asked to rewrite.
    #[derive(Debug)]
    struct Spy {
        inner: MethodCondition,
        rewrites: Arc<AtomicUsize>,
    }

    impl Condition for Spy {
        fn applies_to(&self, req: &Request) -> bool {
            self.inner.applies_to(req)
        }

        fn rewrite(&self, req: &Request) -> Request {
            self.rewrites.fetch_add(1, Ordering::SeqCst);
            self.inner.rewrite(req)
        }
    }

    #[test]
    fn test_path_condition() {
        let condition = PathCondition::new("/users");
        let req = Request::new("GET", "/users/1");
        assert!(condition.applies_to(&req));
        assert_eq!(condition.rewrite(&req).path, "/1");
        assert!(!condition.applies_to(&Request::new("GET", "/images")));
    }

    #[test]
    fn test_path_regex_condition() {
        let condition = PathRegexCondition::new(r"/users/(?P<id>\d+)").unwrap();
        let req = Request::new("GET", "/users/42/posts");
        let next = condition.descend(&req).unwrap();
        assert_eq!(next.path, "/posts");
        assert_eq!(next.params.get("id").map(String::as_str), Some("42"));

        // Anchored at the start.
        assert!(!condition.applies_to(&Request::new("GET", "/x/users/42")));
    }

    #[test]
    fn test_method_condition() {
        let condition = MethodCondition::new("post");
        assert!(condition.applies_to(&Request::new("POST", "/")));
        assert!(condition.applies_to(&Request::new("Post", "/")));
        assert!(!condition.applies_to(&Request::new("GET", "/")));
    }

    #[test]
    fn test_and_condition_checks_original_request() {
        let condition = AndCondition::new(vec![
            Box::new(PathCondition::new("/a")),
            Box::new(PathCondition::new("/a/b")),
        ]);
        let req = Request::new("GET", "/a/b");
        assert!(condition.applies_to(&req));
        assert_eq!(condition.rewrite(&req), req);
    }

    #[test]
    fn test_chain_short_circuits() {
        let rewrites = Arc::new(AtomicUsize::new(0));
        let chain = ChainCondition::new(vec![
            Box::new(PathCondition::new("/a")),
            Box::new(Spy {
                inner: MethodCondition::new("GET"),
                rewrites: rewrites.clone(),
            }),
        ]);

        assert!(!chain.applies_to(&Request::new("POST", "/a")));
        assert_eq!(rewrites.load(Ordering::SeqCst), 0);

        let next = chain.descend(&Request::new("GET", "/a/b")).unwrap();
        assert_eq!(next.path, "/b");
        assert_eq!(rewrites.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_chain_sees_previous_rewrite() {
        let chain = ChainCondition::new(vec![
            Box::new(PathCondition::new("/a")),
            Box::new(PathCondition::new("/b")),
        ]);
        assert!(chain.applies_to(&Request::new("GET", "/a/b/c")));
        assert!(!chain.applies_to(&Request::new("GET", "/b/a")));
    }

    #[test]
    fn test_describe() {
        let info = path_and_method("/users", "post").describe();
        assert_eq!(info.path.as_deref(), Some("/users"));
        assert_eq!(info.method.as_deref(), Some("POST"));
    }
}
