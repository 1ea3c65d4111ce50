//! Transport-neutral request value.
//!
//! # Responsibilities
//! - Carry method, paths, body, query, params and headers into dispatch
//! - Produce narrowed copies as conditions consume path prefixes
//!
//! # Design Decisions
//! - Immutable from the tree's point of view: conditions return new values
//! - `full_path` is never rewritten and stays available for diagnostics
//! - Header names are stored lower-cased

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// An inbound request as seen by the context tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Request {
    /// HTTP method as sent by the client.
    pub method: String,
    /// Path still to be matched; shrinks while descending.
    pub path: String,
    /// Original path including any mount prefix.
    pub full_path: String,
    /// Path relative to the API root; narrowed together with `path`.
    pub full_api_path: String,
    /// Parsed body, `Null` when absent.
    pub body: Value,
    pub query: BTreeMap<String, String>,
    /// Values captured by named regex groups on the way down.
    pub params: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
}

impl Request {
    /// Request for `path` relative to the API root.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            method: method.into(),
            full_path: path.clone(),
            full_api_path: path.clone(),
            path,
            ..Default::default()
        }
    }

    /// Request whose API root is mounted below `mount` in the full path.
    ///
    /// `None` when the path lies outside the mount. The mount matches whole
    /// segments: `/api` covers `/api` and `/api/users` but not `/apix`.
    pub fn mounted(
        method: impl Into<String>,
        full_path: impl Into<String>,
        mount: &str,
    ) -> Option<Self> {
        let full_path = full_path.into();
        let mount = mount.trim_end_matches('/');
        let api_path = match full_path.strip_prefix(mount) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.to_string(),
            _ => return None,
        };
        Some(Self {
            method: method.into(),
            path: api_path.clone(),
            full_api_path: api_path,
            full_path,
            ..Default::default()
        })
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Header lookup, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Copy with `consumed` removed from the front of the remaining path.
    ///
    /// Callers pass a prefix of `self.path`; anything else leaves the paths as they are.
    pub fn consume(&self, consumed: &str) -> Request {
        let mut next = self.clone();
        if let Some(rest) = self.path.strip_prefix(consumed) {
            next.path = rest.to_string();
        }
        if let Some(rest) = self.full_api_path.strip_prefix(consumed) {
            next.full_api_path = rest.to_string();
        }
        next
    }
}
