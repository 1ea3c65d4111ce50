//! Buffered response capability.
//!
//! # Responsibilities
//! - Give actions `status / json / send / header / redirect / end`
//! - Track whether status and body have been committed
//! - Refuse any mutation after `end()`
//!
//! # Design Decisions
//! - Buffered: the adapter turns the finished value into a transport response
//! - Every mutator returns `Result<&mut Response, ResponseError>` so calls chain
//!   with `?` and misuse fails loudly instead of being ignored

use serde::Serialize;
use serde_json::Value;

use super::error::ResponseError;

/// Response payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "kind", content = "content", rename_all = "lowercase")]
pub enum Body {
    #[default]
    Empty,
    Json(Value),
    Text(String),
}

/// Single-use response written by exactly one action or by dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Body,
    status_sent: bool,
    body_sent: bool,
    ended: bool,
}

impl Response {
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: Body::Empty,
            status_sent: false,
            body_sent: false,
            ended: false,
        }
    }

    pub fn status(&mut self, code: u16) -> Result<&mut Self, ResponseError> {
        self.ensure_open()?;
        if !(100..=999).contains(&code) {
            return Err(ResponseError::InvalidStatus(code));
        }
        self.status = code;
        self.status_sent = true;
        Ok(self)
    }

    /// Serialize `body` as JSON.
    pub fn json<T: Serialize>(&mut self, body: T) -> Result<&mut Self, ResponseError> {
        self.ensure_body_open()?;
        let value = serde_json::to_value(body)
            .map_err(|err| ResponseError::Serialize(err.to_string()))?;
        self.set_header("content-type", "application/json");
        self.body = Body::Json(value);
        self.body_sent = true;
        Ok(self)
    }

    /// Plain-text body.
    pub fn send(&mut self, body: impl Into<String>) -> Result<&mut Self, ResponseError> {
        self.ensure_body_open()?;
        if self.header_value("content-type").is_none() {
            self.set_header("content-type", "text/plain; charset=utf-8");
        }
        self.body = Body::Text(body.into());
        self.body_sent = true;
        Ok(self)
    }

    /// Set a header, replacing any previous value for the same name.
    pub fn header(
        &mut self,
        name: impl AsRef<str>,
        value: impl Into<String>,
    ) -> Result<&mut Self, ResponseError> {
        self.ensure_open()?;
        self.set_header(name.as_ref(), value);
        Ok(self)
    }

    /// 302 to `url`.
    pub fn redirect(&mut self, url: impl Into<String>) -> Result<&mut Self, ResponseError> {
        self.ensure_open()?;
        self.status(302)?;
        self.set_header("location", url);
        Ok(self)
    }

    /// Finish the response. A second call is an error.
    pub fn end(&mut self) -> Result<&mut Self, ResponseError> {
        self.ensure_open()?;
        self.ended = true;
        Ok(self)
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// JSON body, if one was written.
    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            Body::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn status_sent(&self) -> bool {
        self.status_sent
    }

    pub fn body_sent(&self) -> bool {
        self.body_sent
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    fn ensure_open(&self) -> Result<(), ResponseError> {
        if self.ended {
            Err(ResponseError::AlreadyEnded)
        } else {
            Ok(())
        }
    }

    fn ensure_body_open(&self) -> Result<(), ResponseError> {
        self.ensure_open()?;
        if self.body_sent {
            Err(ResponseError::BodyAlreadySent)
        } else {
            Ok(())
        }
    }

    fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let name = name.to_ascii_lowercase();
        let value = value.into();
        match self.headers.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name, value)),
        }
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chained_writes() {
        let mut res = Response::new();
        res.status(201)
            .unwrap()
            .json(json!({ "message": "User created" }))
            .unwrap()
            .end()
            .unwrap();

        assert_eq!(res.status_code(), 201);
        assert_eq!(res.json_body(), Some(&json!({ "message": "User created" })));
        assert_eq!(res.header_value("Content-Type"), Some("application/json"));
        assert!(res.status_sent() && res.body_sent() && res.is_ended());
    }

    #[test]
    fn test_mutation_after_end_fails() {
        let mut res = Response::new();
        res.end().unwrap();
        assert_eq!(res.status(500).unwrap_err(), ResponseError::AlreadyEnded);
        assert_eq!(res.send("late").unwrap_err(), ResponseError::AlreadyEnded);
        assert_eq!(res.end().unwrap_err(), ResponseError::AlreadyEnded);
    }

    #[test]
    fn test_second_body_fails() {
        let mut res = Response::new();
        res.send("first").unwrap();
        assert_eq!(
            res.json(json!({})).unwrap_err(),
            ResponseError::BodyAlreadySent
        );
        assert_eq!(res.body(), &Body::Text("first".into()));
    }

    #[test]
    fn test_unserializable_body_fails() {
        let mut counts = std::collections::HashMap::new();
        counts.insert((1, 2), 3);
        let mut res = Response::new();
        assert!(matches!(
            res.json(&counts).unwrap_err(),
            ResponseError::Serialize(_)
        ));
        assert!(!res.body_sent());
        assert_eq!(res.body(), &Body::Empty);
        assert_eq!(res.header_value("content-type"), None);
        res.json(json!({ "ok": true })).unwrap();
        assert!(res.body_sent());
    }

    #[test]
    fn test_redirect() {
        let mut res = Response::new();
        res.redirect("/login").unwrap();
        assert_eq!(res.status_code(), 302);
        assert_eq!(res.header_value("location"), Some("/login"));
    }

    #[test]
    fn test_invalid_status() {
        let mut res = Response::new();
        assert_eq!(res.status(42).unwrap_err(), ResponseError::InvalidStatus(42));
        assert!(!res.status_sent());
    }
}
