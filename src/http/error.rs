//! Error types shared by actions, dispatch and the transport adapter.

use thiserror::Error;

use crate::types::TypeError;

/// An error an action raises on purpose, rendered with its own status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status} {message}")]
pub struct HttpError {
    pub status: u16,
    pub message: String,
}

impl HttpError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(401, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(403, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(409, message)
    }
}

/// Misuse of a [`Response`](super::Response).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResponseError {
    /// `end()` was already called.
    #[error("Response already ended")]
    AlreadyEnded,

    /// A body was already written.
    #[error("Response body already sent")]
    BodyAlreadySent,

    #[error("Invalid status code {0}")]
    InvalidStatus(u16),

    /// The body could not be serialized as JSON.
    #[error("Failed to serialize body: {0}")]
    Serialize(String),
}

/// Anything that can go wrong while handling a request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Declared HTTP error; status and message reach the client.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("Response error: {0}")]
    Response(#[from] ResponseError),

    #[error("Type error: {0}")]
    Type(#[from] TypeError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Result type for actions and dispatch.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// The declared HTTP error, if this is one.
    pub fn as_http(&self) -> Option<&HttpError> {
        match self {
            ApiError::Http(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_conversion() {
        let err: ApiError = HttpError::bad_request("name: Missing required property").into();
        let http = err.as_http().unwrap();
        assert_eq!(http.status, 400);
        assert_eq!(http.message, "name: Missing required property");
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            ApiError::from(ResponseError::AlreadyEnded).to_string(),
            "Response error: Response already ended"
        );
        assert!(ApiError::internal("db down").as_http().is_none());
    }
}
