//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, limits, body parsing)
//!     → request.rs (transport-neutral Request)
//!     → [routing::RestfulApi dispatches]
//!     → response.rs (buffered Response written by the action)
//!     → server.rs (convert, send to client)
//! ```
//!
//! # Design Decisions
//! - The core never sees axum types; any transport can build a `Request`
//! - Errors are typed: declared HTTP errors carry their own status

pub mod error;
pub mod request;
pub mod response;
pub mod server;

pub use error::{ApiError, ApiResult, HttpError, ResponseError};
pub use request::Request;
pub use response::{Body, Response};
pub use server::{into_http_response, ApiServer, ServerSettings, UuidRequestId, X_REQUEST_ID};
