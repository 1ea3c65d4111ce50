//! Declarative REST routing engine.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (axum, request ID, limits, body parse)
//!                          │
//!                          ▼
//!                     routing::api (info endpoint, error boundary)
//!                          │
//!                          ▼
//!                     routing::dispatch ──▶ condition ──▶ context (action)
//!                          │                     │
//!                          │                     ▼
//!                          │              routing::declaration ──▶ types
//!                          ▼
//!     Client Response ◀── http::response
//!
//!     Cross-cutting: config, observability, lifecycle
//! ```

// Core subsystems
pub mod http;
pub mod routing;
pub mod types;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::schema::ApiConfig;
pub use http::{ApiError, ApiResult, ApiServer, HttpError, Request, Response};
pub use lifecycle::Shutdown;
pub use routing::{ApiOptions, Context, Declaration, RestfulApi};
pub use types::{ConversionRegister, TypeInfo};
