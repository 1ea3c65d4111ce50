//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: one fallback handler feeding `RestfulApi`
//! - Wire up middleware (tracing, timeout, body limit, request ID)
//! - Parse the body fully before the core sees the request
//! - Strip the mount prefix into `full_api_path`; paths outside it never dispatch
//! - Convert the finished `Response` back into an HTTP response
//! - Serve with graceful shutdown

use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::{header, request::Parts, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response as HttpResponse},
    Router,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use uuid::Uuid;

use super::request::Request;
use super::response::{Body as ResponseBody, Response};
use crate::config::ApiConfig;
use crate::lifecycle::Shutdown;
use crate::routing::{Handling, Outcome, RestfulApi};

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates a UUID v4 request ID when the client did not send one.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Transport settings of an [`ApiServer`].
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Prefix the API is mounted under. Empty for the root.
    pub mount_path: String,
    pub request_timeout: Duration,
    pub max_body_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            mount_path: String::new(),
            request_timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024,
        }
    }
}

impl From<&ApiConfig> for ServerSettings {
    fn from(config: &ApiConfig) -> Self {
        Self {
            mount_path: config.api.mount_path.clone(),
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
            max_body_size: config.limits.max_body_size,
        }
    }
}

/// Application state injected into the handler.
#[derive(Clone)]
struct AppState {
    api: Arc<RestfulApi>,
    mount_path: Arc<str>,
    max_body_size: usize,
}

/// HTTP binding of a [`RestfulApi`].
pub struct ApiServer {
    router: Router,
    settings: ServerSettings,
}

impl ApiServer {
    pub fn new(api: RestfulApi, settings: ServerSettings) -> Self {
        let state = AppState {
            api: Arc::new(api),
            mount_path: Arc::from(settings.mount_path.as_str()),
            max_body_size: settings.max_body_size,
        };
        let router = Self::build_router(&settings, state);
        Self { router, settings }
    }

    pub fn from_config(api: RestfulApi, config: &ApiConfig) -> Self {
        Self::new(api, ServerSettings::from(config))
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(settings: &ServerSettings, state: AppState) -> Router {
        let request_id = HeaderName::from_static(X_REQUEST_ID);
        Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(settings.max_body_size))
            .layer(TimeoutLayer::new(settings.request_timeout))
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id, UuidRequestId))
    }

    /// The router, for embedding or driving with `tower::ServiceExt`.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    /// Serve until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            mount_path = %self.settings.mount_path,
            "HTTP server starting"
        );

        let mut signal = shutdown.subscribe();
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = signal.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Single entry point: every method and path lands here.
async fn dispatch(State(state): State<AppState>, request: axum::extract::Request) -> HttpResponse {
    let (parts, body) = request.into_parts();

    let Some(request) = Request::mounted(parts.method.as_str(), parts.uri.path(), &state.mount_path)
    else {
        let handling = state
            .api
            .reject_unmounted(parts.method.as_str(), parts.uri.path(), Response::new());
        return into_http_response(handling);
    };

    let bytes = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::debug!(error = %err, "Failed to read request body");
            return error_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
        }
    };

    let request = match to_api_request(request, &parts, &bytes) {
        Ok(request) => request,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, &message),
    };

    tracing::debug!(
        request_id = request.header(X_REQUEST_ID).unwrap_or("-"),
        method = %request.method,
        path = %request.full_path,
        "Dispatching request"
    );

    let handling = state.api.handle(request, Response::new()).await;
    into_http_response(handling)
}

/// Fill the mounted request from the native parts.
fn to_api_request(mut request: Request, parts: &Parts, bytes: &Bytes) -> Result<Request, String> {
    let Query(query) = Query::<BTreeMap<String, String>>::try_from_uri(&parts.uri)
        .map_err(|err| format!("Invalid query string: {}", err))?;
    request.query = query;

    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            request
                .headers
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }
    }

    request.body = parse_body(parts, bytes)?;
    Ok(request)
}

/// JSON when the body is non-empty and not declared as something else.
fn parse_body(parts: &Parts, bytes: &Bytes) -> Result<Value, String> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/json");
    if content_type.contains("json") {
        serde_json::from_slice(bytes).map_err(|err| format!("Invalid JSON body: {}", err))
    } else {
        Ok(Value::String(String::from_utf8_lossy(bytes).into_owned()))
    }
}

/// Convert a finished core response.
pub fn into_http_response(handling: Handling) -> HttpResponse {
    let Handling { outcome, response } = handling;
    if outcome == Outcome::NotFound && !response.is_ended() {
        return StatusCode::NOT_FOUND.into_response();
    }

    let status = StatusCode::from_u16(response.status_code()).unwrap_or_else(|_| {
        tracing::warn!(status = response.status_code(), "Invalid status code, sending 500");
        StatusCode::INTERNAL_SERVER_ERROR
    });

    let body = match response.body() {
        ResponseBody::Empty => Body::empty(),
        ResponseBody::Json(value) => Body::from(serde_json::to_vec(value).unwrap_or_default()),
        ResponseBody::Text(text) => Body::from(text.clone()),
    };

    let mut http_response = HttpResponse::new(body);
    *http_response.status_mut() = status;
    for (name, value) in response.headers() {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                http_response.headers_mut().append(name, value);
            }
            _ => tracing::warn!(header = %name, "Dropping invalid response header"),
        }
    }
    http_response
}

fn error_response(status: StatusCode, message: &str) -> HttpResponse {
    (status, axum::Json(json!({ "message": message }))).into_response()
}
