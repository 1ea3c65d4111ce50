//! Root of a route tree.
//!
//! # Responsibilities
//! - Own the frozen tree and the conversion register
//! - Serve the introspection endpoint
//! - Validate requests against the matched declaration, and successful JSON
//!   bodies against its `returns` type
//! - Turn every way a dispatch can end into exactly one response
//!
//! # Error Rendering
//! ```text
//! NotFound + send_404     → 404 {message, path, api_path, method}
//! Err(ApiError::Http(e))  → e.status {message: e.message}
//! Err(anything else)      → 500 {message: "Internal server error"}, logged
//! action panicked         → same as Err(anything else)
//! ```
//! Failures while writing an error response are logged and swallowed.

use futures_util::FutureExt;
use serde_json::{json, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use super::context::Context;
use super::dispatch::Resolution;
use super::info::InfoNode;
use crate::config::ApiSection;
use crate::http::{ApiError, ApiResult, HttpError, Request, Response, ResponseError};
use crate::observability::metrics;
use crate::types::{ConversionRegister, TypeResult};

/// Message of every 500 response.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Message of every structured 404 response.
pub const NOT_FOUND_MESSAGE: &str = "Not found";

/// Root dispatch behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiOptions {
    /// Render a structured 404 on a routing miss. When off, the response is
    /// handed back untouched and the caller decides.
    pub send_404: bool,
    /// Reject requests failing the matched declaration with a 400, and
    /// answer 500 when a successful JSON body breaks its `returns` type.
    pub validate_declarations: bool,
    /// `GET <info_path>` returns the introspection tree.
    pub info_path: Option<String>,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            send_404: true,
            validate_declarations: true,
            info_path: None,
        }
    }
}

impl From<&ApiSection> for ApiOptions {
    fn from(section: &ApiSection) -> Self {
        Self {
            send_404: section.send_404,
            validate_declarations: section.validate_declarations,
            info_path: section.info_path.clone(),
        }
    }
}

/// How a call to [`RestfulApi::handle`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// An action ran, or the info endpoint answered.
    Handled,
    /// No action matched.
    NotFound,
    /// The action or validation failed; an error response was rendered.
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Handled => "handled",
            Outcome::NotFound => "not_found",
            Outcome::Failed => "failed",
        }
    }
}

/// Outcome plus the response to send.
#[derive(Debug)]
pub struct Handling {
    pub outcome: Outcome,
    pub response: Response,
}

/// A frozen route tree ready to serve.
#[derive(Debug)]
pub struct RestfulApi {
    root: Context,
    options: ApiOptions,
    register: Arc<ConversionRegister>,
}

impl RestfulApi {
    pub fn new(root: Context) -> Self {
        Self::with_options(root, ApiOptions::default())
    }

    /// Root with a fresh last-writer-wins register.
    pub fn with_options(root: Context, options: ApiOptions) -> Self {
        let register = Arc::new(ConversionRegister::new());
        if let Err(err) = register_declared(&root, &register) {
            tracing::warn!(error = %err, "Declared type was not registered");
        }
        Self {
            root,
            options,
            register,
        }
    }

    /// Root sharing `register`. Fails if a strict register refuses one of
    /// the declared types.
    pub fn with_register(
        root: Context,
        options: ApiOptions,
        register: Arc<ConversionRegister>,
    ) -> TypeResult<Self> {
        register_declared(&root, &register)?;
        Ok(Self {
            root,
            options,
            register,
        })
    }

    pub fn root(&self) -> &Context {
        &self.root
    }

    pub fn options(&self) -> &ApiOptions {
        &self.options
    }

    pub fn register(&self) -> &Arc<ConversionRegister> {
        &self.register
    }

    pub fn info(&self) -> InfoNode {
        self.root.info()
    }

    /// Dispatch `request` and produce exactly one finished response.
    pub async fn handle(&self, request: Request, response: Response) -> Handling {
        let start = Instant::now();
        let method = request.method.clone();
        let full_path = request.full_path.clone();
        let api_path = request.full_api_path.clone();
        let request_id = request.header("x-request-id").unwrap_or("-").to_string();

        let handling = if self.is_info_request(&request) {
            self.serve_info(response)
        } else {
            match self.root.resolve(request) {
                Resolution::Matched {
                    context,
                    request,
                    depth,
                } => {
                    tracing::debug!(request_id = %request_id, depth, "Dispatching to action");
                    match self.run_action(context, request, response).await {
                        Ok(response) => Handling {
                            outcome: Outcome::Handled,
                            response: finish(response),
                        },
                        Err(err) => Handling {
                            outcome: Outcome::Failed,
                            response: render_error(&request_id, err),
                        },
                    }
                }
                Resolution::NotFound { depth, .. } => {
                    tracing::debug!(
                        request_id = %request_id,
                        method = %method,
                        path = %full_path,
                        depth,
                        "No action matched"
                    );
                    self.not_found(response, &method, &full_path, Value::String(api_path))
                }
            }
        };

        tracing::info!(
            request_id = %request_id,
            method = %method,
            path = %full_path,
            status = handling.response.status_code(),
            outcome = handling.outcome.as_str(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Request handled"
        );
        metrics::record_dispatch(handling.outcome.as_str());
        metrics::record_request(&method, handling.response.status_code(), start);
        handling
    }

    /// Answer a request whose path lies outside the API's mount. Nothing
    /// is dispatched; the 404 carries a null `api_path`.
    pub fn reject_unmounted(&self, method: &str, full_path: &str, response: Response) -> Handling {
        let start = Instant::now();
        tracing::debug!(method = %method, path = %full_path, "Path outside the mount");
        let handling = self.not_found(response, method, full_path, Value::Null);
        metrics::record_dispatch(handling.outcome.as_str());
        metrics::record_request(method, handling.response.status_code(), start);
        handling
    }

    fn not_found(&self, response: Response, method: &str, full_path: &str, api_path: Value) -> Handling {
        let response = if self.options.send_404 {
            render_json(
                404,
                json!({
                    "message": NOT_FOUND_MESSAGE,
                    "path": full_path,
                    "api_path": api_path,
                    "method": method,
                }),
            )
        } else {
            response
        };
        Handling {
            outcome: Outcome::NotFound,
            response,
        }
    }

    fn is_info_request(&self, request: &Request) -> bool {
        match &self.options.info_path {
            Some(info_path) => {
                request.method.eq_ignore_ascii_case("GET") && request.path == *info_path
            }
            None => false,
        }
    }

    fn serve_info(&self, mut response: Response) -> Handling {
        let written = response
            .json(self.root.info())
            .and_then(|response| response.end())
            .map(|_| ());
        match written {
            Ok(()) => Handling {
                outcome: Outcome::Handled,
                response,
            },
            Err(err) => Handling {
                outcome: Outcome::Failed,
                response: render_error("-", err.into()),
            },
        }
    }

    async fn run_action(
        &self,
        context: &Context,
        request: Request,
        response: Response,
    ) -> ApiResult<Response> {
        if self.options.validate_declarations {
            if let Some(reason) = context
                .declaration()
                .and_then(|declaration| declaration.check_request(&request))
            {
                return Err(HttpError::bad_request(reason).into());
            }
        }
        let response = match AssertUnwindSafe(context.invoke(request, response))
            .catch_unwind()
            .await
        {
            Ok(result) => result?,
            Err(panic) => {
                return Err(ApiError::internal(format!(
                    "action panicked: {}",
                    panic_message(&*panic)
                )))
            }
        };
        if self.options.validate_declarations && response.status_code() < 300 {
            if let (Some(declaration), Some(body)) = (context.declaration(), response.json_body()) {
                if let Some(reason) = declaration.check_returns(body) {
                    return Err(ApiError::internal(reason));
                }
            }
        }
        Ok(response)
    }
}

/// Register every declared type and warn about unsendable parameters.
fn register_declared(root: &Context, register: &ConversionRegister) -> TypeResult<()> {
    let info = root.info();
    for node in info.walk() {
        let Some(declaration) = &node.declaration else {
            continue;
        };
        for violation in declaration.channel_violations() {
            tracing::warn!(path = %node.path, violation = %violation, "Declared type cannot travel over its channel");
        }
        for type_info in declaration.types() {
            register.register(type_info)?;
        }
    }
    Ok(())
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string payload"
    }
}

/// End an action's response unless it already did.
fn finish(mut response: Response) -> Response {
    if !response.is_ended() {
        if let Err(err) = response.end() {
            tracing::warn!(error = %err, "Failed to end response");
        }
    }
    response
}

fn write_json(status: u16, body: serde_json::Value) -> Result<Response, ResponseError> {
    let mut response = Response::new();
    response.status(status)?.json(body)?.end()?;
    Ok(response)
}

fn render_json(status: u16, body: serde_json::Value) -> Response {
    match write_json(status, body) {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(status, error = %err, "Failed to write response");
            internal_error()
        }
    }
}

fn internal_error() -> Response {
    write_json(500, json!({ "message": INTERNAL_ERROR_MESSAGE })).unwrap_or_else(|err| {
        tracing::error!(error = %err, "Failed to write internal error response");
        Response::new()
    })
}

fn render_error(request_id: &str, err: ApiError) -> Response {
    match err.as_http() {
        Some(http) => {
            tracing::debug!(request_id = %request_id, status = http.status, message = %http.message, "Declared HTTP error");
            render_json(http.status, json!({ "message": http.message }))
        }
        None => {
            tracing::error!(request_id = %request_id, error = %err, "Request failed");
            internal_error()
        }
    }
}
