//! Route contexts.
//!
//! # Responsibilities
//! - Own ordered `(condition, child)` entries; first match wins
//! - Carry descriptions, fields and an optional declaration
//! - Hold at most one action
//!
//! # Design Decisions
//! - Children are owned; no parent pointers, no cycles
//! - Registration needs `&mut Context`. Once the root moves into a
//!   `RestfulApi` the tree is shared read-only, so late registration is
//!   impossible by construction
//! - Conveniences (`path`, `get`, `post`, ...) are thin wrappers over
//!   `add_child` and `set_action`

use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use super::condition::{AnyCondition, Condition, MethodCondition, PathCondition, PathRegexCondition};
use super::declaration::Declaration;
use crate::http::{ApiError, ApiResult, Request, Response};

/// Terminal handler of a context.
///
/// Receives the rewritten request and the response by value and hands the
/// response back when done.
pub trait Action: Send + Sync {
    fn call(&self, request: Request, response: Response) -> BoxFuture<'static, ApiResult<Response>>;
}

impl<F, Fut> Action for F
where
    F: Fn(Request, Response) -> Fut + Send + Sync,
    Fut: Future<Output = ApiResult<Response>> + Send + 'static,
{
    fn call(&self, request: Request, response: Response) -> BoxFuture<'static, ApiResult<Response>> {
        Box::pin((self)(request, response))
    }
}

/// A named metadata value shown by introspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    pub value: Value,
}

/// A child entry: the condition guarding descent and the context behind it.
pub struct Child {
    pub(crate) condition: Box<dyn Condition>,
    pub(crate) context: Context,
}

impl Child {
    pub fn condition(&self) -> &dyn Condition {
        self.condition.as_ref()
    }

    pub fn context(&self) -> &Context {
        &self.context
    }
}

/// A node of the route tree.
#[derive(Default)]
pub struct Context {
    children: Vec<Child>,
    action: Option<Arc<dyn Action>>,
    descriptions: Vec<String>,
    fields: Vec<Field>,
    declaration: Option<Declaration>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `child` behind `condition` and return it for further building.
    pub fn add_child(&mut self, condition: impl Condition + 'static, child: Context) -> &mut Context {
        self.add_boxed_child(Box::new(condition), child)
    }

    pub fn add_boxed_child(&mut self, condition: Box<dyn Condition>, child: Context) -> &mut Context {
        self.children.push(Child {
            condition,
            context: child,
        });
        let last = self.children.len() - 1;
        &mut self.children[last].context
    }

    /// Append an empty child behind `condition`.
    pub fn child(&mut self, condition: impl Condition + 'static) -> &mut Context {
        self.add_child(condition, Context::new())
    }

    /// Child guarded by a path prefix.
    pub fn path(&mut self, prefix: impl Into<String>) -> &mut Context {
        self.child(PathCondition::new(prefix))
    }

    /// Child guarded by an anchored path regex; named groups become params.
    pub fn path_regex(&mut self, pattern: &str) -> Result<&mut Context, regex::Error> {
        Ok(self.child(PathRegexCondition::new(pattern)?))
    }

    /// Child guarded by `method` that runs `action`.
    pub fn on<F, Fut>(&mut self, method: &str, action: F) -> &mut Context
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<Response>> + Send + 'static,
    {
        let child = self.child(MethodCondition::new(method));
        child.set_action(action);
        child
    }

    pub fn get<F, Fut>(&mut self, action: F) -> &mut Context
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<Response>> + Send + 'static,
    {
        self.on("GET", action)
    }

    pub fn post<F, Fut>(&mut self, action: F) -> &mut Context
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<Response>> + Send + 'static,
    {
        self.on("POST", action)
    }

    pub fn put<F, Fut>(&mut self, action: F) -> &mut Context
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<Response>> + Send + 'static,
    {
        self.on("PUT", action)
    }

    pub fn patch<F, Fut>(&mut self, action: F) -> &mut Context
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<Response>> + Send + 'static,
    {
        self.on("PATCH", action)
    }

    pub fn delete<F, Fut>(&mut self, action: F) -> &mut Context
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<Response>> + Send + 'static,
    {
        self.on("DELETE", action)
    }

    /// Child that matches every method.
    pub fn any<F, Fut>(&mut self, action: F) -> &mut Context
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<Response>> + Send + 'static,
    {
        let child = self.child(AnyCondition);
        child.set_action(action);
        child
    }

    /// Append a description line.
    pub fn describe(&mut self, text: impl Into<String>) -> &mut Self {
        self.descriptions.push(text.into());
        self
    }

    /// Set a field. Later writes replace the value but keep the position.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|field| field.name == name) {
            Some(field) => field.value = value,
            None => self.fields.push(Field { name, value }),
        }
        self
    }

    /// Attach or replace the declaration.
    pub fn declare(&mut self, declaration: Declaration) -> &mut Self {
        self.declaration = Some(declaration);
        self
    }

    /// Attach or replace the action.
    pub fn set_action<F, Fut>(&mut self, action: F) -> &mut Self
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<Response>> + Send + 'static,
    {
        self.action = Some(Arc::new(action));
        self
    }

    pub fn children(&self) -> &[Child] {
        &self.children
    }

    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    pub fn descriptions(&self) -> &[String] {
        &self.descriptions
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.value)
    }

    pub fn declaration(&self) -> Option<&Declaration> {
        self.declaration.as_ref()
    }

    /// Run this context's action.
    pub async fn invoke(&self, request: Request, response: Response) -> ApiResult<Response> {
        match &self.action {
            Some(action) => action.call(request, response).await,
            None => Err(ApiError::internal("context has no action")),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field(
                "children",
                &self
                    .children
                    .iter()
                    .map(|child| (&child.condition, &child.context))
                    .collect::<Vec<_>>(),
            )
            .field("action", &self.action.is_some())
            .field("descriptions", &self.descriptions)
            .field("fields", &self.fields)
            .field("declaration", &self.declaration)
            .finish()
    }
}
