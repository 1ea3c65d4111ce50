//! Tree traversal.
//!
//! # State Machine
//! ```text
//! Descending(context, request)
//!     → first child whose condition matches: Descending(child, rewritten)
//!     → no match, action present:            MatchedLeaf(context, request)
//!     → no match, no action:                 NotFound
//! ```
//!
//! # Design Decisions
//! - First match commits. A miss deeper down never retries a later sibling,
//!   so overlapping siblings silently shadow each other
//! - Iterative: depth costs no stack and no boxed futures
//! - Unmatched trailing path is left for the action to ignore or inspect

use super::context::Context;
use crate::http::{ApiResult, Request, Response};

/// Where a request ended up.
#[derive(Debug)]
pub enum Resolution<'a> {
    /// A context with an action; `request` is the fully rewritten request.
    Matched {
        context: &'a Context,
        request: Request,
        depth: usize,
    },
    /// Descent stopped at a context without an action.
    NotFound { request: Request, depth: usize },
}

impl Resolution<'_> {
    pub fn is_matched(&self) -> bool {
        matches!(self, Resolution::Matched { .. })
    }

    pub fn request(&self) -> &Request {
        match self {
            Resolution::Matched { request, .. } | Resolution::NotFound { request, .. } => request,
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Resolution::Matched { depth, .. } | Resolution::NotFound { depth, .. } => *depth,
        }
    }

    /// Invoke the matched action, or hand the response back untouched.
    pub async fn run(self, response: Response) -> ApiResult<Dispatch> {
        match self {
            Resolution::Matched {
                context, request, ..
            } => context.invoke(request, response).await.map(Dispatch::Handled),
            Resolution::NotFound { .. } => Ok(Dispatch::NotFound(response)),
        }
    }
}

/// Result of running a resolution.
#[derive(Debug)]
pub enum Dispatch {
    /// The action ran; this is the response it returned.
    Handled(Response),
    /// Nothing matched; the response was not touched.
    NotFound(Response),
}

impl Context {
    /// Find the leaf for `request`.
    pub fn resolve(&self, request: Request) -> Resolution<'_> {
        let mut context = self;
        let mut request = request;
        let mut depth = 0;

        'descend: loop {
            for child in context.children() {
                if let Some(rewritten) = child.condition().descend(&request) {
                    tracing::trace!(
                        depth,
                        condition = ?child.condition(),
                        remaining = %rewritten.path,
                        "Condition matched"
                    );
                    context = child.context();
                    request = rewritten;
                    depth += 1;
                    continue 'descend;
                }
            }
            break;
        }

        if context.has_action() {
            Resolution::Matched {
                context,
                request,
                depth,
            }
        } else {
            Resolution::NotFound { request, depth }
        }
    }

    /// Resolve and run in one step.
    pub async fn execute(&self, request: Request, response: Response) -> ApiResult<Dispatch> {
        self.resolve(request).run(response).await
    }
}
