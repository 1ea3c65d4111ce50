//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path, body, query, headers)
//!     → api.rs (info endpoint, root error boundary)
//!     → dispatch.rs (descend: first matching child wins)
//!         → condition.rs (applies_to + rewrite per level)
//!     → declaration.rs (optional check of the matched leaf)
//!     → context.rs (invoke the leaf action)
//!     → Return: Handling { outcome, response }
//!
//! Tree construction (at startup):
//!     Context::new()
//!     → path / on / get / post / add_child (ordered)
//!     → describe / set_field / declare
//!     → moved into RestfulApi, frozen
//! ```
//!
//! # Design Decisions
//! - Tree built once, read-only while serving: no locks on the hot path
//! - Deterministic: same input always resolves to the same leaf
//! - First match wins, no backtracking (overlapping siblings shadow)
//! - Routing misses are values, not errors

pub mod api;
pub mod condition;
pub mod context;
pub mod declaration;
pub mod dispatch;
pub mod info;

pub use api::{ApiOptions, Handling, Outcome, RestfulApi};
pub use condition::{
    path_and_method, AndCondition, AnyCondition, ChainCondition, Condition, ConditionInfo,
    MethodCondition, PathCondition, PathRegexCondition,
};
pub use context::{Action, Child, Context, Field};
pub use declaration::Declaration;
pub use dispatch::{Dispatch, Resolution};
pub use info::InfoNode;
