//! Type information subsystem.
//!
//! # Data Flow
//! ```text
//! Declaration (body / query / params / returns)
//!     → info.rs (TypeInfo descriptors, channels, self-description)
//!     → check.rs (check / check_error diagnostics)
//!     → codec.rs (string and JSON conversions)
//!
//! Generic decode from a serialized tag:
//!     { "type": "array", ... }
//!     → registry.rs (identifier → codec lookup)
//!     → decoded serde_json::Value
//! ```
//!
//! # Design Decisions
//! - Values are `serde_json::Value`; the type system describes JSON shapes
//! - The variant set is closed, so behavior is exhaustive `match`
//! - The register is an injected service, not a process global

pub mod check;
pub mod codec;
pub mod error;
pub mod info;
pub mod registry;

pub use check::runtime_kind;
pub use codec::{date_value, parse_date};
pub use error::{TypeError, TypeResult};
pub use info::{Channel, Property, TypeInfo};
pub use registry::{Codec, ConversionRegister};
