//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ApiConfig (validated, immutable)
//!     → ApiOptions / ApiServer / observability at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError, ConfigResult};
pub use schema::{
    ApiConfig, ApiSection, LimitsConfig, ListenerConfig, ObservabilityConfig, RegistryConfig,
    TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
