//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → plugins resolved once, pipeline built once
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AuthenticationConfig, GatewayConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    PluginSpec, SecurityConfig, TimeoutConfig, TokenConfig, UpstreamConfig,
};
pub use validation::{validate_config, ValidationError};
