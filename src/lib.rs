//! Security gateway library.
//!
//! Authenticates inbound HTTP requests through an ordered chain of
//! pluggable mechanisms, issues and manages bearer tokens, and forwards
//! admitted requests to a single upstream whose responses pass through
//! response interceptors.

pub mod config;
pub mod error;
pub mod http;
pub mod interceptors;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod plugins;
pub mod security;
pub mod tokens;

pub use config::schema::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
pub use plugins::{PluginContext, PluginRegistry};
