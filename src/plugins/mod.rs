//! Plugin resolution.
//!
//! # Data Flow
//! ```text
//! GatewayConfig
//!     → registry.rs (look up each configured type by name, build it)
//!     → PluginContext (token manager, ordered mechanisms, interceptor registry)
//!     → lifecycle::startup builds the pipeline from it
//! ```
//!
//! # Design Decisions
//! - Resolution happens once, at startup; failures abort boot
//! - Embedders register extra factories before resolving

pub mod registry;

pub use registry::{
    plugin_args, InterceptorFactory, MechanismFactory, PluginContext, PluginRegistry,
    TokenManagerFactory,
};
