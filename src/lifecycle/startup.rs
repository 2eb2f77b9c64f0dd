//! Startup orchestration.
//!
//! # Responsibilities
//! - Resolve plugins from validated configuration
//! - Assemble the pipeline in its fixed stage order
//! - Hand both to the HTTP server
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The chain is immutable once built

use crate::config::{validate_config, GatewayConfig};
use crate::error::{GatewayError, GatewayResult};
use crate::http::GatewayServer;
use crate::pipeline::Pipeline;
use crate::plugins::{PluginContext, PluginRegistry};
use crate::security::{AccessGate, AuthenticationStage, MechanismComposer};
use crate::tokens::{TokenIssuer, TokenService};

/// composer → authentication → token issuer → token service → access gate.
///
/// The token service is left out when `tokens.service_enabled` is off.
pub fn build_pipeline(config: &GatewayConfig, plugins: &PluginContext) -> Pipeline {
    let mut builder = Pipeline::builder()
        .stage(MechanismComposer::new(plugins.mechanisms.clone()))
        .stage(AuthenticationStage::new())
        .stage(TokenIssuer::new(plugins.token_manager.clone()));

    if config.tokens.service_enabled {
        builder = builder.stage(TokenService::new(
            config.tokens.service_uri.clone(),
            plugins.token_manager.clone(),
        ));
    }

    builder
        .stage(AccessGate::new(config.security.require_authentication))
        .build()
}

/// Validate `config`, resolve plugins with `registry` and build the server.
/// Nothing is bound yet.
///
/// Configs built in code get the same checks as loaded ones.
pub fn bootstrap(config: GatewayConfig, registry: &PluginRegistry) -> GatewayResult<GatewayServer> {
    validate_config(&config).map_err(|errors| {
        let details = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        GatewayError::Configuration(format!("invalid configuration: {}", details))
    })?;

    let plugins = registry.resolve(&config)?;
    GatewayServer::new(config, plugins)
}
