//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::tokens::ReissuePolicy;

/// Root configuration for the security gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The single upstream every admitted request is forwarded to.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Authentication and access policy.
    pub security: SecurityConfig,

    /// Token manager and token service settings.
    pub tokens: TokenConfig,

    /// Ordered authentication mechanisms.
    pub authentication: AuthenticationConfig,

    /// Ordered response interceptors.
    pub interceptors: Vec<PluginSpec>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream address (e.g., "127.0.0.1:3000").
    pub address: String,

    /// Largest upstream response body buffered for interceptors, in bytes.
    pub max_response_body: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
            max_response_body: 10 * 1024 * 1024,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Upstream call timeout in seconds.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            upstream_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Run the authentication stages at all. When off, no security
    /// context is attached and every request is anonymous.
    pub authentication_enabled: bool,

    /// Reject anonymous requests on proxied paths with 401.
    pub require_authentication: bool,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            authentication_enabled: true,
            require_authentication: true,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Registered token manager name.
    pub manager: String,

    /// Base URI of the token service; tokens live at `{service_uri}/{principal}`.
    pub service_uri: String,

    /// Mount the token service.
    pub service_enabled: bool,

    pub ttl_secs: u64,

    pub sweep_interval_secs: u64,

    pub reissue_policy: ReissuePolicy,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            manager: "random".to_string(),
            service_uri: "/tokens".to_string(),
            service_enabled: true,
            ttl_secs: 15 * 60,
            sweep_interval_secs: 60,
            reissue_policy: ReissuePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthenticationConfig {
    /// Tried in this order; first success wins.
    pub mechanisms: Vec<PluginSpec>,
}

/// A named plugin instance: `{ name, type, args }`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PluginSpec {
    /// Instance name, used in logs and metrics.
    pub name: String,

    /// Registered factory name.
    #[serde(rename = "type")]
    pub kind: String,

    /// Factory-specific arguments.
    #[serde(default)]
    pub args: toml::Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "security_gateway=info,tower_http=info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
