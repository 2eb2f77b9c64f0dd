//! Name → factory tables for pluggable components.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::config::{GatewayConfig, PluginSpec, TokenConfig};
use crate::error::{GatewayError, GatewayResult};
use crate::interceptors::headers::{RemoveHeadersArgs, SetHeadersArgs};
use crate::interceptors::{
    InterceptorRegistry, RemoveHeadersInterceptor, ResponseInterceptor, SetHeadersInterceptor,
};
use crate::security::{AuthMechanism, BasicArgs, BasicAuthMechanism};
use crate::tokens::{RandomTokenManager, TokenAuthMechanism, TokenManager};

pub type TokenManagerFactory =
    Box<dyn Fn(&TokenConfig) -> GatewayResult<Arc<dyn TokenManager>> + Send + Sync>;

/// Mechanism factories receive the resolved token manager so they can
/// authenticate against issued tokens.
pub type MechanismFactory = Box<
    dyn Fn(&PluginSpec, &Arc<dyn TokenManager>) -> GatewayResult<Arc<dyn AuthMechanism>>
        + Send
        + Sync,
>;

pub type InterceptorFactory =
    Box<dyn Fn(&PluginSpec) -> GatewayResult<Arc<dyn ResponseInterceptor>> + Send + Sync>;

/// Components resolved from configuration, ready to wire into the pipeline.
#[derive(Debug, Clone)]
pub struct PluginContext {
    pub token_manager: Arc<dyn TokenManager>,
    pub mechanisms: Vec<Arc<dyn AuthMechanism>>,
    pub interceptors: InterceptorRegistry,
}

#[derive(Default)]
pub struct PluginRegistry {
    token_managers: HashMap<String, TokenManagerFactory>,
    mechanisms: HashMap<String, MechanismFactory>,
    interceptors: HashMap<String, InterceptorFactory>,
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn sorted(mut names: Vec<&String>) -> Vec<&String> {
            names.sort();
            names
        }

        f.debug_struct("PluginRegistry")
            .field("token_managers", &sorted(self.token_managers.keys().collect()))
            .field("mechanisms", &sorted(self.mechanisms.keys().collect()))
            .field("interceptors", &sorted(self.interceptors.keys().collect()))
            .finish()
    }
}

/// Deserialize a plugin's `args` table into its typed arguments.
pub fn plugin_args<T: DeserializeOwned>(spec: &PluginSpec) -> GatewayResult<T> {
    toml::Value::Table(spec.args.clone())
        .try_into()
        .map_err(|e| {
            GatewayError::Configuration(format!(
                "invalid args for '{}' ({}): {}",
                spec.name, spec.kind, e
            ))
        })
}

impl PluginRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in component:
    /// token manager `random`, mechanisms `basic` and `token`,
    /// interceptors `set-headers` and `remove-headers`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        registry.register_token_manager("random", |config| {
            Ok(Arc::new(RandomTokenManager::new(
                Duration::from_secs(config.ttl_secs),
                config.reissue_policy,
                config.service_uri.clone(),
            )))
        });

        registry.register_mechanism("basic", |spec, _| {
            let args: BasicArgs = plugin_args(spec)?;
            Ok(Arc::new(BasicAuthMechanism::new(spec.name.clone(), args)))
        });
        registry.register_mechanism("token", |spec, tokens| {
            Ok(Arc::new(TokenAuthMechanism::new(spec.name.clone(), tokens.clone())))
        });

        registry.register_interceptor("set-headers", |spec| {
            let args: SetHeadersArgs = plugin_args(spec)?;
            Ok(Arc::new(SetHeadersInterceptor::new(spec.name.clone(), args)?))
        });
        registry.register_interceptor("remove-headers", |spec| {
            let args: RemoveHeadersArgs = plugin_args(spec)?;
            Ok(Arc::new(RemoveHeadersInterceptor::new(spec.name.clone(), args)?))
        });

        registry
    }

    pub fn register_token_manager<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&TokenConfig) -> GatewayResult<Arc<dyn TokenManager>> + Send + Sync + 'static,
    {
        self.token_managers.insert(kind.into(), Box::new(factory));
    }

    pub fn register_mechanism<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&PluginSpec, &Arc<dyn TokenManager>) -> GatewayResult<Arc<dyn AuthMechanism>>
            + Send
            + Sync
            + 'static,
    {
        self.mechanisms.insert(kind.into(), Box::new(factory));
    }

    pub fn register_interceptor<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&PluginSpec) -> GatewayResult<Arc<dyn ResponseInterceptor>> + Send + Sync + 'static,
    {
        self.interceptors.insert(kind.into(), Box::new(factory));
    }

    /// Resolve every configured component. Any failure is fatal.
    pub fn resolve(&self, config: &GatewayConfig) -> GatewayResult<PluginContext> {
        let token_manager = self.resolve_token_manager(&config.tokens)?;

        let mechanisms = config
            .authentication
            .mechanisms
            .iter()
            .map(|spec| {
                let factory = self
                    .mechanisms
                    .get(&spec.kind)
                    .ok_or_else(|| self.unknown("authentication mechanism", &spec.kind))?;
                factory(spec, &token_manager)
            })
            .collect::<GatewayResult<Vec<_>>>()?;

        let interceptors = config
            .interceptors
            .iter()
            .map(|spec| {
                let factory = self
                    .interceptors
                    .get(&spec.kind)
                    .ok_or_else(|| self.unknown("interceptor", &spec.kind))?;
                factory(spec)
            })
            .collect::<GatewayResult<Vec<_>>>()?;

        tracing::info!(
            token_manager = %token_manager.name(),
            mechanisms = ?config.authentication.mechanisms.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(),
            interceptors = ?config.interceptors.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(),
            "Plugins resolved"
        );

        Ok(PluginContext {
            token_manager,
            mechanisms,
            interceptors: InterceptorRegistry::new(interceptors),
        })
    }

    fn resolve_token_manager(&self, config: &TokenConfig) -> GatewayResult<Arc<dyn TokenManager>> {
        let factory = self
            .token_managers
            .get(&config.manager)
            .ok_or_else(|| self.unknown("token manager", &config.manager))?;
        factory(config)
    }

    /// Error for a missing factory, naming the table the type actually lives in.
    fn unknown(&self, wanted: &str, kind: &str) -> GatewayError {
        let actual = if self.token_managers.contains_key(kind) {
            Some("token manager")
        } else if self.mechanisms.contains_key(kind) {
            Some("authentication mechanism")
        } else if self.interceptors.contains_key(kind) {
            Some("interceptor")
        } else {
            None
        };

        match actual {
            Some(actual) => GatewayError::Configuration(format!(
                "type '{}' is registered as {}, expected {}",
                kind, actual, wanted
            )),
            None => GatewayError::Configuration(format!("unknown {} '{}'", wanted, kind)),
        }
    }
}
