//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all gateway handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Run the security pipeline on every request
//! - Forward admitted requests upstream and run response interceptors
//! - Merge the gateway's own headers into the final response
//! - Spawn the token sweeper and stop everything on shutdown

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, Response},
    response::IntoResponse,
    routing::any,
    Router,
};
use http_body_util::LengthLimitError;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::http::proxy::Forwarder;
use crate::http::request::{request_id, MakeRequestUuid};
use crate::interceptors::{InterceptorRegistry, ProxiedResponse};
use crate::lifecycle::{startup::build_pipeline, Shutdown};
use crate::observability::metrics;
use crate::pipeline::{Exchange, Outcome, Pipeline};
use crate::plugins::PluginContext;
use crate::security::SecurityContext;
use crate::tokens::{ExpirySweeper, TokenManager};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub interceptors: Arc<InterceptorRegistry>,
    pub forwarder: Arc<Forwarder>,
    pub authentication_enabled: bool,
    pub max_body_size: usize,
}

/// HTTP server for the security gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
    token_manager: Arc<dyn TokenManager>,
}

impl GatewayServer {
    /// Build the pipeline and router from resolved plugins.
    pub fn new(config: GatewayConfig, plugins: PluginContext) -> GatewayResult<Self> {
        let pipeline = build_pipeline(&config, &plugins);
        tracing::info!(stages = ?pipeline.stage_names(), "Pipeline built");

        let forwarder = Forwarder::new(
            &config.upstream,
            Duration::from_secs(config.timeouts.upstream_secs),
        )?;

        let state = AppState {
            pipeline: Arc::new(pipeline),
            interceptors: Arc::new(plugins.interceptors),
            forwarder: Arc::new(forwarder),
            authentication_enabled: config.security.authentication_enabled,
            max_body_size: config.security.max_body_size,
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            token_manager: plugins.token_manager,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        tracing::info_span!(
                            "request",
                            method = %request.method(),
                            uri = %request.uri(),
                            request_id = %request_id(request.headers()),
                        )
                    }))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Run the server on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.address,
            "HTTP server starting"
        );

        let sweeper = ExpirySweeper::new(
            self.token_manager.clone(),
            Duration::from_secs(self.config.tokens.sweep_interval_secs),
        );
        let sweeper_handle = tokio::spawn(sweeper.run(shutdown.subscribe()));

        let mut stop = shutdown.subscribe();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        if let Err(e) = sweeper_handle.await {
            tracing::warn!(error = %e, "Token sweeper task failed");
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn token_manager(&self) -> &Arc<dyn TokenManager> {
        &self.token_manager
    }
}

/// Catch-all handler: pipeline, then upstream, then interceptors.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response<Body> {
    let start = Instant::now();
    let method = request.method().clone();

    let response = match dispatch(&state, request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}

async fn dispatch(state: &AppState, request: Request<Body>) -> GatewayResult<Response<Body>> {
    let (parts, body) = request.into_parts();

    let mut exchange = Exchange::new(parts.method.clone(), parts.uri.clone(), parts.headers.clone());
    if state.authentication_enabled {
        exchange = exchange.with_security_context(SecurityContext::new());
    }

    if state.pipeline.process(&mut exchange)? == Outcome::Terminated {
        tracing::debug!(
            request_id = %request_id(&parts.headers),
            status = %exchange.status(),
            "Request answered by gateway"
        );
        return Ok(exchange.into_response());
    }

    let body = axum::body::to_bytes(body, state.max_body_size)
        .await
        .map_err(|e| body_error(e, state.max_body_size))?;

    let mut upstream = state.forwarder.forward(&parts, body).await?;
    state.interceptors.apply(&mut upstream, &exchange);

    let ProxiedResponse {
        status,
        mut headers,
        body,
    } = upstream;
    // Gateway headers replace any upstream value of the same name.
    headers.extend(exchange.take_response_headers());

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

/// Only an exceeded limit is the client's oversized payload; anything else
/// means the body could not be read.
fn body_error(error: axum::Error, limit: usize) -> GatewayError {
    let inner = error.into_inner();
    if inner.downcast_ref::<LengthLimitError>().is_some() {
        GatewayError::PayloadTooLarge(limit)
    } else {
        GatewayError::BadRequest(format!("failed to read request body: {}", inner))
    }
}
