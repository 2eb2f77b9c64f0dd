//! Response interceptors.
//!
//! Interceptors run after the upstream response is buffered and before the
//! gateway's own headers are merged in. They run in registration order.
//! A failing interceptor is logged and its partial edits are dropped; the
//! response keeps whatever earlier interceptors produced.

pub mod headers;

use std::fmt;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};

use crate::error::InterceptorError;
use crate::observability::metrics;
use crate::pipeline::Exchange;

pub use headers::{RemoveHeadersInterceptor, SetHeadersInterceptor};

/// A buffered upstream response, open for mutation.
#[derive(Debug, Clone)]
pub struct ProxiedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ProxiedResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }
}

pub trait ResponseInterceptor: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Whether this interceptor applies to the request behind `exchange`.
    fn resolve(&self, _exchange: &Exchange) -> bool {
        true
    }

    fn handle(
        &self,
        response: &mut ProxiedResponse,
        exchange: &Exchange,
    ) -> Result<(), InterceptorError>;
}

/// Ordered, immutable list of interceptors.
#[derive(Debug, Clone, Default)]
pub struct InterceptorRegistry {
    interceptors: Vec<Arc<dyn ResponseInterceptor>>,
}

impl InterceptorRegistry {
    pub fn new(interceptors: Vec<Arc<dyn ResponseInterceptor>>) -> Self {
        Self { interceptors }
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    /// Run every applicable interceptor over `response`. Returns the number
    /// of interceptors that failed.
    pub fn apply(&self, response: &mut ProxiedResponse, exchange: &Exchange) -> usize {
        let mut failures = 0;

        for interceptor in &self.interceptors {
            if !interceptor.resolve(exchange) {
                continue;
            }

            let mut draft = response.clone();
            match interceptor.handle(&mut draft, exchange) {
                Ok(()) => *response = draft,
                Err(e) => {
                    failures += 1;
                    tracing::warn!(
                        interceptor = %e.interceptor,
                        path = %exchange.path(),
                        error = %e.reason,
                        "Response interceptor failed"
                    );
                    metrics::record_interceptor_failure(interceptor.name());
                }
            }
        }

        failures
    }
}
