//! Gateway error taxonomy.
//!
//! Request-time errors are mapped to HTTP status codes at the pipeline
//! boundary. The client only ever sees the status and a fixed error code;
//! the message is logged.

use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    /// Wrong or missing plugin wiring. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("authentication error: {0}")]
    Authentication(String),

    #[error("authorization error: {0}")]
    Authorization(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(Method),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("upstream timeout after {0}ms")]
    UpstreamTimeout(u64),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::Authorization(_) => StatusCode::FORBIDDEN,
            Self::UnsupportedOperation(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Configuration(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Authentication(_) => "AUTHENTICATION_ERROR",
            Self::Authorization(_) => "AUTHORIZATION_ERROR",
            Self::UnsupportedOperation(_) => "METHOD_NOT_ALLOWED",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            Self::Upstream(_) => "BAD_GATEWAY",
            Self::UpstreamTimeout(_) => "GATEWAY_TIMEOUT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let body = Json(json!({ "error": self.error_code() }));
        (status, body).into_response()
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Failure reported by a response interceptor.
///
/// Never aborts the response; the registry logs it and moves on.
#[derive(Error, Debug)]
#[error("interceptor {interceptor} failed: {reason}")]
pub struct InterceptorError {
    pub interceptor: String,
    pub reason: String,
}

impl InterceptorError {
    pub fn new(interceptor: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            interceptor: interceptor.into(),
            reason: reason.into(),
        }
    }
}
