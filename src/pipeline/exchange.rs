//! The per-request exchange passed down the pipeline.
//!
//! # Responsibilities
//! - Expose the request line and headers read-only
//! - Own the per-request security context (if any)
//! - Accumulate the response: status, headers, body
//! - Track completion so a terminated exchange is never processed further

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::Response,
};
use serde::Serialize;

use crate::error::{GatewayError, GatewayResult};
use crate::security::{Principal, SecurityContext};

/// One request/response exchange.
///
/// Created when the request arrives and dropped when the response has been
/// handed to the transport, taking the security context with it.
#[derive(Debug)]
pub struct Exchange {
    method: Method,
    uri: Uri,
    request_headers: HeaderMap,
    security_context: Option<SecurityContext>,
    status: StatusCode,
    response_headers: HeaderMap,
    body: Bytes,
    complete: bool,
}

impl Exchange {
    /// Create an exchange without a security context.
    pub fn new(method: Method, uri: Uri, request_headers: HeaderMap) -> Self {
        Self {
            method,
            uri,
            request_headers,
            security_context: None,
            status: StatusCode::OK,
            response_headers: HeaderMap::new(),
            body: Bytes::new(),
            complete: false,
        }
    }

    pub fn with_security_context(mut self, context: SecurityContext) -> Self {
        self.security_context = Some(context);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Raw (still percent-encoded) request path.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn request_headers(&self) -> &HeaderMap {
        &self.request_headers
    }

    pub fn request_header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.request_headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn security_context(&self) -> Option<&SecurityContext> {
        self.security_context.as_ref()
    }

    pub fn security_context_mut(&mut self) -> Option<&mut SecurityContext> {
        self.security_context.as_mut()
    }

    /// The authenticated principal, if a security context exists and holds one.
    pub fn principal(&self) -> Option<&Principal> {
        self.security_context
            .as_ref()
            .and_then(|ctx| ctx.authenticated_principal())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    pub fn response_headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.response_headers
    }

    pub fn response_header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.response_headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Serialize `value` as the JSON response body.
    pub fn set_json<T: Serialize>(&mut self, value: &T) -> GatewayResult<()> {
        let body = serde_json::to_vec(value)
            .map_err(|e| GatewayError::Internal(format!("failed to encode response: {}", e)))?;
        self.response_headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.body = Bytes::from(body);
        Ok(())
    }

    /// Set the final status and mark the exchange complete.
    pub fn end(&mut self, status: StatusCode) {
        self.status = status;
        self.complete = true;
    }

    pub fn mark_complete(&mut self) {
        self.complete = true;
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Hand over the headers stamped so far, leaving the exchange empty.
    pub fn take_response_headers(&mut self) -> HeaderMap {
        std::mem::take(&mut self.response_headers)
    }

    /// Build the transport response for a terminated exchange.
    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.response_headers;
        response
    }
}
