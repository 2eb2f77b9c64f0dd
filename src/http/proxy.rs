//! Upstream forwarding.
//!
//! # Responsibilities
//! - Rewrite the request URI to the configured upstream
//! - Strip hop-by-hop headers in both directions
//! - Enforce the upstream timeout over the call and the body read
//! - Buffer the upstream body so interceptors can mutate it

use std::str::FromStr;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::request::Parts;
use axum::http::uri::{Authority, Scheme};
use axum::http::{header, HeaderMap, HeaderName, Request, Uri};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time;

use crate::config::UpstreamConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::http::request::request_id;
use crate::interceptors::ProxiedResponse;

const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}

#[derive(Debug, Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    authority: Authority,
    timeout: Duration,
    max_response_body: usize,
}

impl Forwarder {
    pub fn new(config: &UpstreamConfig, timeout: Duration) -> GatewayResult<Self> {
        let authority = Authority::from_str(&config.address).map_err(|e| {
            GatewayError::Configuration(format!(
                "invalid upstream address '{}': {}",
                config.address, e
            ))
        })?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self {
            client,
            authority,
            timeout,
            max_response_body: config.max_response_body,
        })
    }

    fn upstream_uri(&self, original: &Uri) -> GatewayResult<Uri> {
        let mut parts = original.clone().into_parts();
        parts.scheme = Some(Scheme::HTTP);
        parts.authority = Some(self.authority.clone());
        if parts.path_and_query.is_none() {
            parts.path_and_query = Some("/".parse().map_err(|e| {
                GatewayError::Internal(format!("invalid default path: {}", e))
            })?);
        }
        Uri::from_parts(parts).map_err(|e| GatewayError::Internal(format!("invalid upstream uri: {}", e)))
    }

    pub async fn forward(&self, parts: &Parts, body: Bytes) -> GatewayResult<ProxiedResponse> {
        let mut headers = parts.headers.clone();
        strip_hop_by_hop(&mut headers);

        let mut request = Request::builder()
            .method(parts.method.clone())
            .uri(self.upstream_uri(&parts.uri)?)
            .version(parts.version)
            .body(Body::from(body))
            .map_err(|e| GatewayError::Internal(format!("failed to build upstream request: {}", e)))?;
        *request.headers_mut() = headers;

        tracing::debug!(
            request_id = %request_id(&parts.headers),
            upstream = %self.authority,
            uri = %request.uri(),
            "Forwarding request"
        );

        let call = async {
            let response: hyper::Response<Incoming> = self
                .client
                .request(request)
                .await
                .map_err(|e| GatewayError::Upstream(e.to_string()))?;

            let (head, incoming) = response.into_parts();
            let body = axum::body::to_bytes(Body::new(incoming), self.max_response_body)
                .await
                .map_err(|e| GatewayError::Upstream(format!("failed to read upstream body: {}", e)))?;
            Ok::<_, GatewayError>((head, body))
        };

        let (head, body) = match time::timeout(self.timeout, call).await {
            Ok(result) => result?,
            Err(_) => return Err(GatewayError::UpstreamTimeout(self.timeout.as_millis() as u64)),
        };

        let mut headers = head.headers;
        strip_hop_by_hop(&mut headers);
        // Body length may change once interceptors run.
        headers.remove(header::CONTENT_LENGTH);

        Ok(ProxiedResponse::new(head.status, headers, body))
    }
}
