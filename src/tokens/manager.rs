//! Token manager capability and the random-token implementation.
//!
//! # Per-principal states
//! ```text
//! NoToken → Valid → Expired      (deadline passed: sweep or lazy on validate)
//!                 → Invalidated  (explicit invalidate, or replaced by generate)
//! ```

use std::fmt;
use std::time::Duration;

use axum::http::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, GatewayResult};
use crate::observability::metrics;
use crate::security::Principal;
use crate::tokens::store::{IssueKind, IssuedToken, TokenStore};

/// Response header carrying the token value.
pub const AUTH_TOKEN_HEADER: &str = "auth-token";
/// Response header carrying the token deadline (RFC 3339).
pub const AUTH_TOKEN_VALID_HEADER: &str = "auth-token-valid-until";
/// Response header carrying the token resource URI.
pub const AUTH_TOKEN_LOCATION_HEADER: &str = "auth-token-location";

/// What `issue` does when the principal already holds a live token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReissuePolicy {
    /// Hand out the same token with its remaining validity window.
    #[default]
    Preserve,
    /// Hand out the same token with a full new deadline.
    Renew,
}

/// Everything the pipeline needs from a token manager.
pub trait TokenManager: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Always create a new token, discarding the principal's previous one.
    fn generate(&self, principal: &Principal) -> IssuedToken;

    /// Token to stamp after a successful authentication.
    fn issue(&self, principal: &Principal) -> IssuedToken;

    fn validate(&self, token: &str) -> GatewayResult<Principal>;

    /// Idempotent.
    fn invalidate(&self, principal_name: &str);

    /// Remove expired tokens; returns how many were removed.
    fn sweep_expired(&self) -> usize;

    /// URI of the token resource for `principal_name`.
    fn location_for(&self, principal_name: &str) -> String;
}

/// Issues opaque random tokens held in memory.
#[derive(Debug)]
pub struct RandomTokenManager {
    store: TokenStore,
    policy: ReissuePolicy,
    service_uri: String,
}

impl RandomTokenManager {
    pub fn new(ttl: Duration, policy: ReissuePolicy, service_uri: impl Into<String>) -> Self {
        Self {
            store: TokenStore::new(ttl),
            policy,
            service_uri: service_uri.into(),
        }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }
}

impl TokenManager for RandomTokenManager {
    fn name(&self) -> &str {
        "random"
    }

    fn generate(&self, principal: &Principal) -> IssuedToken {
        let token = self.store.generate(principal);
        tracing::info!(principal = %principal.name(), valid_until = %token.valid_until, "Token issued");
        metrics::record_token_event("issued");
        metrics::record_live_tokens(self.store.len());
        token
    }

    fn issue(&self, principal: &Principal) -> IssuedToken {
        let (token, kind) = self.store.issue(principal, self.policy);
        match kind {
            IssueKind::Generated => {
                tracing::info!(principal = %principal.name(), valid_until = %token.valid_until, "Token issued");
                metrics::record_token_event("issued");
                metrics::record_live_tokens(self.store.len());
            }
            IssueKind::Renewed => {
                tracing::debug!(principal = %principal.name(), valid_until = %token.valid_until, "Token renewed");
                metrics::record_token_event("renewed");
            }
            IssueKind::Reused => {}
        }
        token
    }

    fn validate(&self, token: &str) -> GatewayResult<Principal> {
        self.store.validate(token).ok_or_else(|| {
            metrics::record_token_event("rejected");
            GatewayError::Authentication("invalid or expired token".to_string())
        })
    }

    fn invalidate(&self, principal_name: &str) {
        if self.store.invalidate(principal_name) {
            tracing::info!(principal = %principal_name, "Token invalidated");
            metrics::record_token_event("invalidated");
            metrics::record_live_tokens(self.store.len());
        }
    }

    fn sweep_expired(&self) -> usize {
        let removed = self.store.sweep_expired();
        if removed > 0 {
            tracing::debug!(removed, "Expired tokens swept");
            metrics::record_token_events("expired", removed as u64);
        }
        metrics::record_live_tokens(self.store.len());
        removed
    }

    fn location_for(&self, principal_name: &str) -> String {
        format!("{}/{}", self.service_uri, urlencoding::encode(principal_name))
    }
}

/// Write the three token headers onto a response.
pub fn stamp_token_headers(
    headers: &mut HeaderMap,
    token: &IssuedToken,
    location: &str,
) -> GatewayResult<()> {
    let header = |value: &str| {
        HeaderValue::from_str(value)
            .map_err(|e| GatewayError::Internal(format!("invalid token header value: {}", e)))
    };

    headers.insert(AUTH_TOKEN_HEADER, header(&token.value)?);
    headers.insert(AUTH_TOKEN_VALID_HEADER, header(&token.valid_until.to_rfc3339())?);
    headers.insert(AUTH_TOKEN_LOCATION_HEADER, header(location)?);
    Ok(())
}

/// Remove the three token headers together.
pub fn strip_token_headers(headers: &mut HeaderMap) {
    headers.remove(AUTH_TOKEN_HEADER);
    headers.remove(AUTH_TOKEN_VALID_HEADER);
    headers.remove(AUTH_TOKEN_LOCATION_HEADER);
}
