//! Pluggable authentication mechanisms.

use std::fmt;

use axum::http::HeaderMap;

use crate::pipeline::Exchange;
use crate::security::Principal;

/// Result of one mechanism looking at one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The request carries no credentials this mechanism understands.
    NotAttempted,
    Authenticated(Principal),
    /// Credentials were present but rejected.
    Failed(String),
}

/// A strategy for authenticating a request.
///
/// Mechanisms are shared across all requests and must not keep per-request
/// state.
pub trait AuthMechanism: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn authenticate(&self, exchange: &Exchange) -> AuthOutcome;

    /// Add challenge headers (e.g. `WWW-Authenticate`) to a 401 response.
    fn challenge(&self, _headers: &mut HeaderMap) {}
}
