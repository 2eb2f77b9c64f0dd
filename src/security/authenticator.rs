//! Authentication resolution over the attached mechanisms.
//!
//! # Responsibilities
//! - Try the mechanisms attached to the security context, in order
//! - Accept the first success; remember which mechanisms rejected credentials
//! - Build 401 challenges on behalf of the attached mechanisms
//!
//! Resolution never terminates the exchange by itself: later stages decide
//! whether an anonymous request is acceptable (the token service answers
//! `OPTIONS` for anyone, the access gate guards proxied paths).

use axum::http::StatusCode;

use crate::error::GatewayResult;
use crate::observability::metrics;
use crate::pipeline::{Exchange, Outcome, PipelineHandler};
use crate::security::AuthOutcome;

/// Request header that suppresses `WWW-Authenticate` challenges on a 401.
pub const NO_AUTH_CHALLENGE: &str = "no-auth-challenge";

#[derive(Debug, Clone, Copy, Default)]
pub struct AuthenticationStage;

impl AuthenticationStage {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineHandler for AuthenticationStage {
    fn name(&self) -> &'static str {
        "authentication"
    }

    fn process(&self, exchange: &mut Exchange) -> GatewayResult<Outcome> {
        let mechanisms = match exchange.security_context() {
            Some(ctx) if !ctx.is_authenticated() => ctx.mechanisms().to_vec(),
            _ => return Ok(Outcome::Continue),
        };

        let mut failures = Vec::new();
        let mut resolved = None;

        for mechanism in &mechanisms {
            match mechanism.authenticate(exchange) {
                AuthOutcome::NotAttempted => continue,
                AuthOutcome::Authenticated(principal) => {
                    metrics::record_auth_attempt(mechanism.name(), "authenticated");
                    resolved = Some((principal, mechanism.name().to_string()));
                    break;
                }
                AuthOutcome::Failed(reason) => {
                    metrics::record_auth_attempt(mechanism.name(), "failed");
                    tracing::debug!(
                        mechanism = mechanism.name(),
                        reason = %reason,
                        "Authentication attempt failed"
                    );
                    failures.push(mechanism.name().to_string());
                }
            }
        }

        if let Some(ctx) = exchange.security_context_mut() {
            for failure in failures {
                ctx.record_failure(failure);
            }
            if let Some((principal, mechanism)) = resolved {
                tracing::debug!(
                    principal = %principal.name(),
                    roles = ?principal.roles(),
                    mechanism = %mechanism,
                    "Request authenticated"
                );
                ctx.set_authenticated(principal, mechanism);
            }
        }

        Ok(Outcome::Continue)
    }
}

/// Terminate the exchange with 401, adding each attached mechanism's
/// challenge unless the client asked for none.
pub fn send_unauthorized(exchange: &mut Exchange) -> Outcome {
    let suppress = exchange.request_headers().contains_key(NO_AUTH_CHALLENGE);
    let mechanisms = exchange
        .security_context()
        .map(|ctx| ctx.mechanisms().to_vec())
        .unwrap_or_default();

    if !suppress {
        for mechanism in &mechanisms {
            mechanism.challenge(exchange.response_headers_mut());
        }
    }

    exchange.end(StatusCode::UNAUTHORIZED);
    Outcome::Terminated
}
