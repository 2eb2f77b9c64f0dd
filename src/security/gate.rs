//! Last pre-proxy check: anonymous requests do not reach the upstream.

use crate::error::GatewayResult;
use crate::pipeline::{Exchange, Outcome, PipelineHandler};
use crate::security::authenticator::send_unauthorized;

#[derive(Debug, Clone, Copy)]
pub struct AccessGate {
    require_authentication: bool,
}

impl AccessGate {
    pub fn new(require_authentication: bool) -> Self {
        Self {
            require_authentication,
        }
    }
}

impl PipelineHandler for AccessGate {
    fn name(&self) -> &'static str {
        "access-gate"
    }

    fn process(&self, exchange: &mut Exchange) -> GatewayResult<Outcome> {
        if !self.require_authentication {
            return Ok(Outcome::Continue);
        }

        // Without a security context authentication is switched off entirely.
        match exchange.security_context() {
            None => Ok(Outcome::Continue),
            Some(ctx) if ctx.is_authenticated() => Ok(Outcome::Continue),
            Some(ctx) => {
                tracing::debug!(
                    path = %exchange.path(),
                    failed = ?ctx.failed_attempts(),
                    "Rejecting anonymous request"
                );
                Ok(send_unauthorized(exchange))
            }
        }
    }
}
