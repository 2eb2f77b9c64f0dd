//! Stamps a token onto every authenticated exchange.

use std::sync::Arc;

use crate::error::GatewayResult;
use crate::pipeline::{Exchange, Outcome, PipelineHandler};
use crate::tokens::{stamp_token_headers, TokenManager};

#[derive(Debug, Clone)]
pub struct TokenIssuer {
    manager: Arc<dyn TokenManager>,
}

impl TokenIssuer {
    pub fn new(manager: Arc<dyn TokenManager>) -> Self {
        Self { manager }
    }
}

impl PipelineHandler for TokenIssuer {
    fn name(&self) -> &'static str {
        "token-issuer"
    }

    fn process(&self, exchange: &mut Exchange) -> GatewayResult<Outcome> {
        let Some(principal) = exchange.principal().cloned() else {
            return Ok(Outcome::Continue);
        };

        let token = self.manager.issue(&principal);
        let location = self.manager.location_for(principal.name());
        stamp_token_headers(exchange.response_headers_mut(), &token, &location)?;
        Ok(Outcome::Continue)
    }
}
