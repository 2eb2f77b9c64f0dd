//! Bearer-token authentication backed by the token manager.

use std::sync::Arc;

use axum::http::{header, HeaderMap, HeaderValue};

use crate::pipeline::Exchange;
use crate::security::{AuthMechanism, AuthOutcome};
use crate::tokens::TokenManager;

#[derive(Debug)]
pub struct TokenAuthMechanism {
    name: String,
    manager: Arc<dyn TokenManager>,
}

impl TokenAuthMechanism {
    pub fn new(name: impl Into<String>, manager: Arc<dyn TokenManager>) -> Self {
        Self {
            name: name.into(),
            manager,
        }
    }
}

fn bearer(exchange: &Exchange) -> Option<&str> {
    let value = exchange.request_header(header::AUTHORIZATION)?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
}

impl AuthMechanism for TokenAuthMechanism {
    fn name(&self) -> &str {
        &self.name
    }

    fn authenticate(&self, exchange: &Exchange) -> AuthOutcome {
        match bearer(exchange) {
            None => AuthOutcome::NotAttempted,
            Some(token) => match self.manager.validate(token) {
                Ok(principal) => AuthOutcome::Authenticated(principal),
                Err(e) => AuthOutcome::Failed(e.to_string()),
            },
        }
    }

    fn challenge(&self, headers: &mut HeaderMap) {
        headers.append(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    }
}
