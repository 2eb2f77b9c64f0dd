//! HTTP-facing token lifecycle API.
//!
//! | Method  | Path              | Auth           | Result                     |
//! |---------|-------------------|----------------|----------------------------|
//! | OPTIONS | `{base}/{user}`   | any            | 200 + CORS headers         |
//! | *       | `{base}/{user}`   | none           | 401                        |
//! | *       | `{base}/{user}`   | other user     | 403                        |
//! | GET     | `{base}/{user}`   | as `user`      | 200 + token JSON           |
//! | DELETE  | `{base}/{user}`   | as `user`      | 204, token headers removed |
//! | other   | `{base}/{user}`   | as `user`      | 405                        |
//!
//! Requests outside `{base}` pass through untouched.

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method, StatusCode};
use serde::Serialize;
use serde_json::json;

use crate::error::{GatewayError, GatewayResult};
use crate::pipeline::{Exchange, Outcome, PipelineHandler};
use crate::security::send_unauthorized;
use crate::tokens::{strip_token_headers, TokenManager, AUTH_TOKEN_HEADER, AUTH_TOKEN_VALID_HEADER};

const ALLOW_METHODS: &str = "GET, DELETE";
const ALLOW_HEADERS: &str = "Accept, Accept-Encoding, Authorization, Content-Length, \
     Content-Type, Host, Origin, X-Requested-With, User-Agent, No-Auth-Challenge";
const ALLOW: &str = "GET, DELETE, OPTIONS";

#[derive(Serialize)]
struct TokenBody {
    auth_token: String,
    auth_token_valid_until: String,
}

#[derive(Debug, Clone)]
pub struct TokenService {
    base_uri: String,
    manager: Arc<dyn TokenManager>,
}

impl TokenService {
    pub fn new(base_uri: impl Into<String>, manager: Arc<dyn TokenManager>) -> Self {
        Self {
            base_uri: base_uri.into(),
            manager,
        }
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// The part of `path` below the base URI, or `None` if the path is not ours.
    fn relative<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.base_uri.as_str())?;
        (rest.is_empty() || rest.starts_with('/')).then_some(rest)
    }

    /// Exact match against the literal or the escaped resource path.
    /// Any other encoding of the same name is treated as a different resource.
    fn owns(&self, path: &str, principal: &str) -> bool {
        let literal = format!("{}/{}", self.base_uri, principal);
        let escaped = format!("{}/{}", self.base_uri, urlencoding::encode(principal));
        path == literal || path == escaped
    }

    fn preflight(exchange: &mut Exchange) -> Outcome {
        let headers = exchange.response_headers_mut();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
        exchange.end(StatusCode::OK);
        Outcome::Terminated
    }

    fn reject(exchange: &mut Exchange, error: GatewayError) -> GatewayResult<Outcome> {
        tracing::debug!(path = %exchange.path(), error = %error, "Token request rejected");
        if let GatewayError::UnsupportedOperation(_) = error {
            exchange
                .response_headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static(ALLOW));
        }
        exchange.set_json(&json!({ "error": error.error_code() }))?;
        exchange.end(error.status_code());
        Ok(Outcome::Terminated)
    }

    fn current_token(exchange: &mut Exchange) -> GatewayResult<Outcome> {
        let (Some(token), Some(valid_until)) = (
            exchange.response_header(AUTH_TOKEN_HEADER),
            exchange.response_header(AUTH_TOKEN_VALID_HEADER),
        ) else {
            return Err(GatewayError::Internal(
                "authenticated exchange carries no token".to_string(),
            ));
        };

        let body = TokenBody {
            auth_token: token.to_string(),
            auth_token_valid_until: valid_until.to_string(),
        };
        exchange.set_json(&body)?;
        exchange.end(StatusCode::OK);
        Ok(Outcome::Terminated)
    }
}

impl PipelineHandler for TokenService {
    fn name(&self) -> &'static str {
        "token-service"
    }

    fn process(&self, exchange: &mut Exchange) -> GatewayResult<Outcome> {
        let Some(rest) = self.relative(exchange.path()) else {
            return Ok(Outcome::Continue);
        };

        if exchange.method() == Method::OPTIONS && rest.len() > 1 {
            return Ok(Self::preflight(exchange));
        }

        let Some(principal) = exchange.principal().cloned() else {
            return Ok(send_unauthorized(exchange));
        };

        if !self.owns(exchange.path(), principal.name()) {
            let error = GatewayError::Authorization(format!(
                "{} may not access {}",
                principal.name(),
                exchange.path()
            ));
            return Self::reject(exchange, error);
        }

        match exchange.method().clone() {
            Method::GET => Self::current_token(exchange),
            Method::DELETE => {
                self.manager.invalidate(principal.name());
                strip_token_headers(exchange.response_headers_mut());
                exchange.end(StatusCode::NO_CONTENT);
                Ok(Outcome::Terminated)
            }
            other => Self::reject(exchange, GatewayError::UnsupportedOperation(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipeline;
    use crate::security::{Principal, SecurityContext};
    use crate::tokens::{RandomTokenManager, ReissuePolicy, TokenIssuer, AUTH_TOKEN_LOCATION_HEADER};
    use axum::http::HeaderMap;
    use std::time::Duration;

    struct Fixture {
        manager: Arc<dyn TokenManager>,
        pipeline: Pipeline,
    }

    fn fixture() -> Fixture {
        let manager: Arc<dyn TokenManager> = Arc::new(RandomTokenManager::new(
            Duration::from_secs(60),
            ReissuePolicy::Preserve,
            "/tokens",
        ));
        let pipeline = Pipeline::builder()
            .stage(TokenIssuer::new(manager.clone()))
            .stage(TokenService::new("/tokens", manager.clone()))
            .build();
        Fixture { manager, pipeline }
    }

    fn exchange(method: Method, path: &str, user: Option<&str>) -> Exchange {
        let mut ctx = SecurityContext::new();
        if let Some(user) = user {
            ctx.set_authenticated(Principal::new(user), "test");
        }
        Exchange::new(method, path.parse().unwrap(), HeaderMap::new()).with_security_context(ctx)
    }

    fn run(f: &Fixture, method: Method, path: &str, user: Option<&str>) -> Exchange {
        let mut ex = exchange(method, path, user);
        f.pipeline.process(&mut ex).unwrap();
        ex
    }

    #[test]
    fn test_options_always_ok() {
        let f = fixture();
        for user in [None, Some("alice"), Some("bob")] {
            let ex = run(&f, Method::OPTIONS, "/tokens/alice", user);
            assert_eq!(ex.status(), StatusCode::OK);
            assert!(ex.is_complete());
            assert_eq!(ex.response_header(header::ACCESS_CONTROL_ALLOW_METHODS), Some(ALLOW_METHODS));
            assert!(ex
                .response_header(header::ACCESS_CONTROL_ALLOW_HEADERS)
                .unwrap()
                .contains("No-Auth-Challenge"));
        }
    }

    #[test]
    fn test_anonymous_gets_401() {
        let f = fixture();
        for method in [Method::GET, Method::DELETE, Method::PATCH] {
            let ex = run(&f, method, "/tokens/alice", None);
            assert_eq!(ex.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn test_other_principal_gets_403() {
        let f = fixture();
        let ex = run(&f, Method::GET, "/tokens/alice", Some("bob"));
        assert_eq!(ex.status(), StatusCode::FORBIDDEN);
        let ex = run(&f, Method::DELETE, "/tokens/alice", Some("bob"));
        assert_eq!(ex.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_get_own_token() {
        let f = fixture();
        let ex = run(&f, Method::GET, "/tokens/alice", Some("alice"));
        assert_eq!(ex.status(), StatusCode::OK);

        let body: serde_json::Value = serde_json::from_slice(ex.body()).unwrap();
        let token = body["auth_token"].as_str().unwrap();
        assert_eq!(Some(token), ex.response_header(AUTH_TOKEN_HEADER));
        assert_eq!(
            body["auth_token_valid_until"].as_str(),
            ex.response_header(AUTH_TOKEN_VALID_HEADER)
        );
        assert_eq!(f.manager.validate(token).unwrap().name(), "alice");
    }

    #[test]
    fn test_delete_invalidates_and_strips() {
        let f = fixture();
        let first = run(&f, Method::GET, "/tokens/alice", Some("alice"));
        let body: serde_json::Value = serde_json::from_slice(first.body()).unwrap();
        let old = body["auth_token"].as_str().unwrap().to_string();

        let ex = run(&f, Method::DELETE, "/tokens/alice", Some("alice"));
        assert_eq!(ex.status(), StatusCode::NO_CONTENT);
        assert!(ex.response_header(AUTH_TOKEN_HEADER).is_none());
        assert!(ex.response_header(AUTH_TOKEN_VALID_HEADER).is_none());
        assert!(ex.response_header(AUTH_TOKEN_LOCATION_HEADER).is_none());
        assert!(f.manager.validate(&old).is_err());
    }

    #[test]
    fn test_other_method_gets_405() {
        let f = fixture();
        let ex = run(&f, Method::PATCH, "/tokens/alice", Some("alice"));
        assert_eq!(ex.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(ex.response_header(header::ALLOW), Some(ALLOW));
    }

    #[test]
    fn test_alternate_encoding_rejected() {
        let f = fixture();
        let ex = run(&f, Method::GET, "/tokens/al%69ce", Some("alice"));
        assert_eq!(ex.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_escaped_name_accepted() {
        let f = fixture();
        let ex = run(&f, Method::GET, "/tokens/john%20doe", Some("john doe"));
        assert_eq!(ex.status(), StatusCode::OK);
    }

    #[test]
    fn test_unrelated_paths_pass_through() {
        let f = fixture();
        for path in ["/api/items", "/tokensmith/alice", "/"] {
            let ex = run(&f, Method::GET, path, Some("alice"));
            assert!(!ex.is_complete(), "{} should pass through", path);
        }
    }

    #[test]
    fn test_base_uri_without_user() {
        let f = fixture();
        let ex = run(&f, Method::GET, "/tokens", None);
        assert_eq!(ex.status(), StatusCode::UNAUTHORIZED);
        let ex = run(&f, Method::GET, "/tokens/", Some("alice"));
        assert_eq!(ex.status(), StatusCode::FORBIDDEN);
    }
}
