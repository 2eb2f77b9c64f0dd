//! HTTP Basic credentials checked against a static user table.

use std::collections::HashMap;

use axum::http::{header, HeaderMap, HeaderValue};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use subtle::ConstantTimeEq;

use crate::pipeline::Exchange;
use crate::security::{AuthMechanism, AuthOutcome, Principal};

/// Plugin arguments for the `basic` mechanism.
#[derive(Debug, Clone, Deserialize)]
pub struct BasicArgs {
    #[serde(default = "default_realm")]
    pub realm: String,
    #[serde(default)]
    pub users: Vec<BasicUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BasicUser {
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

fn default_realm() -> String {
    "security-gateway".to_string()
}

#[derive(Debug)]
struct Entry {
    password: String,
    roles: Vec<String>,
}

pub struct BasicAuthMechanism {
    name: String,
    realm: String,
    users: HashMap<String, Entry>,
}

impl std::fmt::Debug for BasicAuthMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuthMechanism")
            .field("name", &self.name)
            .field("realm", &self.realm)
            .field("users", &self.users.len())
            .finish()
    }
}

impl BasicAuthMechanism {
    pub fn new(name: impl Into<String>, args: BasicArgs) -> Self {
        let users = args
            .users
            .into_iter()
            .map(|u| {
                (
                    u.name,
                    Entry {
                        password: u.password,
                        roles: u.roles,
                    },
                )
            })
            .collect();

        Self {
            name: name.into(),
            realm: args.realm,
            users,
        }
    }

    fn credentials(exchange: &Exchange) -> Option<(String, String)> {
        let value = exchange.request_header(header::AUTHORIZATION)?;
        let (scheme, encoded) = value.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (user, password) = decoded.split_once(':')?;
        Some((user.to_string(), password.to_string()))
    }
}

impl AuthMechanism for BasicAuthMechanism {
    fn name(&self) -> &str {
        &self.name
    }

    fn authenticate(&self, exchange: &Exchange) -> AuthOutcome {
        let is_basic = exchange
            .request_header(header::AUTHORIZATION)
            .and_then(|v| v.get(..6))
            .map(|scheme| scheme.eq_ignore_ascii_case("basic "))
            .unwrap_or(false);
        if !is_basic {
            return AuthOutcome::NotAttempted;
        }

        let Some((user, password)) = Self::credentials(exchange) else {
            return AuthOutcome::Failed("malformed basic credentials".to_string());
        };

        match self.users.get(&user) {
            Some(entry) if bool::from(entry.password.as_bytes().ct_eq(password.as_bytes())) => {
                AuthOutcome::Authenticated(Principal::new(user).with_roles(entry.roles.clone()))
            }
            Some(_) => AuthOutcome::Failed(format!("wrong password for {}", user)),
            None => AuthOutcome::Failed(format!("unknown user {}", user)),
        }
    }

    fn challenge(&self, headers: &mut HeaderMap) {
        let value = format!("Basic realm=\"{}\"", self.realm);
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.append(header::WWW_AUTHENTICATE, value);
        }
    }
}
