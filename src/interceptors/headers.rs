//! Built-in header interceptors.

use std::collections::BTreeMap;

use axum::http::{HeaderName, HeaderValue};
use serde::Deserialize;

use crate::error::{GatewayError, GatewayResult, InterceptorError};
use crate::interceptors::{ProxiedResponse, ResponseInterceptor};
use crate::pipeline::Exchange;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetHeadersArgs {
    pub headers: BTreeMap<String, String>,
    /// Path prefixes this interceptor applies to. Empty means every path.
    #[serde(default)]
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoveHeadersArgs {
    pub headers: Vec<String>,
    #[serde(default)]
    pub paths: Vec<String>,
}

fn header_name(interceptor: &str, raw: &str) -> GatewayResult<HeaderName> {
    HeaderName::try_from(raw).map_err(|e| {
        GatewayError::Configuration(format!(
            "interceptor '{}': invalid header name '{}': {}",
            interceptor, raw, e
        ))
    })
}

fn matches_path(paths: &[String], exchange: &Exchange) -> bool {
    paths.is_empty() || paths.iter().any(|p| exchange.path().starts_with(p.as_str()))
}

/// Inserts fixed headers into the upstream response, replacing existing values.
#[derive(Debug)]
pub struct SetHeadersInterceptor {
    name: String,
    headers: Vec<(HeaderName, HeaderValue)>,
    paths: Vec<String>,
}

impl SetHeadersInterceptor {
    pub fn new(name: impl Into<String>, args: SetHeadersArgs) -> GatewayResult<Self> {
        let name = name.into();
        let mut headers = Vec::with_capacity(args.headers.len());
        for (raw_name, raw_value) in &args.headers {
            let header = header_name(&name, raw_name)?;
            let value = HeaderValue::from_str(raw_value).map_err(|e| {
                GatewayError::Configuration(format!(
                    "interceptor '{}': invalid value for header '{}': {}",
                    name, raw_name, e
                ))
            })?;
            headers.push((header, value));
        }

        Ok(Self {
            name,
            headers,
            paths: args.paths,
        })
    }
}

impl ResponseInterceptor for SetHeadersInterceptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve(&self, exchange: &Exchange) -> bool {
        matches_path(&self.paths, exchange)
    }

    fn handle(&self, response: &mut ProxiedResponse, _: &Exchange) -> Result<(), InterceptorError> {
        for (name, value) in &self.headers {
            response.headers.insert(name.clone(), value.clone());
        }
        Ok(())
    }
}

/// Strips headers from the upstream response, e.g. `Server` or `X-Powered-By`.
#[derive(Debug)]
pub struct RemoveHeadersInterceptor {
    name: String,
    headers: Vec<HeaderName>,
    paths: Vec<String>,
}

impl RemoveHeadersInterceptor {
    pub fn new(name: impl Into<String>, args: RemoveHeadersArgs) -> GatewayResult<Self> {
        let name = name.into();
        let headers = args
            .headers
            .iter()
            .map(|raw| header_name(&name, raw))
            .collect::<GatewayResult<Vec<_>>>()?;

        Ok(Self {
            name,
            headers,
            paths: args.paths,
        })
    }
}

impl ResponseInterceptor for RemoveHeadersInterceptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve(&self, exchange: &Exchange) -> bool {
        matches_path(&self.paths, exchange)
    }

    fn handle(&self, response: &mut ProxiedResponse, _: &Exchange) -> Result<(), InterceptorError> {
        for name in &self.headers {
            response.headers.remove(name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::{HeaderMap, Method, StatusCode};

    fn exchange(path: &str) -> Exchange {
        Exchange::new(Method::GET, path.parse().unwrap(), HeaderMap::new())
    }

    #[test]
    fn test_set_headers() {
        let args = SetHeadersArgs {
            headers: BTreeMap::from([
                ("x-frame-options".to_string(), "DENY".to_string()),
                ("cache-control".to_string(), "no-store".to_string()),
            ]),
            paths: vec![],
        };
        let interceptor = SetHeadersInterceptor::new("hardening", args).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("cache-control", HeaderValue::from_static("max-age=60"));
        let mut resp = ProxiedResponse::new(StatusCode::OK, headers, Bytes::new());

        interceptor.handle(&mut resp, &exchange("/")).unwrap();
        assert_eq!(resp.headers["x-frame-options"], "DENY");
        assert_eq!(resp.headers["cache-control"], "no-store");
    }

    #[test]
    fn test_remove_headers() {
        let args = RemoveHeadersArgs {
            headers: vec!["server".to_string(), "X-Powered-By".to_string()],
            paths: vec![],
        };
        let interceptor = RemoveHeadersInterceptor::new("strip", args).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("server", HeaderValue::from_static("nginx"));
        headers.insert("x-powered-by", HeaderValue::from_static("php"));
        headers.insert("content-type", HeaderValue::from_static("text/plain"));
        let mut resp = ProxiedResponse::new(StatusCode::OK, headers, Bytes::new());

        interceptor.handle(&mut resp, &exchange("/")).unwrap();
        assert!(resp.headers.get("server").is_none());
        assert!(resp.headers.get("x-powered-by").is_none());
        assert_eq!(resp.headers["content-type"], "text/plain");
    }

    #[test]
    fn test_path_scoping() {
        let args = RemoveHeadersArgs {
            headers: vec!["server".to_string()],
            paths: vec!["/api".to_string()],
        };
        let interceptor = RemoveHeadersInterceptor::new("strip", args).unwrap();
        assert!(interceptor.resolve(&exchange("/api/items")));
        assert!(!interceptor.resolve(&exchange("/static")));
    }

    #[test]
    fn test_invalid_header_is_configuration_error() {
        let args = SetHeadersArgs {
            headers: BTreeMap::from([("bad header".to_string(), "x".to_string())]),
            paths: vec![],
        };
        let err = SetHeadersInterceptor::new("bad", args).unwrap_err();
        assert!(matches!(err, GatewayError::Configuration(_)));

        let args = SetHeadersArgs {
            headers: BTreeMap::from([("x-ok".to_string(), "line\nbreak".to_string())]),
            paths: vec![],
        };
        assert!(SetHeadersInterceptor::new("bad", args).is_err());
    }
}
