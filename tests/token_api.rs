//! Token lifecycle over real HTTP.

use axum::http::StatusCode;
use serde_json::Value;

mod common;

#[tokio::test]
async fn test_login_returns_token_json_and_headers() {
    let upstream = common::start_mock_upstream().await;
    let (gateway, shutdown) = common::start_gateway(common::gateway_config(upstream)).await;
    let client = common::client();

    let res = client
        .get(format!("http://{}/tokens/alice", gateway))
        .basic_auth("alice", Some("wonderland"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let header_token = res.headers()["auth-token"].to_str().unwrap().to_string();
    let header_valid = res.headers()["auth-token-valid-until"].to_str().unwrap().to_string();
    assert_eq!(res.headers()["auth-token-location"], "/tokens/alice");
    assert!(res.headers().contains_key("x-request-id"));

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["auth_token"], header_token.as_str());
    assert_eq!(body["auth_token_valid_until"], header_valid.as_str());
    assert_eq!(header_token.len(), 43);

    shutdown.trigger();
}

#[tokio::test]
async fn test_bearer_token_reused_until_logout() {
    let upstream = common::start_mock_upstream().await;
    let (gateway, shutdown) = common::start_gateway(common::gateway_config(upstream)).await;
    let client = common::client();
    let url = format!("http://{}/tokens/alice", gateway);

    let login: Value = client
        .get(&url)
        .basic_auth("alice", Some("wonderland"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let token = login["auth_token"].as_str().unwrap().to_string();

    let res = client.get(&url).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["auth-token"], token.as_str());

    let res = client.delete(&url).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(res.headers().get("auth-token").is_none());
    assert!(res.headers().get("auth-token-valid-until").is_none());
    assert!(res.headers().get("auth-token-location").is_none());

    let res = client.get(&url).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    shutdown.trigger();
}

#[tokio::test]
async fn test_anonymous_and_foreign_access() {
    let upstream = common::start_mock_upstream().await;
    let (gateway, shutdown) = common::start_gateway(common::gateway_config(upstream)).await;
    let client = common::client();
    let url = format!("http://{}/tokens/alice", gateway);

    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let challenges: Vec<_> = res
        .headers()
        .get_all("www-authenticate")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(challenges.iter().any(|c| c.starts_with("Basic")));
    assert!(challenges.iter().any(|c| c == "Bearer"));

    let res = client
        .get(&url)
        .header("No-Auth-Challenge", "true")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().get("www-authenticate").is_none());

    let res = client
        .delete(&url)
        .basic_auth("bob", Some("builder"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    shutdown.trigger();
}

#[tokio::test]
async fn test_preflight_and_unsupported_method() {
    let upstream = common::start_mock_upstream().await;
    let (gateway, shutdown) = common::start_gateway(common::gateway_config(upstream)).await;
    let client = common::client();
    let url = format!("http://{}/tokens/alice", gateway);

    let res = client
        .request(reqwest::Method::OPTIONS, &url)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["access-control-allow-methods"], "GET, DELETE");

    let res = client
        .put(&url)
        .basic_auth("alice", Some("wonderland"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers()["allow"], "GET, DELETE, OPTIONS");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "METHOD_NOT_ALLOWED");

    shutdown.trigger();
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let upstream = common::start_mock_upstream().await;
    let mut config = common::gateway_config(upstream);
    config.tokens.ttl_secs = 1;
    let (gateway, shutdown) = common::start_gateway(config).await;
    let client = common::client();
    let url = format!("http://{}/tokens/alice", gateway);

    let login: Value = client
        .get(&url)
        .basic_auth("alice", Some("wonderland"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let token = login["auth_token"].as_str().unwrap().to_string();

    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;

    let res = client.get(&url).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    shutdown.trigger();
}
