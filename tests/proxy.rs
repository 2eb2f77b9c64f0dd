//! Forwarding, interceptors and header merging over real HTTP.

use axum::http::StatusCode;

mod common;

#[tokio::test]
async fn test_authenticated_request_is_forwarded() {
    let upstream = common::start_mock_upstream().await;
    let (gateway, shutdown) = common::start_gateway(common::gateway_config(upstream)).await;
    let client = common::client();

    let res = client
        .get(format!("http://{}/api/items?page=2", gateway))
        .basic_auth("alice", Some("wonderland"))
        .header("x-request-id", "req-42")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-upstream-path"], "/api/items?page=2");
    assert_eq!(res.headers()["x-seen-request-id"], "req-42");
    assert_eq!(res.headers()["x-request-id"], "req-42");
    assert!(res.headers().contains_key("auth-token"));
    assert_eq!(res.text().await.unwrap(), common::UPSTREAM_BODY);

    shutdown.trigger();
}

#[tokio::test]
async fn test_anonymous_request_never_reaches_upstream() {
    let upstream = common::start_mock_upstream().await;
    let (gateway, shutdown) = common::start_gateway(common::gateway_config(upstream)).await;

    let res = common::client()
        .get(format!("http://{}/api/items", gateway))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().get("x-upstream-path").is_none());

    shutdown.trigger();
}

#[tokio::test]
async fn test_interceptors_applied_in_order() {
    let upstream = common::start_mock_upstream().await;
    let mut config = common::gateway_config(upstream);
    config.interceptors = vec![
        common::plugin("strip", "remove-headers", r#"headers = ["server"]"#),
        common::plugin(
            "tag",
            "set-headers",
            r#"headers = { x-gateway = "security-gateway", auth-token = "forged" }"#,
        ),
    ];
    let (gateway, shutdown) = common::start_gateway(config).await;

    let res = common::client()
        .get(format!("http://{}/api", gateway))
        .basic_auth("alice", Some("wonderland"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get("server").is_none());
    assert_eq!(res.headers()["x-gateway"], "security-gateway");
    // Gateway-stamped headers take precedence over interceptor output.
    assert_ne!(res.headers()["auth-token"], "forged");

    shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    // Bind then drop to get a port with nothing listening.
    let dead = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let (gateway, shutdown) = common::start_gateway(common::gateway_config(dead)).await;

    let res = common::client()
        .get(format!("http://{}/api", gateway))
        .basic_auth("alice", Some("wonderland"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "BAD_GATEWAY");

    shutdown.trigger();
}

#[tokio::test]
async fn test_authentication_disabled_passes_through() {
    let upstream = common::start_mock_upstream().await;
    let mut config = common::gateway_config(upstream);
    config.security.authentication_enabled = false;
    let (gateway, shutdown) = common::start_gateway(config).await;

    let res = common::client()
        .get(format!("http://{}/public", gateway))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get("auth-token").is_none());

    shutdown.trigger();
}
