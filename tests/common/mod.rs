//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use security_gateway::config::{GatewayConfig, PluginSpec};
use security_gateway::lifecycle::startup;
use security_gateway::{PluginRegistry, Shutdown};

pub const UPSTREAM_BODY: &str = "hello from upstream";

/// Start a mock upstream on a free port.
///
/// Every response is `200 OK` with a `Server` header, an `X-Upstream-Path`
/// header echoing the request target and an `X-Seen-Request-Id` header
/// echoing the forwarded request ID.
pub async fn start_mock_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = vec![0u8; 8192];
                        let n = socket.read(&mut buf).await.unwrap_or(0);
                        let head = String::from_utf8_lossy(&buf[..n]).to_string();
                        let target = head
                            .lines()
                            .next()
                            .and_then(|line| line.split_whitespace().nth(1))
                            .unwrap_or("/")
                            .to_string();
                        let request_id = head
                            .lines()
                            .find_map(|line| {
                                let (name, value) = line.split_once(':')?;
                                name.eq_ignore_ascii_case("x-request-id")
                                    .then(|| value.trim().to_string())
                            })
                            .unwrap_or_default();

                        let response = format!(
                            "HTTP/1.1 200 OK\r\nServer: mock-upstream\r\nX-Upstream-Path: {}\r\nX-Seen-Request-Id: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            target,
                            request_id,
                            UPSTREAM_BODY.len(),
                            UPSTREAM_BODY
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

pub fn plugin(name: &str, kind: &str, args: &str) -> PluginSpec {
    PluginSpec {
        name: name.to_string(),
        kind: kind.to_string(),
        args: toml::from_str(args).unwrap(),
    }
}

/// Gateway config with users alice and bob and a bearer mechanism,
/// pointing at `upstream`.
pub fn gateway_config(upstream: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.upstream.address = upstream.to_string();
    config.observability.metrics_enabled = false;
    config.authentication.mechanisms = vec![
        plugin(
            "users",
            "basic",
            r#"users = [{ name = "alice", password = "wonderland" }, { name = "bob", password = "builder" }]"#,
        ),
        plugin("bearer", "token", ""),
    ];
    config
}

/// Boot the gateway on a free loopback port.
pub async fn start_gateway(mut config: GatewayConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    config.listener.bind_address = addr.to_string();

    let server = startup::bootstrap(config, &PluginRegistry::with_builtins()).unwrap();
    let shutdown = Shutdown::new();
    tokio::spawn(server.run(listener, shutdown.clone()));

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}
