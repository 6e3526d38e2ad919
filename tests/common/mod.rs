//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use dashboard_proxy::config::schema::{
    ServiceConfig, BILLING_SERVICE, PRIMARY_SERVICE, XAMOPS_SERVICE,
};
use dashboard_proxy::config::ProxyConfig;
use dashboard_proxy::{HttpServer, Shutdown};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::{
    handshake::server::{ErrorResponse, Request, Response},
    Message,
};

/// Start a mock HTTP backend on an ephemeral port.
///
/// Every response body is `"<name> <path-and-query> host=<host>"`. Responses
/// to `/login` also carry two `Set-Cookie` headers scoped to the backend.
pub async fn start_echo_backend(name: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(answer(socket, name));
        }
    });

    addr
}

async fn answer(mut socket: TcpStream, name: &'static str) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let head = String::from_utf8_lossy(&buf).to_string();
    let mut lines = head.split("\r\n");
    let target = lines
        .next()
        .and_then(|line| line.split(' ').nth(1))
        .unwrap_or("")
        .to_string();
    let host = lines
        .find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.eq_ignore_ascii_case("host").then(|| value.trim().to_string())
        })
        .unwrap_or_default();

    let body = format!("{} {} host={}", name, target, host);
    let cookies = if target.starts_with("/login") {
        "Set-Cookie: session=abc; Path=/auth; Domain=backend.internal; HttpOnly\r\n\
         Set-Cookie: theme=dark; path=/; domain=backend.internal\r\n"
    } else {
        ""
    };
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n{}",
        body.len(),
        cookies,
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Start a backend that accepts connections but never answers.
pub async fn start_silent_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Start a WebSocket echo backend.
///
/// The first message on each connection reports what the handshake looked
/// like: `"path=<path> origin=<origin>"`. Every later message is echoed.
pub async fn start_ws_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut seen = String::new();
                let callback = |request: &Request, response: Response| {
                    let origin = request
                        .headers()
                        .get("origin")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    seen = format!("path={} origin={}", request.uri(), origin);
                    Ok::<_, ErrorResponse>(response)
                };
                let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(socket, callback).await else {
                    return;
                };
                if ws.send(Message::Text(seen.into())).await.is_err() {
                    return;
                }
                while let Some(Ok(message)) = ws.next().await {
                    match message {
                        Message::Text(_) | Message::Binary(_) => {
                            if ws.send(message).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
            });
        }
    });

    addr
}

/// Stock config with every service pointed at local test backends.
pub fn config_for(primary: SocketAddr, billing: SocketAddr, xamops: SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    for (name, addr) in [
        (PRIMARY_SERVICE, primary),
        (BILLING_SERVICE, billing),
        (XAMOPS_SERVICE, xamops),
    ] {
        config
            .services
            .insert(name.to_string(), ServiceConfig::new("127.0.0.1", addr.port()));
    }
    config.timeouts.connect_secs = 1;
    config.timeouts.request_secs = 1;
    config
}

/// Run a proxy for `config` and wait until it accepts connections.
pub async fn spawn_proxy(config: ProxyConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config).unwrap();
    let readiness = server.readiness();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::timeout(Duration::from_secs(5), readiness.wait())
        .await
        .expect("proxy never became ready");

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
