//! WebSocket proxy handling.
//!
//! # Responsibilities
//! - Detect WebSocket upgrade requests
//! - Complete upgrade handshake with client
//! - Establish WebSocket connection to backend
//! - Bidirectional frame forwarding
//!
//! # Data Flow
//! ```text
//! Client ←──── WebSocket frames ────→ Proxy ←──── WebSocket frames ────→ Backend
//! ```
//!
//! # Design Decisions
//! - The backend handshake completes before the client is upgraded, so a
//!   dead backend surfaces as 502 instead of an instantly closed socket
//! - Frame-level forwarding (no message buffering)
//! - Close frames propagated in both directions
//! - A tunnel with no traffic in either direction for the idle timeout is closed

use std::time::Duration;

use axum::{
    body::Body,
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        FromRequestParts,
    },
    http::{header, HeaderMap, HeaderValue, Request},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    tungstenite::{
        self, client::IntoClientRequest, protocol::frame::coding::CloseCode,
        protocol::CloseFrame as UpstreamCloseFrame, Message as UpstreamMessage,
    },
    MaybeTlsStream, WebSocketStream,
};

use crate::error::ProxyError;
use crate::http::response::outbound_path_and_query;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::routing::RouteDecision;

type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Headers copied from the client handshake onto the backend handshake.
const FORWARDED_HANDSHAKE_HEADERS: [header::HeaderName; 4] = [
    header::COOKIE,
    header::AUTHORIZATION,
    header::USER_AGENT,
    header::SEC_WEBSOCKET_PROTOCOL,
];

/// Tunnel timing.
#[derive(Debug, Clone, Copy)]
pub struct TunnelSettings {
    pub connect_timeout: Duration,
    /// `None` keeps idle tunnels open forever.
    pub idle_timeout: Option<Duration>,
}

/// True when the client asks to switch to the WebSocket protocol.
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').any(|p| p.trim().eq_ignore_ascii_case("websocket")))
        .unwrap_or(false)
}

/// Open a tunnel between the client and the decision's endpoint.
pub async fn tunnel(
    state: &AppState,
    decision: &RouteDecision<'_>,
    request: Request<Body>,
) -> Result<Response, ProxyError> {
    let (mut parts, _body) = request.into_parts();
    let upgrade = WebSocketUpgrade::from_request_parts(&mut parts, state)
        .await
        .map_err(|rejection| ProxyError::Upgrade(rejection.body_text()))?;

    let path_and_query = outbound_path_and_query(&decision.outbound_path, parts.uri.query());
    let upstream_url = decision.endpoint.url_for(&path_and_query);

    let mut upstream_request = upstream_url
        .as_str()
        .into_client_request()
        .map_err(|source| ProxyError::WebSocket {
            upstream: upstream_url.clone(),
            source: Box::new(source),
        })?;
    let headers = upstream_request.headers_mut();
    for name in FORWARDED_HANDSHAKE_HEADERS {
        for value in parts.headers.get_all(&name) {
            headers.append(name.clone(), value.clone());
        }
    }
    if decision.preserve_host_header {
        if let Some(host) = parts.headers.get(header::HOST) {
            headers.insert(header::HOST, host.clone());
        }
    }
    if decision.rewrite_ws_origin {
        headers.insert(
            header::ORIGIN,
            HeaderValue::from_str(&decision.endpoint.http_origin())?,
        );
    } else if let Some(origin) = parts.headers.get(header::ORIGIN) {
        headers.insert(header::ORIGIN, origin.clone());
    }

    let connect = tokio_tungstenite::connect_async(upstream_request);
    let (upstream, handshake) = match tokio::time::timeout(state.tunnel.connect_timeout, connect).await {
        Ok(Ok(pair)) => pair,
        Ok(Err(source)) => {
            return Err(ProxyError::WebSocket {
                upstream: upstream_url,
                source: Box::new(source),
            })
        }
        Err(_) => return Err(ProxyError::UpstreamTimeout(upstream_url)),
    };

    let mut upgrade = upgrade;
    if let Some(protocol) = handshake
        .headers()
        .get(header::SEC_WEBSOCKET_PROTOCOL)
        .and_then(|v| v.to_str().ok())
    {
        upgrade = upgrade.protocols([protocol.to_owned()]);
    }

    tracing::debug!(rule = %decision.rule.name, upstream = %upstream_url, "WebSocket backend connected");

    let settings = state.tunnel;
    let rule = decision.rule.name.clone();
    Ok(upgrade
        .on_failed_upgrade(|error| tracing::warn!(error = %error, "Client WebSocket upgrade failed"))
        .on_upgrade(move |client| relay(client, upstream, settings.idle_timeout, rule))
        .into_response())
}

enum Hop {
    FromClient(Option<Result<Message, axum::Error>>),
    FromUpstream(Option<Result<UpstreamMessage, tungstenite::Error>>),
}

async fn relay(client: WebSocket, upstream: UpstreamSocket, idle_timeout: Option<Duration>, rule: String) {
    let (mut client_tx, mut client_rx) = client.split();
    let (mut upstream_tx, mut upstream_rx) = upstream.split();
    metrics::tunnel_opened();
    tracing::debug!(rule = %rule, "WebSocket tunnel open");

    loop {
        let next = async {
            tokio::select! {
                message = client_rx.next() => Hop::FromClient(message),
                message = upstream_rx.next() => Hop::FromUpstream(message),
            }
        };
        let hop = match idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, next).await {
                Ok(hop) => hop,
                Err(_) => {
                    tracing::debug!(rule = %rule, idle = ?limit, "WebSocket tunnel idle, closing");
                    break;
                }
            },
            None => next.await,
        };

        match hop {
            Hop::FromClient(Some(Ok(message))) => {
                let closing = matches!(message, Message::Close(_));
                if upstream_tx.send(to_upstream(message)).await.is_err() || closing {
                    break;
                }
            }
            Hop::FromUpstream(Some(Ok(message))) => {
                let closing = matches!(message, UpstreamMessage::Close(_));
                if let Some(message) = to_client(message) {
                    if client_tx.send(message).await.is_err() {
                        break;
                    }
                }
                if closing {
                    break;
                }
            }
            Hop::FromClient(Some(Err(error))) => {
                tracing::debug!(rule = %rule, error = %error, "Client socket error");
                break;
            }
            Hop::FromUpstream(Some(Err(error))) => {
                tracing::debug!(rule = %rule, error = %error, "Backend socket error");
                break;
            }
            Hop::FromClient(None) | Hop::FromUpstream(None) => break,
        }
    }

    let _ = client_tx.close().await;
    let _ = upstream_tx.close().await;
    metrics::tunnel_closed();
    tracing::debug!(rule = %rule, "WebSocket tunnel closed");
}

fn to_upstream(message: Message) -> UpstreamMessage {
    match message {
        Message::Text(text) => UpstreamMessage::Text(text.as_str().to_owned().into()),
        Message::Binary(data) => UpstreamMessage::Binary(data),
        Message::Ping(data) => UpstreamMessage::Ping(data),
        Message::Pong(data) => UpstreamMessage::Pong(data),
        Message::Close(frame) => UpstreamMessage::Close(frame.map(|frame| UpstreamCloseFrame {
            code: CloseCode::from(frame.code),
            reason: frame.reason.as_str().to_owned().into(),
        })),
    }
}

fn to_client(message: UpstreamMessage) -> Option<Message> {
    let message = match message {
        UpstreamMessage::Text(text) => Message::Text(text.as_str().to_owned().into()),
        UpstreamMessage::Binary(data) => Message::Binary(data),
        UpstreamMessage::Ping(data) => Message::Ping(data),
        UpstreamMessage::Pong(data) => Message::Pong(data),
        UpstreamMessage::Close(frame) => Message::Close(frame.map(|frame| CloseFrame {
            code: u16::from(frame.code),
            reason: frame.reason.as_str().to_owned().into(),
        })),
        UpstreamMessage::Frame(_) => return None,
    };
    Some(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_upgrade_header() {
        let mut headers = HeaderMap::new();
        assert!(!is_upgrade_request(&headers));

        headers.insert(header::UPGRADE, HeaderValue::from_static("WebSocket"));
        assert!(is_upgrade_request(&headers));

        headers.insert(header::UPGRADE, HeaderValue::from_static("h2c"));
        assert!(!is_upgrade_request(&headers));
    }

    #[test]
    fn close_codes_survive_both_directions() {
        let client_close = Message::Close(Some(CloseFrame {
            code: 1001,
            reason: "going away".into(),
        }));
        let upstream = to_upstream(client_close);
        match &upstream {
            UpstreamMessage::Close(Some(frame)) => {
                assert_eq!(frame.code, CloseCode::Away);
                assert_eq!(frame.reason.as_str(), "going away");
            }
            other => panic!("unexpected message: {other:?}"),
        }

        match to_client(upstream) {
            Some(Message::Close(Some(frame))) => assert_eq!(frame.code, 1001),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn text_frames_keep_payload() {
        match to_client(UpstreamMessage::Text("hello".into())) {
            Some(Message::Text(text)) => assert_eq!(text.as_str(), "hello"),
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
