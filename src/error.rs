//! Errors surfaced at the HTTP boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::routing::RoutingError;

/// Errors raised while proxying a request.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Route table failed to compile.
    #[error("routing setup failed: {0}")]
    Routing(#[from] RoutingError),

    /// No rule claims the path and there is no static fallback.
    #[error("no route for {0}")]
    NoRoute(String),

    /// Outbound request could not be built.
    #[error("invalid outbound request: {0}")]
    InvalidRequest(#[from] axum::http::Error),

    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] axum::http::header::InvalidHeaderValue),

    /// Upstream refused or dropped the connection.
    #[error("upstream {upstream} failed: {source}")]
    Upstream {
        upstream: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    /// Upstream did not answer in time.
    #[error("upstream {0} timed out")]
    UpstreamTimeout(String),

    /// Client sent an upgrade request axum could not accept.
    #[error("websocket upgrade rejected: {0}")]
    Upgrade(String),

    /// Upstream WebSocket handshake failed.
    #[error("websocket upstream {upstream} failed: {source}")]
    WebSocket {
        upstream: String,
        #[source]
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::NoRoute(_) => StatusCode::NOT_FOUND,
            ProxyError::Upgrade(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream { .. } | ProxyError::WebSocket { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Routing(_)
            | ProxyError::InvalidRequest(_)
            | ProxyError::InvalidHeader(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            ProxyError::NoRoute(_) => "No matching route found",
            ProxyError::Upgrade(_) => "Invalid WebSocket upgrade",
            ProxyError::Upstream { .. } | ProxyError::WebSocket { .. } => "Upstream request failed",
            ProxyError::UpstreamTimeout(_) => "Upstream timed out",
            _ => "Internal proxy error",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Proxy error");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }
        (status, self.public_message()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ProxyError::NoRoute("/x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ProxyError::UpstreamTimeout("http://localhost:8080".into()).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(ProxyError::Upgrade("missing key".into()).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn into_response_uses_status() {
        let response = ProxyError::NoRoute("/favicon.ico".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
