//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (request ID, tracing)
//! - Bind server to listener and open the readiness gate
//! - Dispatch requests to the rule set
//! - Forward requests to upstream services, or tunnel WebSockets
//! - Serve unmatched paths from the static fallback, if configured

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, Uri, Version},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::admin::{self, AdminState};
use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::{outbound_path_and_query, strip_hop_by_hop};
use crate::http::websocket::{self, TunnelSettings};
use crate::lifecycle::Readiness;
use crate::observability::metrics;
use crate::routing::{RouteDecision, RouteRequest, RuleSet};

/// Pooled HTTP client used for every upstream.
pub type UpstreamClient = Client<HttpConnector, Body>;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub rules: Arc<RuleSet>,
    pub client: UpstreamClient,
    pub request_timeout: Duration,
    pub tunnel: TunnelSettings,
    pub static_root: Option<Arc<PathBuf>>,
}

/// HTTP server for the reverse proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    rules: Arc<RuleSet>,
    readiness: Readiness,
}

impl HttpServer {
    /// Compile the route table and build the router.
    pub fn new(config: ProxyConfig) -> Result<Self, ProxyError> {
        let rules = Arc::new(RuleSet::from_config(&config)?);

        let connect_timeout = Duration::from_secs(config.timeouts.connect_secs);
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let idle_ms = config.websocket.idle_timeout_ms;
        let state = AppState {
            rules: rules.clone(),
            client,
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
            tunnel: TunnelSettings {
                connect_timeout,
                idle_timeout: (idle_ms > 0).then(|| Duration::from_millis(idle_ms)),
            },
            static_root: config
                .fallback
                .static_root
                .as_ref()
                .map(|root| Arc::new(PathBuf::from(root))),
        };

        let router = Self::build_router(state);
        Ok(Self {
            router,
            config,
            rules,
            readiness: Readiness::new(),
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer()),
            )
    }

    /// Handle that opens once the listener is accepting.
    pub fn readiness(&self) -> Readiness {
        self.readiness.clone()
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, routes = self.rules.len(), "HTTP server starting");
        for rule in self.rules.rules() {
            tracing::info!(
                prefix = %rule.prefix(),
                target = %rule.target,
                websocket = rule.is_websocket,
                "Proxying"
            );
        }

        if self.config.admin.enabled {
            let admin_listener = TcpListener::bind(&self.config.admin.bind_address).await?;
            let admin_router = admin::setup_admin_router(AdminState::new(
                self.rules.clone(),
                self.readiness.clone(),
                &self.config.admin.api_key,
            ));
            let mut admin_shutdown = shutdown.resubscribe();
            tracing::info!(address = %self.config.admin.bind_address, "Admin API listening");
            tokio::spawn(async move {
                let result = axum::serve(admin_listener, admin_router)
                    .with_graceful_shutdown(async move {
                        let _ = admin_shutdown.recv().await;
                    })
                    .await;
                if let Err(e) = result {
                    tracing::error!(error = %e, "Admin API failed");
                }
            });
        }

        if self.readiness.mark_ready() {
            tracing::info!(address = %addr, "Proxy ready");
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Resolves the rule, then forwards, tunnels or falls back.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let request_id = request_id(request.headers()).to_string();
    let route_request = RouteRequest {
        path: &path,
        is_websocket_upgrade: websocket::is_upgrade_request(request.headers()),
    };

    let Some(decision) = state.rules.resolve(&route_request) else {
        let response = match &state.static_root {
            Some(root) => serve_static(root, request).await,
            None => {
                tracing::warn!(request_id = %request_id, path = %path, "No route matched");
                ProxyError::NoRoute(path.clone()).into_response()
            }
        };
        metrics::record_request(&method, response.status().as_u16(), "none", start_time);
        return response;
    };

    let upstream = decision.endpoint.to_string();
    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        outbound_path = %decision.outbound_path,
        upstream = %upstream,
        websocket = decision.forward_as_websocket,
        "Proxying request"
    );

    let result = if decision.forward_as_websocket {
        websocket::tunnel(&state, &decision, request).await
    } else {
        forward(&state, &decision, request).await
    };
    let response = result.unwrap_or_else(IntoResponse::into_response);

    metrics::record_request(&method, response.status().as_u16(), &upstream, start_time);
    response
}

/// Forward a plain HTTP request and stream the response back.
async fn forward(
    state: &AppState,
    decision: &RouteDecision<'_>,
    request: Request<Body>,
) -> Result<Response, ProxyError> {
    let (mut parts, body) = request.into_parts();
    let inbound_host = parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .or_else(|| parts.uri.authority().map(|a| a.to_string()));

    let authority = decision.endpoint.authority();
    let path_and_query = outbound_path_and_query(&decision.outbound_path, parts.uri.query());
    parts.uri = Uri::builder()
        .scheme("http")
        .authority(authority.as_str())
        .path_and_query(path_and_query.as_str())
        .build()?;
    parts.version = Version::HTTP_11;

    strip_hop_by_hop(&mut parts.headers);
    match (&inbound_host, decision.preserve_host_header) {
        (Some(host), true) => {
            parts.headers.insert(header::HOST, HeaderValue::from_str(host)?);
        }
        _ => {
            parts.headers.insert(header::HOST, HeaderValue::from_str(&authority)?);
        }
    }

    let upstream = decision.endpoint.http_origin();
    let call = state.client.request(Request::from_parts(parts, body));
    let response = match tokio::time::timeout(state.request_timeout, call).await {
        Ok(Ok(response)) => response,
        Ok(Err(source)) => return Err(ProxyError::Upstream { upstream, source }),
        Err(_) => return Err(ProxyError::UpstreamTimeout(upstream)),
    };

    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    if let Some(cookies) = decision.rewrite_response_cookies {
        cookies.rewrite_headers(&mut parts.headers, inbound_host.as_deref());
    }

    Ok(Response::from_parts(parts, Body::new(body)))
}

async fn serve_static(root: &Path, request: Request<Body>) -> Response {
    match ServeDir::new(root).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}
