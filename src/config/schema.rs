//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files, and
//! every section has defaults so an empty file reproduces the stock
//! dashboard dev-server table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Name of the service whose port can be moved at startup.
pub const PRIMARY_SERVICE: &str = "primary";

/// Name of the billing/admin service.
pub const BILLING_SERVICE: &str = "billing";

/// Name of the general xamops service, pinned to its own port.
pub const XAMOPS_SERVICE: &str = "xamops";

/// Root configuration for the dev-server proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream services by name.
    pub services: BTreeMap<String, ServiceConfig>,

    /// Route definitions mapping path prefixes to services.
    pub routes: Vec<RouteConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// WebSocket tunnel settings.
    pub websocket: WebSocketConfig,

    /// What to do with requests no route claims.
    pub fallback: FallbackConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            services: default_services(),
            routes: default_routes(),
            timeouts: TimeoutConfig::default(),
            websocket: WebSocketConfig::default(),
            fallback: FallbackConfig::default(),
            observability: ObservabilityConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// Look up a service by name.
    pub fn service(&self, name: &str) -> Option<&ServiceConfig> {
        self.services.get(name)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:5173").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5173".to_string(),
        }
    }
}

/// An upstream service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
}

impl ServiceConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

fn default_services() -> BTreeMap<String, ServiceConfig> {
    BTreeMap::from([
        (PRIMARY_SERVICE.to_string(), ServiceConfig::new("localhost", 8080)),
        (BILLING_SERVICE.to_string(), ServiceConfig::new("localhost", 8082)),
        (XAMOPS_SERVICE.to_string(), ServiceConfig::new("localhost", 8080)),
    ])
}

/// Route configuration mapping a path prefix to a service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics. Defaults to the prefix.
    #[serde(default)]
    pub name: Option<String>,

    /// Path prefix to match (literal, case-sensitive).
    pub path_prefix: String,

    /// Service name to forward to.
    pub service: String,

    /// Tunnel WebSocket upgrades on this prefix.
    #[serde(default)]
    pub websocket: bool,

    /// Rewrite `Set-Cookie` Path/Domain on responses.
    #[serde(default)]
    pub rewrite_cookies: bool,

    /// Keep the client's Host header instead of the upstream authority.
    #[serde(default)]
    pub preserve_host: bool,

    /// Replace the Origin header of WebSocket upgrades with the upstream origin.
    #[serde(default)]
    pub rewrite_ws_origin: bool,

    /// Optional outbound path rewrite.
    #[serde(default)]
    pub rewrite: Option<PathRewriteConfig>,
}

impl RouteConfig {
    /// A plain HTTP route with no rewriting.
    pub fn new(path_prefix: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            name: None,
            path_prefix: path_prefix.into(),
            service: service.into(),
            websocket: false,
            rewrite_cookies: false,
            preserve_host: false,
            rewrite_ws_origin: false,
            rewrite: None,
        }
    }

    pub fn websocket(mut self) -> Self {
        self.websocket = true;
        self
    }

    pub fn with_cookie_rewrite(mut self) -> Self {
        self.rewrite_cookies = true;
        self
    }

    pub fn with_ws_origin_rewrite(mut self) -> Self {
        self.rewrite_ws_origin = true;
        self
    }

    pub fn with_rewrite(mut self, rewrite: PathRewriteConfig) -> Self {
        self.rewrite = Some(rewrite);
        self
    }

    /// Name used in logs and metrics.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.path_prefix)
    }
}

/// Replace `from` with `to` in the outbound path, when `when` holds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathRewriteConfig {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub when: RewriteCondition,
}

/// Load-time condition gating a path rewrite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteCondition {
    #[default]
    Always,
    /// Only when the primary service listens on the billing service's port.
    PrimaryOnBillingPort,
}

fn default_routes() -> Vec<RouteConfig> {
    let primary = PRIMARY_SERVICE;
    vec![
        RouteConfig::new("/login", primary).with_cookie_rewrite(),
        RouteConfig::new("/logout", primary).with_cookie_rewrite(),
        RouteConfig::new("/api/xamops/user/profile", primary).with_rewrite(PathRewriteConfig {
            from: "/api/xamops/user/profile".to_string(),
            to: "/api/billops/profile".to_string(),
            when: RewriteCondition::PrimaryOnBillingPort,
        }),
        RouteConfig::new("/api/xamops/account-manager", primary),
        RouteConfig::new("/api/xamops/dashboard", primary),
        RouteConfig::new("/api/azure", primary),
        RouteConfig::new("/api/aws", primary),
        RouteConfig::new("/api/gcp", primary),
        RouteConfig::new("/api/admin", BILLING_SERVICE),
        RouteConfig::new("/api/billops", BILLING_SERVICE),
        RouteConfig::new("/api/xamops", XAMOPS_SERVICE),
        RouteConfig::new("/api/ai-advisor", primary),
        RouteConfig::new("/api/cicd", primary),
        RouteConfig::new("/terminal", primary).websocket(),
        RouteConfig::new("/ws", primary)
            .websocket()
            .with_ws_origin_rewrite(),
    ]
}

/// Timeout configuration for upstream calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed for the upstream to produce response headers, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// WebSocket tunnel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebSocketConfig {
    /// Close a tunnel after this many milliseconds without a frame.
    /// Zero disables the idle timeout.
    pub idle_timeout_ms: u64,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: 10_000,
        }
    }
}

/// Handling of requests that match no route.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Serve unmatched requests from this directory (e.g. the built pages).
    pub static_root: Option<String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Placeholder admin key; refused by validation when admin is enabled.
pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_API_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
