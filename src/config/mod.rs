//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML), or built-in defaults
//!     → loader.rs (parse & deserialize, AUTH_PORT override)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → compiled into the routing RuleSet at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults; an empty file is the stock dev-server table
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{
    load_config, load_with_overrides, parse_port_override, set_primary_port, ConfigError,
    PRIMARY_PORT_ENV,
};
pub use schema::{
    AdminConfig, FallbackConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    PathRewriteConfig, ProxyConfig, RewriteCondition, RouteConfig, ServiceConfig,
    TimeoutConfig, WebSocketConfig,
};
