//! Development reverse proxy for the dashboard single-page app.

pub mod admin;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::{Readiness, Shutdown};
pub use routing::{RouteDecision, RouteRequest, RuleSet};
