//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled rules, most specific prefix first
//! - Look up the rule claiming a request path
//! - Return a routing decision or an explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Rules sorted by descending prefix length at build time, so a general
//!   prefix can never occlude a more specific one
//! - O(n) path prefix scan (acceptable for typical route counts)
//! - Explicit NoMatch rather than silent default

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;

use crate::config::ProxyConfig;
use crate::routing::cookie::CookieRewriter;
use crate::routing::endpoint::{Scheme, ServiceEndpoint};
use crate::routing::matcher::PathPrefixMatcher;
use crate::routing::rewrite::PathRewrite;

/// Errors raised while compiling a rule set.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("route prefix '{0}' is declared more than once")]
    DuplicatePrefix(String),

    #[error("route '{route}' references unknown service '{service}'")]
    UnknownService { route: String, service: String },

    #[error("cookie pattern failed to compile: {0}")]
    Pattern(#[from] regex::Error),
}

/// A compiled routing entry.
#[derive(Debug, Clone)]
pub struct RouteRule {
    pub name: String,
    pub matcher: PathPrefixMatcher,
    pub target: ServiceEndpoint,
    pub is_websocket: bool,
    pub rewrite_path: Option<PathRewrite>,
    pub rewrite_response_cookies: bool,
    pub preserve_host_header: bool,
    pub rewrite_ws_origin: bool,
}

impl RouteRule {
    /// A plain HTTP rule forwarding `prefix` unchanged to `target`.
    pub fn new(prefix: impl Into<String>, target: ServiceEndpoint) -> Self {
        let prefix = prefix.into();
        Self {
            name: prefix.clone(),
            matcher: PathPrefixMatcher::new(prefix),
            is_websocket: target.scheme == Scheme::Ws,
            target,
            rewrite_path: None,
            rewrite_response_cookies: false,
            preserve_host_header: false,
            rewrite_ws_origin: false,
        }
    }

    pub fn prefix(&self) -> &str {
        self.matcher.prefix()
    }
}

/// What the resolver is asked about.
#[derive(Debug, Clone, Copy)]
pub struct RouteRequest<'a> {
    pub path: &'a str,
    pub is_websocket_upgrade: bool,
}

impl<'a> RouteRequest<'a> {
    pub fn http(path: &'a str) -> Self {
        Self {
            path,
            is_websocket_upgrade: false,
        }
    }

    pub fn upgrade(path: &'a str) -> Self {
        Self {
            path,
            is_websocket_upgrade: true,
        }
    }
}

/// Where and how a request is forwarded.
#[derive(Debug, Clone)]
pub struct RouteDecision<'a> {
    pub rule: &'a RouteRule,
    pub endpoint: &'a ServiceEndpoint,
    pub outbound_path: String,
    /// Present when the response's cookies must be rewritten.
    pub rewrite_response_cookies: Option<&'a CookieRewriter>,
    /// The request is an upgrade and the rule tunnels WebSockets.
    pub forward_as_websocket: bool,
    pub preserve_host_header: bool,
    pub rewrite_ws_origin: bool,
}

/// Serializable view of a rule, for the admin API and the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct RuleSummary {
    pub name: String,
    pub prefix: String,
    pub target: String,
    pub websocket: bool,
    pub rewrite: Option<(String, String)>,
    pub rewrite_cookies: bool,
    pub preserve_host: bool,
}

impl From<&RouteRule> for RuleSummary {
    fn from(rule: &RouteRule) -> Self {
        Self {
            name: rule.name.clone(),
            prefix: rule.prefix().to_string(),
            target: rule.target.to_string(),
            websocket: rule.is_websocket,
            rewrite: rule
                .rewrite_path
                .as_ref()
                .map(|r| (r.from().to_string(), r.to().to_string())),
            rewrite_cookies: rule.rewrite_response_cookies,
            preserve_host: rule.preserve_host_header,
        }
    }
}

/// The immutable, ordered routing table.
#[derive(Debug)]
pub struct RuleSet {
    rules: Vec<RouteRule>,
    cookies: CookieRewriter,
}

impl RuleSet {
    /// Build a rule set, rejecting duplicate prefixes and ordering the
    /// rules most specific first. Rules of equal length keep their order.
    pub fn new(mut rules: Vec<RouteRule>) -> Result<Self, RoutingError> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.prefix()) {
                return Err(RoutingError::DuplicatePrefix(rule.prefix().to_string()));
            }
        }

        rules.sort_by(|a, b| b.matcher.specificity().cmp(&a.matcher.specificity()));

        Ok(Self {
            rules,
            cookies: CookieRewriter::new()?,
        })
    }

    /// Compile the configured routes against the configured services.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, RoutingError> {
        let mut rules = Vec::with_capacity(config.routes.len());

        for route in &config.routes {
            let service = config.service(&route.service).ok_or_else(|| {
                RoutingError::UnknownService {
                    route: route.display_name().to_string(),
                    service: route.service.clone(),
                }
            })?;
            let scheme = if route.websocket { Scheme::Ws } else { Scheme::Http };

            let mut rule = RouteRule::new(
                route.path_prefix.clone(),
                ServiceEndpoint::new(scheme, service.host.clone(), service.port),
            );
            rule.name = route.display_name().to_string();
            rule.rewrite_path = route
                .rewrite
                .as_ref()
                .and_then(|rewrite| PathRewrite::from_config(rewrite, config));
            rule.rewrite_response_cookies = route.rewrite_cookies;
            rule.preserve_host_header = route.preserve_host;
            rule.rewrite_ws_origin = route.rewrite_ws_origin;
            rules.push(rule);
        }

        let rule_set = Self::new(rules)?;
        for rule in rule_set.rules() {
            tracing::debug!(
                prefix = %rule.prefix(),
                target = %rule.target,
                websocket = rule.is_websocket,
                rewrite = rule.rewrite_path.is_some(),
                "Route compiled"
            );
        }
        Ok(rule_set)
    }

    /// Resolve a request to the first (most specific) matching rule.
    pub fn resolve(&self, request: &RouteRequest<'_>) -> Option<RouteDecision<'_>> {
        let rule = self.rules.iter().find(|r| r.matcher.matches(request.path))?;

        if rule.is_websocket != request.is_websocket_upgrade {
            tracing::debug!(
                path = %request.path,
                rule = %rule.name,
                upgrade = request.is_websocket_upgrade,
                "Protocol does not match rule; forwarding as plain HTTP"
            );
        }

        let outbound_path = match &rule.rewrite_path {
            Some(rewrite) => rewrite.apply(request.path),
            None => request.path.to_string(),
        };

        Some(RouteDecision {
            rule,
            endpoint: &rule.target,
            outbound_path,
            rewrite_response_cookies: rule.rewrite_response_cookies.then_some(&self.cookies),
            forward_as_websocket: rule.is_websocket && request.is_websocket_upgrade,
            preserve_host_header: rule.preserve_host_header,
            rewrite_ws_origin: rule.rewrite_ws_origin,
        })
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    pub fn summaries(&self) -> Vec<RuleSummary> {
        self.rules.iter().map(RuleSummary::from).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
