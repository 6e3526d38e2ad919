//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, upgrade flag)
//!     → router.rs (first matching rule, most specific first)
//!     → matcher.rs (literal path prefix)
//!     → rewrite.rs (optional outbound path rewrite)
//!     → Return: RouteDecision or None
//!
//! Response (cookie-rewriting rules only):
//!     → cookie.rs (Set-Cookie Path/Domain pointed at the proxy)
//!
//! Route Compilation (at startup):
//!     RouteConfig[] + services
//!     → resolve service endpoints, evaluate rewrite conditions
//!     → sort by prefix length (descending, stable)
//!     → Freeze as immutable RuleSet
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in the request hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - First match wins, and the first match is the longest prefix

pub mod cookie;
pub mod endpoint;
pub mod matcher;
pub mod rewrite;
pub mod router;

pub use cookie::CookieRewriter;
pub use endpoint::{Scheme, ServiceEndpoint};
pub use router::{RouteDecision, RouteRequest, RouteRule, RoutingError, RuleSet, RuleSummary};
