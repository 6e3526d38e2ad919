//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, dispatch)
//!     → request.rs (request ID)
//!     → [routing RuleSet decides upstream]
//!     → server.rs (plain forward) or websocket.rs (tunnel)
//!     → response.rs (hop-by-hop headers) + cookie rewrite
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
