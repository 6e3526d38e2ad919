//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Compile routes → Bind → Mark ready
//!
//! Readiness (ready.rs):
//!     Listener accepting → gate opens once → waiters released
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then routes, then listeners
//! - Readiness is one-shot: it never closes again once open

pub mod ready;
pub mod shutdown;
pub mod signals;

pub use ready::Readiness;
pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
