//! Lifecycle management subsystem.
//!
//! # Design Decisions
//! - Ordered startup: config first, then stores and directory, then the
//!   listener (owned by the binary entry point)
//! - Shutdown is a broadcast; the server drains in-flight requests via
//!   axum's graceful shutdown

pub mod shutdown;

pub use shutdown::{Shutdown, ShutdownListener};
