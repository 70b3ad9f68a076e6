//! Observability subsystem.
//!
//! # Responsibilities
//! - Prometheus metrics for request volume, latency, and cache outcomes
//! - Structured logging happens via `tracing` at the call sites; the
//!   subscriber is installed by the binary entry point

pub mod metrics;
