//! Version routing subsystem.
//!
//! # Data Flow
//! ```text
//! Resolved tenant + environment
//!     → override check (query parameter / sticky cookie, validated)
//!     → version.rs (traffic-rule evaluation, first match wins)
//!     → fallback: most recent deployment (only when no rules exist)
//!     → Return: one DeployedVersion, or a resolution error
//! ```
//!
//! # Design Decisions
//! - Deterministic given the drawn samples: same rules, same draws,
//!   same version
//! - Rule evaluation does no I/O; directory fetches happen around it

pub mod version;

pub use version::{resolve_active_version, select_version};
