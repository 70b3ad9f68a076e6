//! Host resolution subsystem.
//!
//! # Data Flow
//! ```text
//! Host header
//!     → host.rs (normalize, classify: platform vs custom domain)
//!     → resolve.rs (directory lookups, ordered custom-domain cascade)
//!     → Tenant match | Redirect descriptor | resolution error
//!     → context.rs (combined with the routed version into a
//!       ResolvedContext)
//! ```
//!
//! # Design Decisions
//! - Parsing (host.rs) is pure and separately testable from lookups
//! - The cascade order is fixed: exact, wildcard, apex fallback
//! - Redirects carry an explicit cacheable flag so SSL enforcement can
//!   never leak into the resolution cache

pub mod context;
pub mod host;
pub mod resolve;

pub use context::{ResolvedContext, SubdomainKind};
pub use host::normalize_hostname;
pub use resolve::{HostResolution, HostResolver, RedirectDescriptor, RequestMeta, ResolvedTenant};
