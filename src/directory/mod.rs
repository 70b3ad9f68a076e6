//! Tenant and version metadata lookup.
//!
//! # Data Flow
//! ```text
//! Control plane (external)
//!     → directory backend (in-memory, or fixture file with hot reload)
//!     → TenantDirectory / VersionDirectory traits
//!     → consumed by the host resolver and version router
//! ```
//!
//! # Design Decisions
//! - Lookup backends are injected as trait objects; components never
//!   construct their own (no global singletons)
//! - Records are returned by value as snapshots; live traffic never
//!   observes a half-updated app
//! - Backend failures are distinct from "not found"

pub mod file;
pub mod memory;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::InMemoryDirectory;
pub use types::{
    DeployedVersion, DomainBinding, DomainRecord, EnvVars, TenantApp, TrafficRule,
};

/// Errors from a directory backend. "Not found" is not an error; it is a
/// `None` from the lookup methods.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory backend unavailable: {0}")]
    Unavailable(String),
}

/// Lookup service for tenant applications and custom domains.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Look up an app by its platform name.
    async fn get_by_name(&self, name: &str) -> Result<Option<TenantApp>, DirectoryError>;

    /// Look up an app bound to `(domain, subdomain)`. `subdomain` is a
    /// literal label, `"@"`, or `"*"`.
    async fn get_by_domain(
        &self,
        domain: &str,
        subdomain: &str,
    ) -> Result<Option<TenantApp>, DirectoryError>;

    /// Look up a registered domain record (for catch-all redirects).
    async fn get_domain(&self, domain: &str) -> Result<Option<DomainRecord>, DirectoryError>;
}

/// Lookup service for deployed versions.
#[async_trait]
pub trait VersionDirectory: Send + Sync {
    /// Fetch one version of an app by id.
    async fn get_version(
        &self,
        app_id: &str,
        version_id: &str,
    ) -> Result<Option<DeployedVersion>, DirectoryError>;

    /// The most recently deployed version of an app, used when an app has
    /// no traffic rules at all.
    async fn most_recent_version(
        &self,
        app_id: &str,
    ) -> Result<Option<DeployedVersion>, DirectoryError>;
}
