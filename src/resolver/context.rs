//! The per-request resolved context.

use crate::directory::types::{DeployedVersion, EnvVars, TenantApp};
use crate::resolver::host::{APEX_MARKER, WILDCARD_MARKER};

/// How the hostname matched a tenant binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubdomainKind {
    /// Platform subdomain of the shared base domain.
    Platform,
    /// Exact `(domain, subdomain)` custom-domain match.
    Exact,
    /// Matched a `*` binding. Never written to the resolution cache:
    /// arbitrary subdomains would grow the key space without bound.
    Wildcard,
    /// Matched the `@` (apex) binding.
    Apex,
}

impl SubdomainKind {
    /// Whether a resolution of this kind may be persisted.
    pub fn cacheable(self) -> bool {
        !matches!(self, SubdomainKind::Wildcard)
    }

    /// Recover the kind from a cached subdomain marker.
    pub fn from_marker(marker: &str) -> Self {
        match marker {
            APEX_MARKER => SubdomainKind::Apex,
            WILDCARD_MARKER => SubdomainKind::Wildcard,
            _ => SubdomainKind::Exact,
        }
    }
}

/// Everything the rest of the pipeline needs once a request is resolved:
/// the tenant, the selected version, the environment and its derived
/// variables. Lives for one request; optionally persisted as a resolution
/// cache entry.
#[derive(Debug, Clone)]
pub struct ResolvedContext {
    pub app: TenantApp,
    pub version: DeployedVersion,
    pub environment: String,
    /// Hostname with any environment segment stripped and apex rebasing
    /// applied.
    pub virtual_host: String,
    pub subdomain_kind: SubdomainKind,
    /// Matched subdomain marker: a literal label, `"@"`, or `"*"`.
    pub sub_domain: String,
    pub apex_domain: String,
    /// `_global` merged with environment-specific variables.
    pub env_vars: EnvVars,
}
