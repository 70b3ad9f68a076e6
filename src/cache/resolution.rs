//! Resolution cache: hostname → resolved context or redirect.
//!
//! # Responsibilities
//! - Serve repeat requests for a hostname without touching the directory
//! - Memoize cacheable redirects (www/apex canonicalization, catch-all)
//! - Enforce the write-side invariants (no wildcard entries, no
//!   non-cacheable redirects, no re-write on hit)
//!
//! # Design Decisions
//! - The key is the lower-cased hostname as received, pre-resolution, so
//!   redirect-before-resolution outcomes are cacheable too
//! - Entry expiry is the backing store's job; this module only sets TTLs
//! - Every store failure degrades to a miss and every malformed entry is
//!   logged and ignored; the cache is an optimization, never a
//!   correctness dependency

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::cache::store::KeyValueStore;
use crate::directory::types::{DeployedVersion, EnvVars, TenantApp};
use crate::resolver::context::{ResolvedContext, SubdomainKind};
use crate::resolver::resolve::RedirectDescriptor;

/// A memoized redirect.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedRedirect {
    pub status_code: u16,
    pub location: String,
}

/// A serialized resolved context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedContext {
    pub virtual_app: TenantApp,
    pub virtual_app_version: DeployedVersion,
    pub virtual_env: String,
    pub sub_domain: String,
    pub apex_domain: String,
    pub virtual_host: String,
    pub env: EnvVars,
}

/// One resolution cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResolutionEntry {
    Redirect { redirect: CachedRedirect },
    Context(CachedContext),
}

impl From<&ResolvedContext> for CachedContext {
    fn from(ctx: &ResolvedContext) -> Self {
        Self {
            virtual_app: ctx.app.clone(),
            virtual_app_version: ctx.version.clone(),
            virtual_env: ctx.environment.clone(),
            sub_domain: ctx.sub_domain.clone(),
            apex_domain: ctx.apex_domain.clone(),
            virtual_host: ctx.virtual_host.clone(),
            env: ctx.env_vars.clone(),
        }
    }
}

impl From<CachedContext> for ResolvedContext {
    fn from(cached: CachedContext) -> Self {
        let subdomain_kind = SubdomainKind::from_marker(&cached.sub_domain);
        Self {
            app: cached.virtual_app,
            version: cached.virtual_app_version,
            environment: cached.virtual_env,
            virtual_host: cached.virtual_host,
            subdomain_kind,
            sub_domain: cached.sub_domain,
            apex_domain: cached.apex_domain,
            env_vars: cached.env,
        }
    }
}

/// TTL-bounded cache over hostname resolutions.
pub struct ResolutionCache {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
    enabled: bool,
}

impl ResolutionCache {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration, enabled: bool) -> Self {
        Self {
            store,
            ttl,
            enabled,
        }
    }

    /// Look up a hostname. Store failures and malformed entries are
    /// logged and reported as a miss.
    pub async fn lookup(&self, hostname: &str) -> Option<ResolutionEntry> {
        if !self.enabled {
            return None;
        }
        let bytes = match self.store.get(hostname).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(hostname = %hostname, error = %e, "Resolution cache read failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(hostname = %hostname, error = %e, "Malformed resolution cache entry, treating as miss");
                None
            }
        }
    }

    /// Persist a resolved context. Wildcard matches are never written.
    pub async fn store_context(&self, hostname: &str, ctx: &ResolvedContext) {
        if !self.enabled {
            return;
        }
        if !ctx.subdomain_kind.cacheable() {
            tracing::trace!(hostname = %hostname, "Skipping resolution cache write for wildcard match");
            return;
        }
        let entry = ResolutionEntry::Context(CachedContext::from(ctx));
        self.write(hostname, &entry).await;
    }

    /// Persist a redirect descriptor, if it is cacheable.
    pub async fn store_redirect(&self, hostname: &str, redirect: &RedirectDescriptor) {
        if !self.enabled || !redirect.cacheable {
            return;
        }
        let entry = ResolutionEntry::Redirect {
            redirect: CachedRedirect {
                status_code: redirect.status.as_u16(),
                location: redirect.location.clone(),
            },
        };
        self.write(hostname, &entry).await;
    }

    async fn write(&self, hostname: &str, entry: &ResolutionEntry) {
        let bytes = match serde_json::to_vec(entry) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize resolution cache entry");
                return;
            }
        };
        if let Err(e) = self.store.put(hostname, bytes, Some(self.ttl)).await {
            tracing::warn!(hostname = %hostname, error = %e, "Resolution cache write failed");
        }
    }
}

impl CachedRedirect {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::FOUND)
    }
}
