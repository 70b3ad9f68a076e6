//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! gateway. All types derive Serde traits for deserialization from config
//! files, and every field has a default so a minimal config is valid.

use serde::{Deserialize, Serialize};

/// Root configuration for the edge gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EdgeConfig {
    /// Listener configuration (bind address, connection limits).
    pub listener: ListenerConfig,

    /// Platform-wide resolution settings (base domain, environments,
    /// header prefix, override parameter names).
    pub platform: PlatformConfig,

    /// Resolution cache settings.
    pub resolution_cache: ResolutionCacheConfig,

    /// Response cache settings.
    pub response_cache: ResponseCacheConfig,

    /// Backing key-value store settings (shared by both caches).
    pub store: StoreConfig,

    /// Tenant fixture file settings.
    pub tenants: TenantsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Platform-wide resolution settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Shared base domain; `name[--env].<base_domain>` addresses tenants
    /// by name.
    pub base_domain: String,

    /// Environment assumed when a hostname carries no environment
    /// segment.
    pub default_environment: String,

    /// Local-development environment; responses for it are never cached.
    pub dev_environment: String,

    /// Prefix for emitted identity and cache-status headers.
    pub header_prefix: String,

    /// Query parameter naming a version id to pin for this request.
    pub version_query_param: String,

    /// Cookie naming a version id to pin (sticky sessions).
    pub version_cookie: String,

    /// Query parameter that bypasses the response-cache read path.
    pub nocache_query_param: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_domain: "localhost".to_string(),
            default_environment: "production".to_string(),
            dev_environment: "dev".to_string(),
            header_prefix: "x-edge-".to_string(),
            version_query_param: "_version".to_string(),
            version_cookie: "edge-version".to_string(),
            nocache_query_param: "_nocache".to_string(),
        }
    }
}

/// Resolution cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolutionCacheConfig {
    /// Enable the resolution cache.
    pub enabled: bool,

    /// Entry lifetime in seconds. Expiry is enforced by the backing
    /// store.
    pub ttl_secs: u64,
}

impl Default for ResolutionCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // 72 hours
            ttl_secs: 72 * 60 * 60,
        }
    }
}

/// Response cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResponseCacheConfig {
    /// Enable the response cache.
    pub enabled: bool,

    /// Largest response body the recorder will capture. Bigger bodies
    /// stream through unrecorded.
    pub max_body_bytes: usize,
}

impl Default for ResponseCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_body_bytes: 4 * 1024 * 1024,
        }
    }
}

/// Which key-value backend both caches use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local store; suitable for tests and single-node
    /// deployments.
    Memory,
    /// Shared Redis store for multi-instance deployments.
    Redis,
}

/// Key-value store settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Redis connection URL, required when `backend = "redis"`.
    pub redis_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            redis_url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

/// Tenant fixture file settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TenantsConfig {
    /// Path to the tenant fixture file. Absent = empty directory (useful
    /// only for tests).
    pub file: Option<String>,

    /// Reload the fixture when the file changes.
    pub watch: bool,
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Upstream render timeout in seconds.
    pub render_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            render_secs: 25,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
