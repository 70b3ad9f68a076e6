//! Tenant, version and domain records.
//!
//! These types mirror what the control plane persists. The gateway treats
//! them as read-only snapshots: it never mutates an app or version, it only
//! resolves against them.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Effective environment variables for one resolved environment.
///
/// A `BTreeMap` so that serialization and fingerprint hashing are
/// deterministic regardless of insertion order.
pub type EnvVars = BTreeMap<String, String>;

/// Key under which app-wide environment variables are stored in the
/// per-environment map.
pub const GLOBAL_ENV_KEY: &str = "_global";

/// A custom-domain binding for a tenant application.
///
/// `subdomain` is a literal label, `"@"` for the apex, or `"*"` for a
/// wildcard that matches any unrecognized subdomain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainBinding {
    pub domain: String,
    #[serde(default = "default_subdomain")]
    pub subdomain: String,
}

fn default_subdomain() -> String {
    "@".to_string()
}

/// One hosted application identity, addressable by name or custom domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantApp {
    /// Stable identity assigned by the control plane.
    pub app_id: String,

    /// Display name; also the leading label on platform subdomains.
    pub name: String,

    /// Environments this app may be served under. `None` = unrestricted.
    #[serde(default)]
    pub environments: Option<Vec<String>>,

    /// Optional custom-domain binding.
    #[serde(default)]
    pub domain: Option<DomainBinding>,

    /// Owning organization, if any.
    #[serde(default)]
    pub org: Option<String>,

    /// When true, plaintext requests are redirected to https before
    /// anything else happens.
    #[serde(default)]
    pub require_ssl: bool,

    /// Canonical https URL, used as the SSL-redirect target.
    #[serde(default)]
    pub canonical_url: Option<String>,

    /// Per-environment https URL overrides, preferred over `canonical_url`.
    #[serde(default)]
    pub environment_urls: HashMap<String, String>,

    /// Environment variables: `_global` values plus per-environment
    /// overrides.
    #[serde(default)]
    pub env: Option<HashMap<String, EnvVars>>,

    /// Traffic-routing rules keyed by environment.
    #[serde(default)]
    pub traffic_rules: Option<HashMap<String, Vec<TrafficRule>>>,
}

impl TenantApp {
    /// Merge `_global` variables with the given environment's variables.
    /// Environment-specific keys override global keys of the same name.
    pub fn environment_vars(&self, environment: &str) -> EnvVars {
        let mut merged = EnvVars::new();
        if let Some(env) = &self.env {
            if let Some(globals) = env.get(GLOBAL_ENV_KEY) {
                merged.extend(globals.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            if let Some(specific) = env.get(environment) {
                merged.extend(specific.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        merged
    }

    /// Whether this app may be served under `environment`.
    /// Apps without an explicit whitelist permit every environment.
    pub fn permits_environment(&self, environment: &str) -> bool {
        match &self.environments {
            Some(permitted) => permitted.iter().any(|e| e == environment),
            None => true,
        }
    }

    /// Traffic rules for one environment, if any are configured at all.
    pub fn rules_for(&self, environment: &str) -> Option<&[TrafficRule]> {
        self.traffic_rules
            .as_ref()
            .and_then(|rules| rules.get(environment))
            .map(Vec::as_slice)
    }

    /// Whether the app has any traffic rules configured.
    pub fn has_traffic_rules(&self) -> bool {
        self.traffic_rules.as_ref().is_some_and(|r| !r.is_empty())
    }
}

/// One deployed, immutable version of a tenant application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployedVersion {
    pub version_id: String,

    /// Optional human-readable name.
    #[serde(default)]
    pub name: Option<String>,

    /// Opaque manifest consumed by the rendering pipeline, never
    /// interpreted by the resolution core.
    #[serde(default)]
    pub manifest: serde_json::Value,
}

/// A traffic-routing rule. Evaluated in array order, first match wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TrafficRule {
    /// Always matches.
    Fixed { version: String },
    /// Matches with the configured probability, one independent uniform
    /// draw per evaluation.
    Random { version: String, percentage: f64 },
}

impl TrafficRule {
    /// Target version id of this rule.
    pub fn version(&self) -> &str {
        match self {
            TrafficRule::Fixed { version } => version,
            TrafficRule::Random { version, .. } => version,
        }
    }
}

/// A registered custom domain, carrying domain-level settings that apply
/// when no tenant binding matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainRecord {
    pub name: String,

    /// Where to send requests that match no tenant binding.
    #[serde(default)]
    pub catch_all_redirect: Option<String>,
}
