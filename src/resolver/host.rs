//! Hostname parsing and classification.
//!
//! # Responsibilities
//! - Normalize the inbound Host header (lowercase, strip port)
//! - Classify hostnames as platform subdomains or custom domains
//! - Split the `name--env` environment separator
//! - Split custom domains into (apex, subdomain) under public-suffix rules
//!
//! # Design Decisions
//! - Classification is pure string work; no lookups happen here
//! - Multi-label TLDs are handled via the public-suffix list, so
//!   `shop.example.co.uk` splits into apex `example.co.uk` + `shop`

/// Separator between a hostname label and its environment segment.
pub const ENV_SEPARATOR: &str = "--";

/// Marker for an apex (no-subdomain) request.
pub const APEX_MARKER: &str = "@";

/// Marker for a wildcard subdomain binding.
pub const WILDCARD_MARKER: &str = "*";

/// A classified hostname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostClass {
    /// `name[--env].<base_domain>` — tenant addressed by platform name.
    Platform {
        app_name: String,
        environment: Option<String>,
    },
    /// Anything else — a custom domain split into apex + subdomain.
    /// `subdomain` is [`APEX_MARKER`] for apex requests.
    Custom {
        apex: String,
        subdomain: String,
        environment: Option<String>,
    },
}

/// Lowercase the hostname and strip any `:port` suffix.
pub fn normalize_hostname(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    match lowered.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host.to_string(),
        _ => lowered,
    }
}

/// Split a label on the environment separator: `"name--env"` →
/// `("name", Some("env"))`. The split is on the first occurrence.
pub fn split_env_label(label: &str) -> (&str, Option<&str>) {
    match label.split_once(ENV_SEPARATOR) {
        Some((name, env)) if !name.is_empty() && !env.is_empty() => (name, Some(env)),
        _ => (label, None),
    }
}

/// Classify an already-normalized hostname against the platform base
/// domain.
pub fn classify(hostname: &str, base_domain: &str) -> HostClass {
    if let Some(prefix) = hostname.strip_suffix(base_domain) {
        if let Some(labels) = prefix.strip_suffix('.') {
            // First label before the first dot is the tenant name.
            let first = labels.split('.').next().unwrap_or(labels);
            let (name, environment) = split_env_label(first);
            return HostClass::Platform {
                app_name: name.to_string(),
                environment: environment.map(str::to_string),
            };
        }
    }

    let apex = psl::domain_str(hostname).unwrap_or(hostname);
    if apex == hostname {
        return HostClass::Custom {
            apex: apex.to_string(),
            subdomain: APEX_MARKER.to_string(),
            environment: None,
        };
    }

    let subdomain = &hostname[..hostname.len() - apex.len() - 1];
    let (subdomain, environment) = split_env_label(subdomain);
    HostClass::Custom {
        apex: apex.to_string(),
        subdomain: subdomain.to_string(),
        environment: environment.map(str::to_string),
    }
}
