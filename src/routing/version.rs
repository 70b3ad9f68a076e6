//! Version selection.
//!
//! # Responsibilities
//! - Evaluate an environment's traffic rules in array order
//! - Honor explicit version overrides (query parameter, sticky cookie)
//! - Fall back to the most recent deployment when no rules exist
//!
//! # Design Decisions
//! - Rule kinds are a closed enum; evaluation is an exhaustive match
//! - The uniform sampler is injected so tests are deterministic
//! - One independent draw per random rule, no statistical memory: the
//!   same visitor may flip between versions across requests

use crate::directory::types::{DeployedVersion, TenantApp, TrafficRule};
use crate::directory::VersionDirectory;
use crate::error::EdgeError;

/// Evaluate rules in order; the first matching rule wins.
///
/// A `Fixed` rule always matches. A `Random` rule matches when the drawn
/// sample is below its percentage. Returns `None` when nothing matched,
/// which is possible only if the probabilities don't sum to 1.
pub fn select_version<F>(rules: &[TrafficRule], mut draw: F) -> Option<&str>
where
    F: FnMut() -> f64,
{
    for rule in rules {
        match rule {
            TrafficRule::Fixed { version } => return Some(version),
            TrafficRule::Random {
                version,
                percentage,
            } => {
                if draw() < *percentage {
                    return Some(version);
                }
            }
        }
    }
    None
}

/// Resolve the active version for an app in an environment.
///
/// Order of precedence:
/// 1. an explicit override (validated against the directory; unknown ids
///    are silently discarded),
/// 2. traffic-rule evaluation for the environment,
/// 3. most recent deployment, only when the app has no rules at all.
pub async fn resolve_active_version(
    versions: &dyn VersionDirectory,
    app: &TenantApp,
    environment: &str,
    override_id: Option<&str>,
) -> Result<DeployedVersion, EdgeError> {
    if let Some(id) = override_id {
        match versions.get_version(&app.app_id, id).await? {
            Some(version) => return Ok(version),
            None => {
                tracing::debug!(
                    app = %app.name,
                    version_id = %id,
                    "Version override references an unknown version, falling back to rules"
                );
            }
        }
    }

    if !app.has_traffic_rules() {
        return versions
            .most_recent_version(&app.app_id)
            .await?
            .ok_or(EdgeError::NoVersionConfigured);
    }

    let Some(rules) = app.rules_for(environment) else {
        return Err(EdgeError::NoTrafficRulesForEnvironment(
            environment.to_string(),
        ));
    };

    let selected = select_version(rules, || rand::random::<f64>())
        .ok_or(EdgeError::NoVersionConfigured)?
        .to_string();

    versions
        .get_version(&app.app_id, &selected)
        .await?
        .ok_or(EdgeError::NoVersionConfigured)
}
