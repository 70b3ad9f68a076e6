//! Configuration validation.
//!
//! Semantic checks on top of serde's syntactic ones. Validation is a pure
//! function and returns all errors, not just the first.

use thiserror::Error;

use crate::config::schema::{EdgeConfig, StoreBackend};

/// A single semantic configuration problem.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("platform.base_domain must not be empty")]
    EmptyBaseDomain,

    #[error("platform.base_domain must not contain '{0}'")]
    InvalidBaseDomain(char),

    #[error("platform.default_environment must not be empty")]
    EmptyDefaultEnvironment,

    #[error("platform.header_prefix must be lowercase ASCII, got {0:?}")]
    InvalidHeaderPrefix(String),

    #[error("resolution_cache.ttl_secs must be greater than zero")]
    ZeroCacheTtl,

    #[error("store.redis_url must be set when store.backend is \"redis\"")]
    MissingRedisUrl,

    #[error("invalid listener.bind_address {0:?}")]
    InvalidBindAddress(String),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &EdgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let base = &config.platform.base_domain;
    if base.is_empty() {
        errors.push(ValidationError::EmptyBaseDomain);
    }
    for forbidden in ['/', ':', ' '] {
        if base.contains(forbidden) {
            errors.push(ValidationError::InvalidBaseDomain(forbidden));
        }
    }

    if config.platform.default_environment.is_empty() {
        errors.push(ValidationError::EmptyDefaultEnvironment);
    }

    let prefix = &config.platform.header_prefix;
    if !prefix
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        errors.push(ValidationError::InvalidHeaderPrefix(prefix.clone()));
    }

    if config.resolution_cache.enabled && config.resolution_cache.ttl_secs == 0 {
        errors.push(ValidationError::ZeroCacheTtl);
    }

    if config.store.backend == StoreBackend::Redis && config.store.redis_url.is_empty() {
        errors.push(ValidationError::MissingRedisUrl);
    }

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
