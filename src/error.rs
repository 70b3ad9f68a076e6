//! Request-level error taxonomy.
//!
//! # Design Decisions
//! - Resolution failures are fatal to the request and map to an HTTP
//!   status plus a machine-readable code; internal error text never
//!   reaches clients
//! - Cache-layer failures never appear here: they degrade to miss/skip
//!   inside the cache modules

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::directory::DirectoryError;
use crate::render::RenderError;

/// Errors surfaced to clients by the edge pipeline.
#[derive(Debug, Error)]
pub enum EdgeError {
    #[error("request carries no Host header")]
    MissingHostHeader,

    #[error("no tenant application matches the requested hostname")]
    TenantNotFound,

    #[error("environment {0:?} is not enabled for this application")]
    InvalidEnvironment(String),

    #[error("no traffic rules configured for environment {0:?}")]
    NoTrafficRulesForEnvironment(String),

    #[error("traffic rules selected no deployable version")]
    NoVersionConfigured,

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl EdgeError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            EdgeError::MissingHostHeader
            | EdgeError::TenantNotFound
            | EdgeError::InvalidEnvironment(_)
            | EdgeError::NoTrafficRulesForEnvironment(_)
            | EdgeError::NoVersionConfigured => StatusCode::NOT_FOUND,
            EdgeError::Directory(_) | EdgeError::Render(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            EdgeError::MissingHostHeader => "missing_host_header",
            EdgeError::TenantNotFound => "tenant_not_found",
            EdgeError::InvalidEnvironment(_) => "invalid_environment",
            EdgeError::NoTrafficRulesForEnvironment(_) => "no_traffic_rules_for_environment",
            EdgeError::NoVersionConfigured => "no_version_configured",
            EdgeError::Directory(_) => "directory_unavailable",
            EdgeError::Render(_) => "render_failed",
        }
    }
}

impl IntoResponse for EdgeError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Client-caused 404s log at debug; upstream failures at warn.
        if status.is_server_error() {
            tracing::warn!(code = self.code(), error = %self, "Request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "Request not resolvable");
        }
        let body = Json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_errors_are_404() {
        assert_eq!(EdgeError::MissingHostHeader.status(), StatusCode::NOT_FOUND);
        assert_eq!(EdgeError::TenantNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            EdgeError::NoTrafficRulesForEnvironment("staging".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(EdgeError::NoVersionConfigured.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(EdgeError::TenantNotFound.code(), "tenant_not_found");
        assert_eq!(
            EdgeError::InvalidEnvironment("qa".into()).code(),
            "invalid_environment"
        );
    }
}
