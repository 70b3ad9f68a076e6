//! Downstream rendering interface.
//!
//! Rendering is outside the resolution core: once a request is resolved,
//! a [`Renderer`] produces the actual response. The default implementation
//! forwards to the per-version upstream named in the deployment manifest;
//! richer pipelines (plugins, HTML post-processing) implement the same
//! trait.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::uri::{Authority, Scheme, Uri};
use axum::http::Request;
use axum::response::Response;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use thiserror::Error;

use crate::resolver::ResolvedContext;

/// Errors from the rendering pipeline.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("version manifest names no upstream address")]
    NoUpstream,

    #[error("upstream request failed: {0}")]
    Upstream(String),
}

/// Produces the response for a resolved request.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(
        &self,
        ctx: &ResolvedContext,
        request: Request<Body>,
    ) -> Result<Response, RenderError>;
}

/// Read the upstream address out of a version manifest.
fn upstream_addr(manifest: &serde_json::Value) -> Option<&str> {
    manifest.get("upstream").and_then(|v| v.as_str())
}

/// Forwards requests to the address in the version manifest.
pub struct UpstreamRenderer {
    client: Client<HttpConnector, Body>,
}

impl UpstreamRenderer {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client }
    }
}

impl Default for UpstreamRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Renderer for UpstreamRenderer {
    async fn render(
        &self,
        ctx: &ResolvedContext,
        request: Request<Body>,
    ) -> Result<Response, RenderError> {
        let upstream = upstream_addr(&ctx.version.manifest).ok_or(RenderError::NoUpstream)?;
        let authority = Authority::try_from(upstream)
            .map_err(|e| RenderError::Upstream(format!("bad upstream address: {e}")))?;

        let (mut parts, body) = request.into_parts();
        let mut uri_parts = parts.uri.clone().into_parts();
        uri_parts.scheme = Some(Scheme::HTTP);
        uri_parts.authority = Some(authority);
        if uri_parts.path_and_query.is_none() {
            uri_parts.path_and_query = Some("/".parse().expect("static path"));
        }
        parts.uri = Uri::from_parts(uri_parts)
            .map_err(|e| RenderError::Upstream(format!("bad upstream uri: {e}")))?;

        tracing::debug!(
            app = %ctx.app.name,
            version = %ctx.version.version_id,
            upstream = %upstream,
            "Forwarding to upstream renderer"
        );

        let response = self
            .client
            .request(Request::from_parts(parts, body))
            .await
            .map_err(|e| RenderError::Upstream(e.to_string()))?;

        let (parts, body) = response.into_parts();
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_addr_extraction() {
        let manifest = serde_json::json!({ "upstream": "127.0.0.1:3000" });
        assert_eq!(upstream_addr(&manifest), Some("127.0.0.1:3000"));
        assert_eq!(upstream_addr(&serde_json::Value::Null), None);
        assert_eq!(upstream_addr(&serde_json::json!({"upstream": 42})), None);
    }
}
