//! HTTP server setup and the edge request pipeline.
//!
//! # Responsibilities
//! - Create the Axum router and wire up middleware (timeout, request id,
//!   tracing)
//! - Run the per-request pipeline: host resolution → resolution cache →
//!   version routing → response cache → downstream rendering
//! - Emit identity and cache-status headers
//!
//! # Request pipeline
//! ```text
//! Host header
//!     → resolution cache lookup ──hit──→ context / immediate redirect
//!     → host resolver + version router (miss), write-through
//!     → response cache: conditional GET → replay → or render + record
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::cache::resolution::{ResolutionCache, ResolutionEntry};
use crate::cache::response::{
    compute_fingerprint, etag_value, if_none_match_matches, normalized_url, CachedResponse,
    ResponseCache,
};
use crate::cache::store::KeyValueStore;
use crate::config::{EdgeConfig, PlatformConfig};
use crate::directory::{TenantDirectory, VersionDirectory};
use crate::error::EdgeError;
use crate::http::recorder;
use crate::http::request::RequestIdLayer;
use crate::observability::metrics;
use crate::render::Renderer;
use crate::resolver::{
    normalize_hostname, HostResolution, HostResolver, RequestMeta, ResolvedContext,
};
use crate::routing::resolve_active_version;

/// Marker extension attached by the (out-of-scope) authentication layer.
/// Its presence disables the response cache for the request.
#[derive(Debug, Clone)]
pub struct Principal {
    pub subject: String,
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<HostResolver>,
    pub versions: Arc<dyn VersionDirectory>,
    pub resolution_cache: Arc<ResolutionCache>,
    pub response_cache: Arc<ResponseCache>,
    pub renderer: Arc<dyn Renderer>,
    pub platform: PlatformConfig,
}

/// HTTP server for the edge gateway.
pub struct EdgeServer {
    router: Router,
    config: EdgeConfig,
}

impl EdgeServer {
    /// Create a new server with the given configuration and collaborators.
    pub fn new(
        config: EdgeConfig,
        tenants: Arc<dyn TenantDirectory>,
        versions: Arc<dyn VersionDirectory>,
        store: Arc<dyn KeyValueStore>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        let resolver = Arc::new(HostResolver::new(tenants, config.platform.clone()));
        let resolution_cache = Arc::new(ResolutionCache::new(
            store.clone(),
            Duration::from_secs(config.resolution_cache.ttl_secs),
            config.resolution_cache.enabled,
        ));
        let response_cache = Arc::new(ResponseCache::new(
            store,
            &config.platform.header_prefix,
            config.response_cache.max_body_bytes,
            config.response_cache.enabled,
        ));

        let state = AppState {
            resolver,
            versions,
            resolution_cache,
            response_cache,
            renderer,
            platform: config.platform.clone(),
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &EdgeConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(edge_handler))
            .route("/", any(edge_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until Ctrl+C.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        self.run_until(listener, shutdown_signal()).await
    }

    /// Run the server until the given future completes.
    pub async fn run_until<F>(self, listener: TcpListener, signal: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            base_domain = %self.config.platform.base_domain,
            "Edge gateway starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(signal)
            .await?;

        tracing::info!("Edge gateway stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &EdgeConfig {
        &self.config
    }
}

/// Main edge handler: resolve, consult caches, render.
async fn edge_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();

    let response = match handle(state, request).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    };

    metrics::record_request(&method, response.status().as_u16(), started);
    response
}

async fn handle(state: AppState, request: Request<Body>) -> Result<Response, EdgeError> {
    let host_raw = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .ok_or(EdgeError::MissingHostHeader)?;
    let hostname = normalize_hostname(host_raw);

    let secure = request
        .headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .map(|proto| proto.eq_ignore_ascii_case("https"))
        .unwrap_or(false);
    let path = request.uri().path().to_string();
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.to_string())
        .unwrap_or_else(|| "/".to_string());
    let meta = RequestMeta {
        secure,
        path_and_query,
    };

    let version_override = version_override(&state.platform, &request);
    let nocache = query_param_present(&request, &state.platform.nocache_query_param);
    let principal = request.extensions().get::<Principal>().is_some();

    // Resolution cache first: a hit skips the resolver and the version
    // router entirely. The entry encodes that SSL and environment checks
    // passed when it was written.
    let cached = state.resolution_cache.lookup(&hostname).await;
    let context = match cached {
        Some(ResolutionEntry::Redirect { redirect }) => {
            metrics::record_resolution_cache("hit");
            return Ok(redirect_response(redirect.status(), &redirect.location));
        }
        Some(ResolutionEntry::Context(cached)) => {
            metrics::record_resolution_cache("hit");
            let mut ctx = ResolvedContext::from(cached);
            // Explicit pins still apply on a hit; rule evaluation stays
            // skipped. Unknown ids are discarded.
            if let Some(id) = &version_override {
                if *id != ctx.version.version_id {
                    if let Some(version) =
                        state.versions.get_version(&ctx.app.app_id, id).await?
                    {
                        ctx.version = version;
                    }
                }
            }
            ctx
        }
        None => {
            metrics::record_resolution_cache("miss");
            match state.resolver.resolve(&hostname, &meta).await? {
                HostResolution::Redirect(redirect) => {
                    state
                        .resolution_cache
                        .store_redirect(&hostname, &redirect)
                        .await;
                    return Ok(redirect_response(redirect.status, &redirect.location));
                }
                HostResolution::Tenant(tenant) => {
                    let version = resolve_active_version(
                        state.versions.as_ref(),
                        &tenant.app,
                        &tenant.environment,
                        version_override.as_deref(),
                    )
                    .await?;
                    let env_vars = tenant.app.environment_vars(&tenant.environment);
                    let pinned =
                        version_override.as_deref() == Some(version.version_id.as_str());
                    let ctx = ResolvedContext {
                        app: tenant.app,
                        version,
                        environment: tenant.environment,
                        virtual_host: tenant.virtual_host,
                        subdomain_kind: tenant.subdomain_kind,
                        sub_domain: tenant.sub_domain,
                        apex_domain: tenant.apex_domain,
                        env_vars,
                    };
                    // Pinned selections are per-visitor; only rule-driven
                    // contexts are shared through the cache.
                    if !pinned {
                        state.resolution_cache.store_context(&hostname, &ctx).await;
                    }
                    ctx
                }
            }
        }
    };

    // The response cache serves anonymous traffic outside the dev
    // environment; everything else renders directly.
    let eligible = state.response_cache.enabled()
        && !principal
        && context.environment != state.platform.dev_environment;
    if !eligible {
        metrics::record_response_cache("bypass");
        let mut response = state.renderer.render(&context, request).await?;
        apply_identity_headers(&mut response, &state.platform.header_prefix, &context);
        return Ok(response);
    }

    let url = normalized_url(secure, &context.virtual_host, &path);
    let token = compute_fingerprint(&context.version.version_id, &context.env_vars, &url);

    // Conditional GET: answered from the fingerprint alone, no store I/O.
    if let Some(if_none_match) = request
        .headers()
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
    {
        if if_none_match_matches(if_none_match, &token) {
            metrics::record_response_cache("revalidated");
            return Ok(not_modified_response(&token));
        }
    }

    if !nocache {
        if let Some(cached) = state.response_cache.try_serve(&token).await {
            metrics::record_response_cache("hit");
            return Ok(replay_cached(cached, &token, &state.platform.header_prefix));
        }
    }
    metrics::record_response_cache("miss");

    let mut response = state.renderer.render(&context, request).await?;
    apply_identity_headers(&mut response, &state.platform.header_prefix, &context);
    set_header(&mut response, header::ETAG.as_str(), &etag_value(&token));
    set_header(
        &mut response,
        &format!("{}server-cache", state.platform.header_prefix),
        &format!("miss {token}"),
    );

    Ok(recorder::observe(
        response,
        state.response_cache.clone(),
        token,
    ))
}

/// Version pin from the override query parameter, else the sticky cookie.
fn version_override(platform: &PlatformConfig, request: &Request<Body>) -> Option<String> {
    if let Some(query) = request.uri().query() {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if key == platform.version_query_param.as_str() && !value.is_empty() {
                return Some(value.into_owned());
            }
        }
    }
    cookie_value(request, &platform.version_cookie)
}

fn query_param_present(request: &Request<Body>, name: &str) -> bool {
    request
        .uri()
        .query()
        .map(|query| {
            url::form_urlencoded::parse(query.as_bytes()).any(|(key, _)| key == name)
        })
        .unwrap_or(false)
}

fn cookie_value(request: &Request<Body>, name: &str) -> Option<String> {
    for header in request.headers().get_all(header::COOKIE) {
        let Ok(value) = header.to_str() else { continue };
        for pair in value.split(';') {
            if let Some((key, val)) = pair.trim().split_once('=') {
                if key == name && !val.is_empty() {
                    return Some(val.to_string());
                }
            }
        }
    }
    None
}

fn redirect_response(status: StatusCode, location: &str) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    match HeaderValue::from_str(location) {
        Ok(value) => {
            response.headers_mut().insert(header::LOCATION, value);
        }
        Err(_) => {
            tracing::warn!(location = %location, "Redirect target is not a valid header value");
            *response.status_mut() = StatusCode::BAD_GATEWAY;
        }
    }
    response
}

fn not_modified_response(token: &str) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NOT_MODIFIED;
    set_header(&mut response, header::ETAG.as_str(), &etag_value(token));
    set_header(&mut response, header::CACHE_CONTROL.as_str(), "no-cache");
    response
}

/// Turn a recorded cache entry back into a live response.
fn replay_cached(cached: CachedResponse, token: &str, prefix: &str) -> Response {
    match cached {
        CachedResponse::Redirect { status, location } => {
            let mut response = redirect_response(status, &location);
            set_header(
                &mut response,
                &format!("{prefix}server-cache"),
                &format!("hit {token}"),
            );
            response
        }
        CachedResponse::Content { headers, body } => {
            let mut response = Response::new(Body::from(body));
            *response.status_mut() = StatusCode::OK;
            for (name, value) in headers {
                // The fingerprint is reapplied as the ETag below.
                if name.eq_ignore_ascii_case("etag") {
                    continue;
                }
                set_header(&mut response, &name, &value);
            }
            set_header(&mut response, header::ETAG.as_str(), &etag_value(token));
            set_header(
                &mut response,
                &format!("{prefix}server-cache"),
                &format!("hit {token}"),
            );
            response
        }
    }
}

fn apply_identity_headers(response: &mut Response, prefix: &str, context: &ResolvedContext) {
    set_header(response, &format!("{prefix}app-id"), &context.app.app_id);
    set_header(
        response,
        &format!("{prefix}version-id"),
        &context.version.version_id,
    );
    if let Some(name) = &context.version.name {
        set_header(response, &format!("{prefix}version-name"), name);
    }
}

/// Insert a header, dropping it (with a log line) if the name or value is
/// not representable.
fn set_header(response: &mut Response, name: &str, value: &str) {
    match (
        HeaderName::try_from(name),
        HeaderValue::from_str(value),
    ) {
        (Ok(name), Ok(value)) => {
            response.headers_mut().insert(name, value);
        }
        _ => {
            tracing::debug!(header = %name, "Skipping unrepresentable response header");
        }
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        return;
    }
    tracing::info!("Shutdown signal received");
}
