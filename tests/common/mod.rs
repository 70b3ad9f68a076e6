//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use tokio::net::TcpListener;

use edge_gateway::cache::store::MemoryStore;
use edge_gateway::config::EdgeConfig;
use edge_gateway::directory::{
    DeployedVersion, DirectoryError, DomainBinding, DomainRecord, InMemoryDirectory,
    TenantApp, TenantDirectory, VersionDirectory,
};
use edge_gateway::lifecycle::Shutdown;
use edge_gateway::render::{RenderError, Renderer};
use edge_gateway::resolver::ResolvedContext;
use edge_gateway::EdgeServer;

pub const BASE_DOMAIN: &str = "apps.example.test";

/// Config with an in-memory store and metrics disabled.
pub fn test_config() -> EdgeConfig {
    let mut config = EdgeConfig::default();
    config.platform.base_domain = BASE_DOMAIN.to_string();
    config.observability.metrics_enabled = false;
    config
}

/// A minimal app record for fixtures.
pub fn app(name: &str, domain: Option<(&str, &str)>) -> TenantApp {
    TenantApp {
        app_id: format!("id-{name}"),
        name: name.to_string(),
        environments: None,
        domain: domain.map(|(d, s)| DomainBinding {
            domain: d.to_string(),
            subdomain: s.to_string(),
        }),
        org: None,
        require_ssl: false,
        canonical_url: None,
        environment_urls: Default::default(),
        env: None,
        traffic_rules: None,
    }
}

pub fn version(id: &str) -> DeployedVersion {
    DeployedVersion {
        version_id: id.to_string(),
        name: Some(format!("{id}-name")),
        manifest: serde_json::Value::Null,
    }
}

pub fn domain_record(name: &str, catch_all: Option<&str>) -> DomainRecord {
    DomainRecord {
        name: name.to_string(),
        catch_all_redirect: catch_all.map(str::to_string),
    }
}

/// Renderer stub that counts invocations and echoes the resolved version.
pub struct StubRenderer {
    pub status: StatusCode,
    pub location: Option<String>,
    pub calls: AtomicU32,
}

impl StubRenderer {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            status: StatusCode::OK,
            location: None,
            calls: AtomicU32::new(0),
        })
    }

    pub fn redirect(location: &str) -> Arc<Self> {
        Arc::new(Self {
            status: StatusCode::FOUND,
            location: Some(location.to_string()),
            calls: AtomicU32::new(0),
        })
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Renderer for StubRenderer {
    async fn render(
        &self,
        ctx: &ResolvedContext,
        _request: Request<Body>,
    ) -> Result<Response, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut builder = Response::builder()
            .status(self.status)
            .header(header::CONTENT_TYPE, "text/html");
        if let Some(location) = &self.location {
            builder = builder.header(header::LOCATION, location.clone());
        }
        let body = if self.status == StatusCode::OK {
            Body::from(format!("rendered {}", ctx.version.version_id))
        } else {
            Body::empty()
        };
        Ok(builder.body(body).expect("static response"))
    }
}

/// Directory wrapper counting lookup calls, for cache-memoization
/// assertions.
pub struct CountingDirectory {
    inner: Arc<InMemoryDirectory>,
    pub name_lookups: AtomicU32,
    pub domain_lookups: AtomicU32,
}

impl CountingDirectory {
    pub fn new(inner: Arc<InMemoryDirectory>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            name_lookups: AtomicU32::new(0),
            domain_lookups: AtomicU32::new(0),
        })
    }

    pub fn total_lookups(&self) -> u32 {
        self.name_lookups.load(Ordering::SeqCst) + self.domain_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TenantDirectory for CountingDirectory {
    async fn get_by_name(&self, name: &str) -> Result<Option<TenantApp>, DirectoryError> {
        self.name_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.get_by_name(name).await
    }

    async fn get_by_domain(
        &self,
        domain: &str,
        subdomain: &str,
    ) -> Result<Option<TenantApp>, DirectoryError> {
        self.domain_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.get_by_domain(domain, subdomain).await
    }

    async fn get_domain(&self, domain: &str) -> Result<Option<DomainRecord>, DirectoryError> {
        self.inner.get_domain(domain).await
    }
}

/// A running gateway plus handles to everything the tests poke at.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub store: Arc<MemoryStore>,
    shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Spawn a gateway on an ephemeral port.
pub async fn spawn_gateway(
    config: EdgeConfig,
    tenants: Arc<dyn TenantDirectory>,
    versions: Arc<dyn VersionDirectory>,
    renderer: Arc<dyn Renderer>,
) -> TestGateway {
    let store = Arc::new(MemoryStore::new());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = EdgeServer::new(config, tenants, versions, store.clone(), renderer);
    let shutdown = Shutdown::new();
    let signal = shutdown.listener();
    tokio::spawn(async move {
        server.run_until(listener, signal.wait()).await.unwrap();
    });

    TestGateway {
        addr,
        store,
        shutdown,
    }
}

/// Client that never follows redirects; virtual hosts are addressed via
/// an explicit Host header.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

pub async fn get(gateway: &TestGateway, host: &str, path: &str) -> reqwest::Response {
    client()
        .get(gateway.url(path))
        .header("host", host)
        .send()
        .await
        .unwrap()
}

/// Give the detached recorder task time to persist.
pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
}
