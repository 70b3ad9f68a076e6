//! Tenant resolution against the directory.
//!
//! # Responsibilities
//! - Resolve platform subdomains by tenant name
//! - Resolve custom domains through the ordered lookup cascade
//! - Produce redirect descriptors (www/apex canonicalization, catch-all,
//!   SSL enforcement) instead of contexts where required
//!
//! # Design Decisions
//! - The custom-domain cascade is an explicit ordered strategy list,
//!   evaluated sequentially, first hit wins
//! - Lookups stay sequential: at most one strategy can match, and domain
//!   lookups are billed per call
//! - SSL enforcement happens here, before any cache write can occur, and
//!   its redirect is marked non-cacheable

use std::sync::Arc;

use axum::http::StatusCode;
use url::Url;

use crate::config::PlatformConfig;
use crate::directory::types::TenantApp;
use crate::directory::TenantDirectory;
use crate::error::EdgeError;
use crate::resolver::context::SubdomainKind;
use crate::resolver::host::{classify, HostClass, APEX_MARKER, WILDCARD_MARKER};

/// Request facts the resolver needs beyond the hostname.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    /// Whether the client connection is https (from `x-forwarded-proto`).
    pub secure: bool,
    /// Original path plus query string, starting with `/`.
    pub path_and_query: String,
}

impl RequestMeta {
    fn scheme(&self) -> &'static str {
        if self.secure {
            "https"
        } else {
            "http"
        }
    }
}

/// A redirect decided during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectDescriptor {
    pub status: StatusCode,
    pub location: String,
    /// SSL-enforcement redirects are never persisted.
    pub cacheable: bool,
}

/// A tenant match, before version selection.
#[derive(Debug, Clone)]
pub struct ResolvedTenant {
    pub app: TenantApp,
    pub environment: String,
    pub virtual_host: String,
    pub subdomain_kind: SubdomainKind,
    pub sub_domain: String,
    pub apex_domain: String,
}

/// Outcome of host resolution.
#[derive(Debug, Clone)]
pub enum HostResolution {
    Tenant(ResolvedTenant),
    Redirect(RedirectDescriptor),
}

/// Ordered custom-domain lookup strategies for a plain subdomain.
#[derive(Debug, Clone, Copy)]
enum CustomStrategy {
    Exact,
    Wildcard,
    ApexFallback,
}

const CUSTOM_CASCADE: [CustomStrategy; 3] = [
    CustomStrategy::Exact,
    CustomStrategy::Wildcard,
    CustomStrategy::ApexFallback,
];

/// Resolves hostnames to tenants using the injected directory.
pub struct HostResolver {
    directory: Arc<dyn TenantDirectory>,
    platform: PlatformConfig,
}

impl HostResolver {
    pub fn new(directory: Arc<dyn TenantDirectory>, platform: PlatformConfig) -> Self {
        Self {
            directory,
            platform,
        }
    }

    /// Resolve an already-normalized (lowercased, port-stripped) hostname.
    pub async fn resolve(
        &self,
        hostname: &str,
        meta: &RequestMeta,
    ) -> Result<HostResolution, EdgeError> {
        match classify(hostname, &self.platform.base_domain) {
            HostClass::Platform {
                app_name,
                environment,
            } => self.resolve_platform(hostname, &app_name, environment, meta).await,
            HostClass::Custom {
                apex,
                subdomain,
                environment,
            } => {
                self.resolve_custom(hostname, &apex, &subdomain, environment, meta)
                    .await
            }
        }
    }

    async fn resolve_platform(
        &self,
        hostname: &str,
        app_name: &str,
        environment: Option<String>,
        meta: &RequestMeta,
    ) -> Result<HostResolution, EdgeError> {
        let Some(app) = self.directory.get_by_name(app_name).await? else {
            return Err(EdgeError::TenantNotFound);
        };
        let environment =
            environment.unwrap_or_else(|| self.platform.default_environment.clone());
        let virtual_host = format!("{}.{}", app_name, self.platform.base_domain);
        self.finish(
            hostname,
            meta,
            ResolvedTenant {
                app,
                environment,
                virtual_host,
                subdomain_kind: SubdomainKind::Platform,
                sub_domain: app_name.to_string(),
                apex_domain: self.platform.base_domain.clone(),
            },
        )
    }

    async fn resolve_custom(
        &self,
        hostname: &str,
        apex: &str,
        subdomain: &str,
        environment: Option<String>,
        meta: &RequestMeta,
    ) -> Result<HostResolution, EdgeError> {
        // Apex request: try the apex binding, then canonicalize to www.
        if subdomain == APEX_MARKER {
            if let Some(app) = self.directory.get_by_domain(apex, APEX_MARKER).await? {
                let environment = self.platform.default_environment.clone();
                return self.finish(
                    hostname,
                    meta,
                    ResolvedTenant {
                        app,
                        environment,
                        virtual_host: apex.to_string(),
                        subdomain_kind: SubdomainKind::Apex,
                        sub_domain: APEX_MARKER.to_string(),
                        apex_domain: apex.to_string(),
                    },
                );
            }
            if self.directory.get_by_domain(apex, "www").await?.is_some() {
                return Ok(HostResolution::Redirect(RedirectDescriptor {
                    status: StatusCode::FOUND,
                    location: format!("{}://www.{}{}", meta.scheme(), apex, meta.path_and_query),
                    cacheable: true,
                }));
            }
            return self.catch_all(apex, meta).await;
        }

        // Explicit environment segment: one direct lookup, no cascading.
        if let Some(environment) = environment {
            if let Some(app) = self.directory.get_by_domain(apex, subdomain).await? {
                let virtual_host = format!("{subdomain}.{apex}");
                return self.finish(
                    hostname,
                    meta,
                    ResolvedTenant {
                        app,
                        environment,
                        virtual_host,
                        subdomain_kind: SubdomainKind::Exact,
                        sub_domain: subdomain.to_string(),
                        apex_domain: apex.to_string(),
                    },
                );
            }
            return self.catch_all(apex, meta).await;
        }

        // Plain subdomain: ordered cascade, first hit wins.
        for strategy in CUSTOM_CASCADE {
            match strategy {
                CustomStrategy::Exact => {
                    if let Some(app) = self.directory.get_by_domain(apex, subdomain).await? {
                        let environment = self.platform.default_environment.clone();
                        return self.finish(
                            hostname,
                            meta,
                            ResolvedTenant {
                                app,
                                environment,
                                virtual_host: hostname.to_string(),
                                subdomain_kind: SubdomainKind::Exact,
                                sub_domain: subdomain.to_string(),
                                apex_domain: apex.to_string(),
                            },
                        );
                    }
                }
                CustomStrategy::Wildcard => {
                    if let Some(app) = self.directory.get_by_domain(apex, WILDCARD_MARKER).await? {
                        let environment = self.platform.default_environment.clone();
                        return self.finish(
                            hostname,
                            meta,
                            ResolvedTenant {
                                app,
                                environment,
                                virtual_host: hostname.to_string(),
                                subdomain_kind: SubdomainKind::Wildcard,
                                sub_domain: WILDCARD_MARKER.to_string(),
                                apex_domain: apex.to_string(),
                            },
                        );
                    }
                }
                CustomStrategy::ApexFallback => {
                    if let Some(app) = self.directory.get_by_domain(apex, APEX_MARKER).await? {
                        // www canonicalizes down to the apex; any other
                        // subdomain is read as an environment name on the
                        // apex tenant.
                        if subdomain == "www" {
                            return Ok(HostResolution::Redirect(RedirectDescriptor {
                                status: StatusCode::FOUND,
                                location: format!(
                                    "{}://{}{}",
                                    meta.scheme(),
                                    apex,
                                    meta.path_and_query
                                ),
                                cacheable: true,
                            }));
                        }
                        return self.finish(
                            hostname,
                            meta,
                            ResolvedTenant {
                                app,
                                environment: subdomain.to_string(),
                                virtual_host: apex.to_string(),
                                subdomain_kind: SubdomainKind::Apex,
                                sub_domain: APEX_MARKER.to_string(),
                                apex_domain: apex.to_string(),
                            },
                        );
                    }
                }
            }
        }

        self.catch_all(apex, meta).await
    }

    /// Domain-level catch-all redirect, the last resort before NotFound.
    async fn catch_all(
        &self,
        apex: &str,
        meta: &RequestMeta,
    ) -> Result<HostResolution, EdgeError> {
        let record = self.directory.get_domain(apex).await?;
        let Some(target) = record.and_then(|r| r.catch_all_redirect) else {
            return Err(EdgeError::TenantNotFound);
        };

        // Preserve path+query only when the target has no path of its own.
        let location = match Url::parse(&target) {
            Ok(url) if url.path() == "/" && url.query().is_none() => {
                format!("{}{}", target.trim_end_matches('/'), meta.path_and_query)
            }
            _ => target,
        };

        Ok(HostResolution::Redirect(RedirectDescriptor {
            status: StatusCode::FOUND,
            location,
            cacheable: true,
        }))
    }

    /// Common tail for every tenant match: environment whitelist, then SSL
    /// enforcement.
    fn finish(
        &self,
        hostname: &str,
        meta: &RequestMeta,
        tenant: ResolvedTenant,
    ) -> Result<HostResolution, EdgeError> {
        if !tenant.app.permits_environment(&tenant.environment) {
            return Err(EdgeError::InvalidEnvironment(tenant.environment));
        }

        if tenant.app.require_ssl && !meta.secure {
            let location = tenant
                .app
                .environment_urls
                .get(&tenant.environment)
                .cloned()
                .or_else(|| tenant.app.canonical_url.clone())
                .unwrap_or_else(|| format!("https://{}{}", hostname, meta.path_and_query));
            return Ok(HostResolution::Redirect(RedirectDescriptor {
                status: StatusCode::MOVED_PERMANENTLY,
                location,
                cacheable: false,
            }));
        }

        Ok(HostResolution::Tenant(tenant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::memory::InMemoryDirectory;
    use crate::directory::types::{DomainBinding, DomainRecord};

    fn platform() -> PlatformConfig {
        PlatformConfig {
            base_domain: "apps.example.com".into(),
            ..PlatformConfig::default()
        }
    }

    fn meta() -> RequestMeta {
        RequestMeta {
            secure: false,
            path_and_query: "/docs?page=2".into(),
        }
    }

    fn app(name: &str, domain: Option<(&str, &str)>) -> TenantApp {
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

    fn resolver(directory: InMemoryDirectory) -> HostResolver {
        HostResolver::new(Arc::new(directory), platform())
    }

    fn expect_tenant(resolution: HostResolution) -> ResolvedTenant {
        match resolution {
            HostResolution::Tenant(t) => t,
            HostResolution::Redirect(r) => panic!("expected tenant, got redirect to {}", r.location),
        }
    }

    fn expect_redirect(resolution: HostResolution) -> RedirectDescriptor {
        match resolution {
            HostResolution::Redirect(r) => r,
            HostResolution::Tenant(t) => panic!("expected redirect, got tenant {}", t.app.name),
        }
    }

    #[tokio::test]
    async fn test_platform_default_environment() {
        let dir = InMemoryDirectory::new();
        dir.insert_app(app("blog", None));
        let r = resolver(dir);

        let t = expect_tenant(r.resolve("blog.apps.example.com", &meta()).await.unwrap());
        assert_eq!(t.environment, "production");
        assert_eq!(t.virtual_host, "blog.apps.example.com");
        assert_eq!(t.subdomain_kind, SubdomainKind::Platform);
    }

    #[tokio::test]
    async fn test_platform_environment_segment_strips_from_virtual_host() {
        let dir = InMemoryDirectory::new();
        dir.insert_app(app("blog", None));
        let r = resolver(dir);

        let t = expect_tenant(
            r.resolve("blog--staging.apps.example.com", &meta())
                .await
                .unwrap(),
        );
        assert_eq!(t.environment, "staging");
        assert_eq!(t.virtual_host, "blog.apps.example.com");
    }

    #[tokio::test]
    async fn test_unknown_platform_name_is_not_found() {
        let r = resolver(InMemoryDirectory::new());
        let err = r
            .resolve("ghost.apps.example.com", &meta())
            .await
            .unwrap_err();
        assert!(matches!(err, EdgeError::TenantNotFound));
    }

    #[tokio::test]
    async fn test_exact_beats_wildcard() {
        let dir = InMemoryDirectory::new();
        dir.insert_app(app("wild", Some(("example.org", "*"))));
        dir.insert_app(app("shop", Some(("example.org", "shop"))));
        let r = resolver(dir);

        let t = expect_tenant(r.resolve("shop.example.org", &meta()).await.unwrap());
        assert_eq!(t.app.name, "shop");
        assert_eq!(t.subdomain_kind, SubdomainKind::Exact);
    }

    #[tokio::test]
    async fn test_wildcard_matches_unknown_subdomain() {
        let dir = InMemoryDirectory::new();
        dir.insert_app(app("wild", Some(("example.org", "*"))));
        let r = resolver(dir);

        let t = expect_tenant(r.resolve("anything.example.org", &meta()).await.unwrap());
        assert_eq!(t.app.name, "wild");
        assert_eq!(t.subdomain_kind, SubdomainKind::Wildcard);
        assert_eq!(t.sub_domain, "*");
    }

    #[tokio::test]
    async fn test_apex_redirects_to_www_when_only_www_bound() {
        let dir = InMemoryDirectory::new();
        dir.insert_app(app("site", Some(("example.org", "www"))));
        let r = resolver(dir);

        let redirect = expect_redirect(r.resolve("example.org", &meta()).await.unwrap());
        assert_eq!(redirect.status, StatusCode::FOUND);
        assert_eq!(redirect.location, "http://www.example.org/docs?page=2");
        assert!(redirect.cacheable);
    }

    #[tokio::test]
    async fn test_www_redirects_to_apex_tenant() {
        let dir = InMemoryDirectory::new();
        dir.insert_app(app("site", Some(("example.org", "@"))));
        let r = resolver(dir);

        let redirect = expect_redirect(r.resolve("www.example.org", &meta()).await.unwrap());
        assert_eq!(redirect.location, "http://example.org/docs?page=2");
        assert!(redirect.cacheable);
    }

    #[tokio::test]
    async fn test_unknown_subdomain_becomes_environment_on_apex_tenant() {
        let dir = InMemoryDirectory::new();
        dir.insert_app(app("site", Some(("example.org", "@"))));
        let r = resolver(dir);

        let t = expect_tenant(r.resolve("staging.example.org", &meta()).await.unwrap());
        assert_eq!(t.environment, "staging");
        assert_eq!(t.virtual_host, "example.org");
        assert_eq!(t.subdomain_kind, SubdomainKind::Apex);
    }

    #[tokio::test]
    async fn test_environment_segment_skips_cascade() {
        let dir = InMemoryDirectory::new();
        dir.insert_app(app("wild", Some(("example.org", "*"))));
        let r = resolver(dir);

        // shop--staging looks up (example.org, shop) directly; the
        // wildcard binding must not be consulted.
        let err = r
            .resolve("shop--staging.example.org", &meta())
            .await
            .unwrap_err();
        assert!(matches!(err, EdgeError::TenantNotFound));
    }

    #[tokio::test]
    async fn test_catch_all_preserves_path_for_bare_target() {
        let dir = InMemoryDirectory::new();
        dir.insert_domain(DomainRecord {
            name: "example.org".into(),
            catch_all_redirect: Some("https://landing.example.net".into()),
        });
        let r = resolver(dir);

        let redirect = expect_redirect(r.resolve("nope.example.org", &meta()).await.unwrap());
        assert_eq!(
            redirect.location,
            "https://landing.example.net/docs?page=2"
        );
    }

    #[tokio::test]
    async fn test_catch_all_with_own_path_drops_request_path() {
        let dir = InMemoryDirectory::new();
        dir.insert_domain(DomainRecord {
            name: "example.org".into(),
            catch_all_redirect: Some("https://landing.example.net/welcome".into()),
        });
        let r = resolver(dir);

        let redirect = expect_redirect(r.resolve("nope.example.org", &meta()).await.unwrap());
        assert_eq!(redirect.location, "https://landing.example.net/welcome");
    }

    #[tokio::test]
    async fn test_require_ssl_redirects_before_anything_else() {
        let dir = InMemoryDirectory::new();
        let mut a = app("secure", Some(("example.org", "@")));
        a.require_ssl = true;
        a.canonical_url = Some("https://example.org".into());
        dir.insert_app(a);
        let r = resolver(dir);

        let redirect = expect_redirect(r.resolve("example.org", &meta()).await.unwrap());
        assert_eq!(redirect.status, StatusCode::MOVED_PERMANENTLY);
        assert_eq!(redirect.location, "https://example.org");
        assert!(!redirect.cacheable);
    }

    #[tokio::test]
    async fn test_require_ssl_prefers_environment_url() {
        let dir = InMemoryDirectory::new();
        let mut a = app("secure", None);
        a.require_ssl = true;
        a.environment_urls
            .insert("staging".into(), "https://staging.secure.example".into());
        a.canonical_url = Some("https://secure.example".into());
        dir.insert_app(a);
        let r = resolver(dir);

        let redirect = expect_redirect(
            r.resolve("secure--staging.apps.example.com", &meta())
                .await
                .unwrap(),
        );
        assert_eq!(redirect.location, "https://staging.secure.example");
    }

    #[tokio::test]
    async fn test_secure_request_skips_ssl_redirect() {
        let dir = InMemoryDirectory::new();
        let mut a = app("secure", Some(("example.org", "@")));
        a.require_ssl = true;
        dir.insert_app(a);
        let r = resolver(dir);

        let secure_meta = RequestMeta {
            secure: true,
            path_and_query: "/".into(),
        };
        expect_tenant(r.resolve("example.org", &secure_meta).await.unwrap());
    }

    #[tokio::test]
    async fn test_environment_whitelist_enforced() {
        let dir = InMemoryDirectory::new();
        let mut a = app("blog", None);
        a.environments = Some(vec!["production".into()]);
        dir.insert_app(a);
        let r = resolver(dir);

        let err = r
            .resolve("blog--staging.apps.example.com", &meta())
            .await
            .unwrap_err();
        assert!(matches!(err, EdgeError::InvalidEnvironment(env) if env == "staging"));
    }
}
