//! In-memory directory backend.
//!
//! Serves two roles: the unit/integration test fixture, and the live
//! backend behind the file-based fixture loader (`directory::file`). All
//! maps are concurrent so a reload can repopulate while requests read.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::directory::types::{DeployedVersion, DomainRecord, TenantApp};
use crate::directory::{DirectoryError, TenantDirectory, VersionDirectory};

/// Directory backend holding all records in process memory.
#[derive(Default)]
pub struct InMemoryDirectory {
    apps_by_name: DashMap<String, TenantApp>,
    /// `(domain, subdomain)` → app name.
    domain_index: DashMap<(String, String), String>,
    domains: DashMap<String, DomainRecord>,
    /// App id → versions in deployment order (most recent last).
    versions: DashMap<String, Vec<DeployedVersion>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an app, indexing its domain binding if present.
    pub fn insert_app(&self, app: TenantApp) {
        if let Some(binding) = &app.domain {
            self.domain_index.insert(
                (binding.domain.to_lowercase(), binding.subdomain.to_lowercase()),
                app.name.clone(),
            );
        }
        self.apps_by_name.insert(app.name.clone(), app);
    }

    /// Register a deployed version for an app. Insertion order is
    /// deployment order.
    pub fn insert_version(&self, app_id: &str, version: DeployedVersion) {
        self.versions
            .entry(app_id.to_string())
            .or_default()
            .push(version);
    }

    /// Register a custom-domain record.
    pub fn insert_domain(&self, record: DomainRecord) {
        self.domains.insert(record.name.to_lowercase(), record);
    }

    /// Number of registered apps.
    pub fn app_count(&self) -> usize {
        self.apps_by_name.len()
    }
}

#[async_trait]
impl TenantDirectory for InMemoryDirectory {
    async fn get_by_name(&self, name: &str) -> Result<Option<TenantApp>, DirectoryError> {
        Ok(self.apps_by_name.get(name).map(|a| a.value().clone()))
    }

    async fn get_by_domain(
        &self,
        domain: &str,
        subdomain: &str,
    ) -> Result<Option<TenantApp>, DirectoryError> {
        let key = (domain.to_lowercase(), subdomain.to_lowercase());
        let Some(name) = self.domain_index.get(&key).map(|n| n.value().clone()) else {
            return Ok(None);
        };
        Ok(self.apps_by_name.get(&name).map(|a| a.value().clone()))
    }

    async fn get_domain(&self, domain: &str) -> Result<Option<DomainRecord>, DirectoryError> {
        Ok(self
            .domains
            .get(&domain.to_lowercase())
            .map(|d| d.value().clone()))
    }
}

#[async_trait]
impl VersionDirectory for InMemoryDirectory {
    async fn get_version(
        &self,
        app_id: &str,
        version_id: &str,
    ) -> Result<Option<DeployedVersion>, DirectoryError> {
        Ok(self.versions.get(app_id).and_then(|versions| {
            versions
                .iter()
                .find(|v| v.version_id == version_id)
                .cloned()
        }))
    }

    async fn most_recent_version(
        &self,
        app_id: &str,
    ) -> Result<Option<DeployedVersion>, DirectoryError> {
        Ok(self
            .versions
            .get(app_id)
            .and_then(|versions| versions.last().cloned()))
    }
}
