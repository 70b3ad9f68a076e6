//! File-backed tenant fixture with hot reload.
//!
//! Stands in for the control plane in single-node deployments and local
//! runs: apps, versions and domain records are declared in a TOML file
//! which is reloaded whenever it changes, so tenant configuration can move
//! underneath live traffic without a restart.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use thiserror::Error;

use crate::directory::memory::InMemoryDirectory;
use crate::directory::types::{DeployedVersion, DomainRecord, TenantApp};
use crate::directory::{DirectoryError, TenantDirectory, VersionDirectory};

/// Errors loading a tenant fixture file.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read tenant fixture: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse tenant fixture: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionEntry {
    app_id: String,
    #[serde(flatten)]
    version: DeployedVersion,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct TenantsFile {
    apps: Vec<TenantApp>,
    versions: Vec<VersionEntry>,
    domains: Vec<DomainRecord>,
}

/// Parse a fixture file into a fresh in-memory directory.
pub fn load_fixture(path: &Path) -> Result<InMemoryDirectory, FixtureError> {
    let content = std::fs::read_to_string(path)?;
    let file: TenantsFile = toml::from_str(&content)?;

    let directory = InMemoryDirectory::new();
    for app in file.apps {
        directory.insert_app(app);
    }
    for entry in file.versions {
        directory.insert_version(&entry.app_id, entry.version);
    }
    for record in file.domains {
        directory.insert_domain(record);
    }
    Ok(directory)
}

/// A directory whose backing snapshot is swapped atomically on reload.
pub struct WatchedDirectory {
    inner: ArcSwap<InMemoryDirectory>,
    path: PathBuf,
}

impl WatchedDirectory {
    /// Load the fixture once; reloads are driven by [`WatchedDirectory::watch`].
    pub fn open(path: &Path) -> Result<Arc<Self>, FixtureError> {
        let initial = load_fixture(path)?;
        tracing::info!(
            path = %path.display(),
            apps = initial.app_count(),
            "Tenant fixture loaded"
        );
        Ok(Arc::new(Self {
            inner: ArcSwap::from_pointee(initial),
            path: path.to_path_buf(),
        }))
    }

    /// Start watching the fixture file for changes.
    ///
    /// A failed reload keeps the current snapshot; live traffic never
    /// observes a half-loaded directory. The returned watcher must be kept
    /// alive for events to fire.
    pub fn watch(self: Arc<Self>) -> Result<RecommendedWatcher, notify::Error> {
        let watch_path = self.path.clone();
        let path = self.path.clone();
        let this = self;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        match load_fixture(&path) {
                            Ok(fresh) => {
                                tracing::info!(
                                    apps = fresh.app_count(),
                                    "Tenant fixture change detected, snapshot swapped"
                                );
                                this.inner.store(Arc::new(fresh));
                            }
                            Err(e) => {
                                tracing::error!(
                                    error = %e,
                                    "Failed to reload tenant fixture, keeping current snapshot"
                                );
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Tenant fixture watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&watch_path, RecursiveMode::NonRecursive)?;
        tracing::info!(path = %watch_path.display(), "Tenant fixture watcher started");
        Ok(watcher)
    }
}

#[async_trait]
impl TenantDirectory for WatchedDirectory {
    async fn get_by_name(&self, name: &str) -> Result<Option<TenantApp>, DirectoryError> {
        self.inner.load().get_by_name(name).await
    }

    async fn get_by_domain(
        &self,
        domain: &str,
        subdomain: &str,
    ) -> Result<Option<TenantApp>, DirectoryError> {
        self.inner.load().get_by_domain(domain, subdomain).await
    }

    async fn get_domain(&self, domain: &str) -> Result<Option<DomainRecord>, DirectoryError> {
        self.inner.load().get_domain(domain).await
    }
}

#[async_trait]
impl VersionDirectory for WatchedDirectory {
    async fn get_version(
        &self,
        app_id: &str,
        version_id: &str,
    ) -> Result<Option<DeployedVersion>, DirectoryError> {
        self.inner.load().get_version(app_id, version_id).await
    }

    async fn most_recent_version(
        &self,
        app_id: &str,
    ) -> Result<Option<DeployedVersion>, DirectoryError> {
        self.inner.load().most_recent_version(app_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FIXTURE: &str = r#"
[[apps]]
appId = "app-1"
name = "blog"

[[apps]]
appId = "app-2"
name = "shop"
requireSsl = true

[apps.domain]
domain = "shop.example"
subdomain = "@"

[[versions]]
appId = "app-1"
versionId = "v1"
name = "first"

[[domains]]
name = "shop.example"
catchAllRedirect = "https://shop.example"
"#;

    #[tokio::test]
    async fn test_fixture_roundtrip() {
        let mut tmp = std::env::temp_dir();
        tmp.push(format!("tenants-fixture-{}.toml", uuid::Uuid::new_v4()));
        let mut f = std::fs::File::create(&tmp).unwrap();
        f.write_all(FIXTURE.as_bytes()).unwrap();

        let dir = load_fixture(&tmp).unwrap();
        assert_eq!(dir.app_count(), 2);
        let shop = dir.get_by_domain("shop.example", "@").await.unwrap().unwrap();
        assert!(shop.require_ssl);
        let v = dir.most_recent_version("app-1").await.unwrap().unwrap();
        assert_eq!(v.version_id, "v1");
        assert!(dir.get_domain("shop.example").await.unwrap().is_some());

        std::fs::remove_file(&tmp).unwrap_or_default();
    }
}
