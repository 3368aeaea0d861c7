use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;

use carebridge_core::{ClinicalResource, CoreError, ResourceKind, Result, validate_id};

use crate::traits::ResourceStore;

fn storage_key(kind: ResourceKind, id: &str) -> String {
    format!("{kind}/{id}")
}

/// In-memory reference backend.
///
/// Current records live in a concurrent map keyed `"Kind/id"`; every stored
/// state is also appended to a version log guarded by an async `RwLock`, so
/// version reads never race a concurrent put.
#[derive(Debug, Default)]
pub struct MemoryStore {
    live: DashMap<String, ClinicalResource>,
    versions: RwLock<HashMap<String, Vec<ClinicalResource>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn get(&self, kind: ResourceKind, id: &str) -> Result<Option<ClinicalResource>> {
        Ok(self
            .live
            .get(&storage_key(kind, id))
            .map(|entry| entry.value().clone()))
    }

    async fn put(&self, resource: ClinicalResource) -> Result<()> {
        let id = resource
            .id
            .as_deref()
            .ok_or_else(|| CoreError::invalid_resource("resource is missing an id"))?;
        validate_id(id)?;
        if resource.meta.version_id.is_none() {
            return Err(CoreError::invalid_resource(
                "resource is missing meta.versionId",
            ));
        }

        let key = storage_key(resource.kind, id);
        tracing::debug!(key = %key, version = ?resource.meta.version_id, "storing resource");

        let mut log = self.versions.write().await;
        log.entry(key.clone()).or_default().push(resource.clone());
        self.live.insert(key, resource);
        Ok(())
    }

    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<bool> {
        let key = storage_key(kind, id);
        let removed = self.live.remove(&key).is_some();
        if removed {
            tracing::debug!(key = %key, "deleted resource");
        }
        Ok(removed)
    }

    async fn list(&self, kind: ResourceKind) -> Result<Vec<ClinicalResource>> {
        Ok(self
            .live
            .iter()
            .filter(|entry| entry.value().kind == kind)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn get_version(
        &self,
        kind: ResourceKind,
        id: &str,
        version_id: &str,
    ) -> Result<Option<ClinicalResource>> {
        let log = self.versions.read().await;
        Ok(log.get(&storage_key(kind, id)).and_then(|entries| {
            entries
                .iter()
                .find(|r| r.meta.version_id.as_deref() == Some(version_id))
                .cloned()
        }))
    }

    async fn versions(&self, kind: ResourceKind, id: &str) -> Result<Vec<ClinicalResource>> {
        let log = self.versions.read().await;
        Ok(log
            .get(&storage_key(kind, id))
            .map(|entries| entries.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn count(&self, kind: ResourceKind) -> Result<u64> {
        Ok(self
            .live
            .iter()
            .filter(|entry| entry.value().kind == kind)
            .count() as u64)
    }
}
