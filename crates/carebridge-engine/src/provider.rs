use std::sync::Arc;

use serde_json::Value;

use carebridge_core::{
    Bundle, ClinicalResource, CoreError, ResourceKind, Result, generate_id, validate_id,
};
use carebridge_storage::ResourceStore;

use crate::links::add_navigation_links;
use crate::search::{SearchParams, matches, sort_resources};

/// Typed CRUD/search/history over one resource kind, backed by an injectable
/// store.
///
/// A provider instance is pinned to a kind at construction; envelopes of any
/// other kind are rejected. Version stamping (`meta.versionId`) and
/// `lastUpdated` refreshing happen here, never in the store.
pub struct ResourceProvider {
    kind: ResourceKind,
    store: Arc<dyn ResourceStore>,
    base_url: String,
}

impl ResourceProvider {
    pub fn new(kind: ResourceKind, store: Arc<dyn ResourceStore>) -> Self {
        Self {
            kind,
            store,
            base_url: String::new(),
        }
    }

    /// Prefix for navigation-link URLs, e.g. `https://app.example.org/fhir`.
    /// Links are origin-relative when unset.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn check_kind(&self, resource: &ClinicalResource) -> Result<()> {
        if resource.kind == self.kind {
            Ok(())
        } else {
            Err(CoreError::kind_mismatch(
                self.kind.as_str(),
                resource.kind.as_str(),
            ))
        }
    }

    /// Create a resource: assigns an id when absent, stamps version `"1"`
    /// and a fresh `lastUpdated`. Fails with a conflict when the caller
    /// supplied an id that already exists.
    pub async fn create(&self, mut resource: ClinicalResource) -> Result<ClinicalResource> {
        self.check_kind(&resource)?;
        match resource.id.as_deref() {
            Some(id) => {
                validate_id(id)?;
                if self.store.get(self.kind, id).await?.is_some() {
                    return Err(CoreError::resource_conflict(self.kind.as_str(), id));
                }
            }
            None => resource.id = Some(generate_id()),
        }
        resource.meta.version_id = Some("1".to_string());
        resource.meta.touch();

        self.store.put(resource.clone()).await?;
        tracing::debug!(kind = %self.kind, id = ?resource.id, "created resource");
        Ok(resource)
    }

    pub async fn read(&self, id: &str) -> Result<Option<ClinicalResource>> {
        self.store.get(self.kind, id).await
    }

    /// Read a specific retained version, or `None` when the id or version is
    /// unknown.
    pub async fn vread(&self, id: &str, version_id: &str) -> Result<Option<ClinicalResource>> {
        self.store.get_version(self.kind, id, version_id).await
    }

    /// Replace a resource: the id must already exist (never creates), the
    /// version is bumped to the next integer and `lastUpdated` refreshed.
    pub async fn update(&self, id: &str, mut resource: ClinicalResource) -> Result<ClinicalResource> {
        self.check_kind(&resource)?;
        if let Some(body_id) = resource.id.as_deref()
            && body_id != id
        {
            return Err(CoreError::invalid_resource(format!(
                "body id '{body_id}' does not match target id '{id}'"
            )));
        }

        let current = self
            .store
            .get(self.kind, id)
            .await?
            .ok_or_else(|| CoreError::resource_not_found(self.kind.as_str(), id))?;

        let next_version = current
            .meta
            .version_id
            .as_deref()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(1)
            + 1;
        resource.id = Some(id.to_string());
        resource.meta.version_id = Some(next_version.to_string());
        resource.meta.touch();

        self.store.put(resource.clone()).await?;
        tracing::debug!(kind = %self.kind, id, version = next_version, "updated resource");
        Ok(resource)
    }

    /// Shallow-merge a partial body onto the existing resource, then update.
    ///
    /// Only top-level data fields are patchable; `id`, `resourceType` and
    /// `meta` are engine-owned and ignored when present in the partial. A
    /// JSON `null` removes the field (merge-patch convention).
    pub async fn patch(&self, id: &str, partial: Value) -> Result<ClinicalResource> {
        let Value::Object(fields) = partial else {
            return Err(CoreError::invalid_resource("patch body must be a JSON object"));
        };

        let mut merged = self
            .store
            .get(self.kind, id)
            .await?
            .ok_or_else(|| CoreError::resource_not_found(self.kind.as_str(), id))?;
        for (key, value) in fields {
            if matches!(key.as_str(), "id" | "resourceType" | "meta") {
                continue;
            }
            if value.is_null() {
                merged.remove_field(&key);
            } else {
                merged.set_field(key, value);
            }
        }
        self.update(id, merged).await
    }

    /// Hard-delete the current record. The version log is retained, so
    /// `history` and `vread` keep answering for the deleted id.
    pub async fn delete(&self, id: &str) -> Result<()> {
        if self.store.delete(self.kind, id).await? {
            tracing::debug!(kind = %self.kind, id, "deleted resource");
            Ok(())
        } else {
            Err(CoreError::resource_not_found(self.kind.as_str(), id))
        }
    }

    /// All retained versions as a history bundle, newest first. Fails when
    /// the id has never been stored.
    pub async fn history(&self, id: &str) -> Result<Bundle> {
        let versions = self.store.versions(self.kind, id).await?;
        if versions.is_empty() {
            return Err(CoreError::resource_not_found(self.kind.as_str(), id));
        }
        let mut bundle = Bundle::history(versions.len() as u64);
        for version in versions {
            bundle.push(version);
        }
        Ok(bundle)
    }

    /// Filter, sort and paginate the collection into a searchset bundle with
    /// navigation links.
    pub async fn search(&self, params: &SearchParams) -> Result<Bundle> {
        let mut matching: Vec<ClinicalResource> = self
            .store
            .list(self.kind)
            .await?
            .into_iter()
            .filter(|resource| matches(resource, params))
            .collect();
        sort_resources(&mut matching, params.sort());

        let total = matching.len();
        let mut bundle = Bundle::searchset(total as u64);
        for resource in matching
            .into_iter()
            .skip(params.offset())
            .take(params.count())
        {
            bundle.push_match(resource);
        }
        add_navigation_links(
            &mut bundle,
            &self.base_url,
            self.kind.as_str(),
            params,
            total,
        );
        tracing::debug!(
            kind = %self.kind,
            total,
            page = bundle.entry.len(),
            offset = params.offset(),
            "search complete"
        );
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carebridge_storage::MemoryStore;
    use serde_json::json;
    use std::time::Duration;

    fn provider(kind: ResourceKind) -> ResourceProvider {
        ResourceProvider::new(kind, Arc::new(MemoryStore::new()))
    }

    fn patient_body() -> ClinicalResource {
        let mut resource = ClinicalResource::new(ResourceKind::Patient);
        resource.set_field("name", json!([{"family": "Doe", "given": ["Jane"]}]));
        resource.set_field("gender", json!("female"));
        resource.set_field("birthDate", json!("1980-06-01"));
        resource
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_version() {
        let provider = provider(ResourceKind::Patient);
        let created = provider.create(patient_body()).await.unwrap();

        let id = created.id.clone().unwrap();
        assert_eq!(created.meta.version_id.as_deref(), Some("1"));

        let read = provider.read(&id).await.unwrap().unwrap();
        assert_eq!(read, created);
        assert_eq!(read.field("gender"), Some(&json!("female")));
    }

    #[tokio::test]
    async fn test_create_keeps_caller_id() {
        let provider = provider(ResourceKind::Patient);
        let created = provider
            .create(patient_body().with_id("my-patient"))
            .await
            .unwrap();
        assert_eq!(created.id.as_deref(), Some("my-patient"));
    }

    #[tokio::test]
    async fn test_create_conflicts_on_existing_id() {
        let provider = provider(ResourceKind::Patient);
        provider
            .create(patient_body().with_id("dup"))
            .await
            .unwrap();
        let err = provider
            .create(patient_body().with_id("dup"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ResourceConflict { .. }));
    }

    #[tokio::test]
    async fn test_create_rejects_wrong_kind() {
        let provider = provider(ResourceKind::Patient);
        let err = provider
            .create(ClinicalResource::new(ResourceKind::Observation))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::KindMismatch { .. }));
    }

    #[tokio::test]
    async fn test_update_bumps_version_and_timestamp() {
        let provider = provider(ResourceKind::Patient);
        let created = provider.create(patient_body()).await.unwrap();
        let id = created.id.clone().unwrap();
        let created_at = created.meta.last_updated;

        tokio::time::sleep(Duration::from_millis(2)).await;
        let mut changed = created.clone();
        changed.set_field("gender", json!("other"));
        let updated = provider.update(&id, changed).await.unwrap();

        assert_eq!(updated.meta.version_id.as_deref(), Some("2"));
        assert!(updated.meta.last_updated > created_at);

        let read = provider.read(&id).await.unwrap().unwrap();
        assert_eq!(read.field("gender"), Some(&json!("other")));
    }

    #[tokio::test]
    async fn test_update_missing_never_creates() {
        let provider = provider(ResourceKind::Patient);
        let err = provider
            .update("ghost", patient_body())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ResourceNotFound { .. }));
        assert!(provider.read("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_rejects_mismatched_body_id() {
        let provider = provider(ResourceKind::Patient);
        let created = provider.create(patient_body()).await.unwrap();
        let id = created.id.clone().unwrap();

        let err = provider
            .update(&id, patient_body().with_id("someone-else"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidResource { .. }));
    }

    #[tokio::test]
    async fn test_patch_merges_and_bumps() {
        let provider = provider(ResourceKind::Patient);
        let created = provider.create(patient_body()).await.unwrap();
        let id = created.id.clone().unwrap();

        let patched = provider
            .patch(
                &id,
                json!({"gender": "male", "active": true, "id": "hijack", "meta": {"versionId": "99"}}),
            )
            .await
            .unwrap();

        assert_eq!(patched.id.as_deref(), Some(id.as_str()));
        assert_eq!(patched.meta.version_id.as_deref(), Some("2"));
        assert_eq!(patched.field("gender"), Some(&json!("male")));
        assert_eq!(patched.field("active"), Some(&json!(true)));
        // untouched fields survive the merge
        assert_eq!(patched.field("birthDate"), Some(&json!("1980-06-01")));
    }

    #[tokio::test]
    async fn test_patch_null_removes_field() {
        let provider = provider(ResourceKind::Patient);
        let created = provider.create(patient_body()).await.unwrap();
        let id = created.id.clone().unwrap();

        let patched = provider.patch(&id, json!({"birthDate": null})).await.unwrap();
        assert!(patched.field("birthDate").is_none());
    }

    #[tokio::test]
    async fn test_patch_missing_never_creates() {
        let provider = provider(ResourceKind::Patient);
        let err = provider
            .patch("ghost", json!({"gender": "male"}))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ResourceNotFound { .. }));
        assert!(provider.read("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_patch_rejects_non_object() {
        let provider = provider(ResourceKind::Patient);
        let err = provider.patch("any", json!([1, 2])).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidResource { .. }));
    }

    #[tokio::test]
    async fn test_delete_then_read_none() {
        let provider = provider(ResourceKind::Patient);
        let created = provider.create(patient_body()).await.unwrap();
        let id = created.id.clone().unwrap();

        provider.delete(&id).await.unwrap();
        assert!(provider.read(&id).await.unwrap().is_none());

        let err = provider.delete(&id).await.unwrap_err();
        assert!(matches!(err, CoreError::ResourceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_vread_current_and_past_versions() {
        let provider = provider(ResourceKind::Patient);
        let created = provider.create(patient_body()).await.unwrap();
        let id = created.id.clone().unwrap();
        provider.update(&id, patient_body()).await.unwrap();

        let v1 = provider.vread(&id, "1").await.unwrap().unwrap();
        assert_eq!(v1.meta.version_id.as_deref(), Some("1"));
        let v2 = provider.vread(&id, "2").await.unwrap().unwrap();
        assert_eq!(v2.meta.version_id.as_deref(), Some("2"));
        assert!(provider.vread(&id, "3").await.unwrap().is_none());
        assert!(provider.vread("ghost", "1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_history_newest_first() {
        let provider = provider(ResourceKind::Patient);
        let created = provider.create(patient_body()).await.unwrap();
        let id = created.id.clone().unwrap();
        provider.update(&id, patient_body()).await.unwrap();
        provider.update(&id, patient_body()).await.unwrap();

        let bundle = provider.history(&id).await.unwrap();
        assert_eq!(bundle.total, Some(3));
        let versions: Vec<_> = bundle
            .entry
            .iter()
            .map(|e| e.resource.meta.version_id.clone().unwrap())
            .collect();
        assert_eq!(versions, vec!["3", "2", "1"]);

        let err = provider.history("ghost").await.unwrap_err();
        assert!(matches!(err, CoreError::ResourceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_history_single_entry_after_create() {
        let provider = provider(ResourceKind::Patient);
        let created = provider.create(patient_body()).await.unwrap();
        let bundle = provider.history(created.id.as_deref().unwrap()).await.unwrap();
        assert_eq!(bundle.entry.len(), 1);
        assert_eq!(
            bundle.entry[0].resource.meta.version_id.as_deref(),
            Some("1")
        );
    }

    async fn seed_five(provider: &ResourceProvider) -> Vec<String> {
        let mut ids = Vec::new();
        for n in 1..=5 {
            let mut body = patient_body();
            body.set_field("multipleBirthInteger", json!(n));
            let created = provider.create(body).await.unwrap();
            ids.push(created.id.clone().unwrap());
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        ids
    }

    #[tokio::test]
    async fn test_search_sorted_page_with_links() {
        // Five resources created in order; page 2 of a newest-first sort must
        // return the 3rd and 4th most recently updated with links both ways.
        let provider = provider(ResourceKind::Patient);
        let ids = seed_five(&provider).await;

        let params = SearchParams::new()
            .with_sort("-lastUpdated")
            .with_count(2)
            .with_offset(2);
        let bundle = provider.search(&params).await.unwrap();

        assert_eq!(bundle.total, Some(5));
        let page: Vec<_> = bundle
            .entry
            .iter()
            .map(|e| e.resource.id.clone().unwrap())
            .collect();
        assert_eq!(page, vec![ids[2].clone(), ids[1].clone()]);
        assert!(bundle.link("previous").is_some());
        assert!(bundle.link("next").is_some());
    }

    #[tokio::test]
    async fn test_search_first_page_links() {
        let provider = provider(ResourceKind::Patient);
        seed_five(&provider).await;

        let params = SearchParams::new().with_sort("-lastUpdated").with_count(2);
        let bundle = provider.search(&params).await.unwrap();
        assert_eq!(bundle.entry.len(), 2);
        assert!(bundle.link("previous").is_none());
        assert!(bundle.link("first").is_none());
        assert!(bundle.link("next").is_some());
        assert!(bundle.link("last").is_some());
    }

    #[tokio::test]
    async fn test_search_filters_by_custom_field() {
        let provider = provider(ResourceKind::Patient);
        seed_five(&provider).await;
        let mut other = patient_body();
        other.set_field("gender", json!("male"));
        provider.create(other).await.unwrap();

        let params = SearchParams::new().with_param("gender", "male");
        let bundle = provider.search(&params).await.unwrap();
        assert_eq!(bundle.total, Some(1));
        assert_eq!(bundle.entry.len(), 1);
    }

    #[tokio::test]
    async fn test_search_respects_default_count() {
        let provider = provider(ResourceKind::Patient);
        for _ in 0..25 {
            provider.create(patient_body()).await.unwrap();
        }
        let bundle = provider.search(&SearchParams::new()).await.unwrap();
        assert_eq!(bundle.total, Some(25));
        assert_eq!(bundle.entry.len(), 20);
    }

    #[tokio::test]
    async fn test_search_entries_are_matches() {
        let provider = provider(ResourceKind::Patient);
        let created = provider.create(patient_body()).await.unwrap();
        let bundle = provider.search(&SearchParams::new()).await.unwrap();
        let entry = &bundle.entry[0];
        assert_eq!(
            entry.full_url.as_deref(),
            created.location().as_deref()
        );
        assert_eq!(entry.search.as_ref().unwrap().mode, "match");
    }
}
