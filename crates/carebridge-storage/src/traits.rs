use async_trait::async_trait;
use carebridge_core::{ClinicalResource, ResourceKind, Result};

/// Storage port for clinical resources.
///
/// The resource engine is written against this trait only; the in-memory
/// backend in [`crate::memory`] is the reference implementation and a
/// persistent backend can be swapped in behind the same contract.
///
/// Version semantics live in the engine, not here: `put` stores whatever
/// `meta.versionId` the caller stamped, appending the new state to an
/// append-only version log keyed by `(id, versionId)`. `delete` removes the
/// current record but retains the log, so `versions` and `get_version` keep
/// answering for deleted resources.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Current state of a resource, or `None` if absent or deleted.
    async fn get(&self, kind: ResourceKind, id: &str) -> Result<Option<ClinicalResource>>;

    /// Upsert the current state and append it to the version log. The
    /// resource must carry an id and a stamped `meta.versionId`.
    async fn put(&self, resource: ClinicalResource) -> Result<()>;

    /// Remove the current record. Returns `false` when nothing was stored.
    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<bool>;

    /// All current resources of one kind, in unspecified order.
    async fn list(&self, kind: ResourceKind) -> Result<Vec<ClinicalResource>>;

    /// A specific retained version, or `None` if the id or version is
    /// unknown.
    async fn get_version(
        &self,
        kind: ResourceKind,
        id: &str,
        version_id: &str,
    ) -> Result<Option<ClinicalResource>>;

    /// All retained versions of a resource, newest first. Empty when the id
    /// has never been stored.
    async fn versions(&self, kind: ResourceKind, id: &str) -> Result<Vec<ClinicalResource>>;

    /// Number of current resources of one kind.
    async fn count(&self, kind: ResourceKind) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time check that the trait stays object safe; the engine holds
    // it as `Arc<dyn ResourceStore>`.
    #[allow(dead_code)]
    fn assert_object_safe(_store: &dyn ResourceStore) {}
}
