use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::instant::{FhirInstant, now_utc};
use crate::kind::ResourceKind;

/// Resource metadata block: version, modification instant, tags, profiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMeta {
    // vendors sometimes send meta without lastUpdated; default to now
    #[serde(rename = "lastUpdated", default = "now_utc")]
    pub last_updated: FhirInstant,
    #[serde(rename = "versionId", skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub profile: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tag: Vec<Value>,
}

impl ResourceMeta {
    pub fn new() -> Self {
        Self {
            last_updated: now_utc(),
            version_id: None,
            profile: Vec::new(),
            tag: Vec::new(),
        }
    }

    pub fn with_version_id(mut self, version_id: impl Into<String>) -> Self {
        self.version_id = Some(version_id.into());
        self
    }

    pub fn with_profile(mut self, profile: Vec<String>) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_tag(mut self, tag: Vec<Value>) -> Self {
        self.tag = tag;
        self
    }

    /// Refresh `lastUpdated` to the current instant.
    pub fn touch(&mut self) {
        self.last_updated = now_utc();
    }
}

impl Default for ResourceMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// The uniform internal shape of a clinical resource.
///
/// Typed fields carry what the engine and client reason about (kind, id,
/// meta); everything else a vendor sends rides along in the flattened `data`
/// map untouched. `id` is absent only on resources that have not been through
/// `create` yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalResource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "resourceType")]
    pub kind: ResourceKind,
    #[serde(default)]
    pub meta: ResourceMeta,
    #[serde(flatten)]
    pub data: HashMap<String, Value>,
}

impl ClinicalResource {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            id: None,
            kind,
            meta: ResourceMeta::new(),
            data: HashMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_meta(mut self, meta: ResourceMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_data(mut self, data: HashMap<String, Value>) -> Self {
        self.data = data;
        self
    }

    pub fn set_field(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn remove_field(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// `Kind/id` locator, when the resource has an id.
    pub fn location(&self) -> Option<String> {
        self.id.as_ref().map(|id| format!("{}/{id}", self.kind))
    }

    /// Parse a resource from its wire JSON form.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Render the resource to its wire JSON form.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
