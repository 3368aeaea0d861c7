use serde::Serialize;

use crate::id::generate_id;
use crate::resource::ClinicalResource;

/// Kind of a result bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BundleKind {
    Searchset,
    History,
    BatchResponse,
    Collection,
}

impl std::fmt::Display for BundleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BundleKind::Searchset => "searchset",
            BundleKind::History => "history",
            BundleKind::BatchResponse => "batch-response",
            BundleKind::Collection => "collection",
        };
        f.write_str(s)
    }
}

/// Navigation link: `self`, `first`, `previous`, `next`, `last`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleLink {
    pub relation: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleEntrySearch {
    pub mode: String,
}

/// One entry in a result bundle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleEntry {
    #[serde(rename = "fullUrl", skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,
    pub resource: ClinicalResource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<BundleEntrySearch>,
}

/// An ordered, paginated view over a query result.
///
/// Navigation links are derived from count/offset/total plus the original
/// query parameters at build time; they are never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bundle {
    #[serde(rename = "resourceType")]
    resource_type: &'static str,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: BundleKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub link: Vec<BundleLink>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<BundleEntry>,
}

impl Bundle {
    pub fn new(kind: BundleKind) -> Self {
        Self {
            resource_type: "Bundle",
            id: generate_id(),
            kind,
            total: None,
            link: Vec::new(),
            entry: Vec::new(),
        }
    }

    /// Search result bundle with the full matching count (which may exceed
    /// the number of entries on this page).
    pub fn searchset(total: u64) -> Self {
        let mut bundle = Self::new(BundleKind::Searchset);
        bundle.total = Some(total);
        bundle
    }

    /// Version history bundle.
    pub fn history(total: u64) -> Self {
        let mut bundle = Self::new(BundleKind::History);
        bundle.total = Some(total);
        bundle
    }

    pub fn collection() -> Self {
        Self::new(BundleKind::Collection)
    }

    /// Append a matched search result entry.
    pub fn push_match(&mut self, resource: ClinicalResource) {
        let full_url = resource.location();
        self.entry.push(BundleEntry {
            full_url,
            resource,
            search: Some(BundleEntrySearch {
                mode: "match".to_string(),
            }),
        });
    }

    /// Append a plain entry (history or collection membership).
    pub fn push(&mut self, resource: ClinicalResource) {
        let full_url = resource.location();
        self.entry.push(BundleEntry {
            full_url,
            resource,
            search: None,
        });
    }

    pub fn add_link(&mut self, relation: impl Into<String>, url: impl Into<String>) {
        self.link.push(BundleLink {
            relation: relation.into(),
            url: url.into(),
        });
    }

    /// Find a navigation link by relation.
    pub fn link(&self, relation: &str) -> Option<&str> {
        self.link
            .iter()
            .find(|l| l.relation == relation)
            .map(|l| l.url.as_str())
    }
}
