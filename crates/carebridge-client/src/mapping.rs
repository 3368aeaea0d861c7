use serde_json::Value;

use carebridge_core::{Bundle, ClinicalResource};

use crate::error::{ClientError, Result};

/// Translate one vendor payload into the internal envelope.
///
/// Vendor `extension` entries survive only when their URL starts with the
/// vendor's own namespace; foreign extensions are dropped so resources from
/// different vendors can merge downstream without namespace leakage.
pub fn map_resource(payload: Value, namespace: &str) -> Result<ClinicalResource> {
    let mut resource = ClinicalResource::from_value(payload)
        .map_err(|e| ClientError::mapping(format!("vendor payload rejected: {e}")))?;
    filter_extensions(&mut resource, namespace);
    Ok(resource)
}

fn filter_extensions(resource: &mut ClinicalResource, namespace: &str) {
    let Some(Value::Array(extensions)) = resource.field("extension").cloned() else {
        return;
    };
    let kept: Vec<Value> = extensions
        .into_iter()
        .filter(|extension| {
            extension
                .get("url")
                .and_then(Value::as_str)
                .is_some_and(|url| url.starts_with(namespace))
        })
        .collect();
    if kept.is_empty() {
        resource.remove_field("extension");
    } else {
        resource.set_field("extension", Value::Array(kept));
    }
}

/// Translate a vendor searchset into an internal bundle, entry by entry.
/// Entries that do not parse as a supported resource kind are skipped with a
/// warn log; the bundle `total` prefers the vendor's figure when present.
pub fn map_bundle(payload: Value, namespace: &str) -> Result<Bundle> {
    if payload.get("resourceType").and_then(Value::as_str) != Some("Bundle") {
        return Err(ClientError::invalid_response(
            "expected a Bundle from the vendor search endpoint",
        ));
    }
    let vendor_total = payload.get("total").and_then(Value::as_u64);
    let entries = match payload.get("entry") {
        Some(Value::Array(entries)) => entries.clone(),
        _ => Vec::new(),
    };

    let mut mapped = Vec::new();
    for (index, entry) in entries.into_iter().enumerate() {
        let Some(resource) = entry.get("resource") else {
            tracing::warn!(index, "vendor bundle entry without a resource, skipping");
            continue;
        };
        match map_resource(resource.clone(), namespace) {
            Ok(resource) => mapped.push(resource),
            Err(error) => {
                tracing::warn!(index, error = %error, "unmappable vendor bundle entry, skipping");
            }
        }
    }

    let mut bundle = Bundle::searchset(vendor_total.unwrap_or(mapped.len() as u64));
    for resource in mapped {
        bundle.push_match(resource);
    }
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_include;
    use carebridge_core::ResourceKind;
    use serde_json::json;

    const NS: &str = "https://vendor.example/fhir";

    #[test]
    fn test_map_resource_preserves_fields() {
        let payload = json!({
            "resourceType": "Patient",
            "id": "p1",
            "meta": {"versionId": "3", "lastUpdated": "2024-03-01T10:00:00Z"},
            "name": [{"family": "Doe", "given": ["Jane"]}],
            "gender": "female"
        });
        let resource = map_resource(payload, NS).unwrap();
        assert_eq!(resource.kind, ResourceKind::Patient);
        assert_eq!(resource.id.as_deref(), Some("p1"));
        assert_eq!(resource.meta.version_id.as_deref(), Some("3"));

        let back = resource.to_value().unwrap();
        assert_json_include!(
            actual: back,
            expected: json!({
                "resourceType": "Patient",
                "name": [{"family": "Doe"}],
                "gender": "female"
            })
        );
    }

    #[test]
    fn test_foreign_extensions_dropped() {
        let payload = json!({
            "resourceType": "Patient",
            "id": "p1",
            "extension": [
                {"url": "https://vendor.example/fhir/StructureDefinition/tenant", "valueString": "north"},
                {"url": "https://other-vendor.example/legacy-flag", "valueBoolean": true}
            ]
        });
        let resource = map_resource(payload, NS).unwrap();
        let extensions = resource.field("extension").unwrap().as_array().unwrap();
        assert_eq!(extensions.len(), 1);
        assert_eq!(
            extensions[0]["url"],
            "https://vendor.example/fhir/StructureDefinition/tenant"
        );
    }

    #[test]
    fn test_all_extensions_foreign_removes_field() {
        let payload = json!({
            "resourceType": "Patient",
            "id": "p1",
            "extension": [{"url": "https://elsewhere.example/x", "valueString": "y"}]
        });
        let resource = map_resource(payload, NS).unwrap();
        assert!(resource.field("extension").is_none());
    }

    #[test]
    fn test_unknown_kind_is_mapping_error() {
        let payload = json!({"resourceType": "Basic", "id": "b1"});
        let err = map_resource(payload, NS).unwrap_err();
        assert!(matches!(err, ClientError::Mapping { .. }));
    }

    #[test]
    fn test_map_bundle_skips_bad_entries() {
        let payload = json!({
            "resourceType": "Bundle",
            "type": "searchset",
            "total": 3,
            "entry": [
                {"resource": {"resourceType": "Patient", "id": "p1", "gender": "female"}},
                {"resource": {"resourceType": "OperationOutcome", "issue": []}},
                {"resource": {"resourceType": "Patient", "id": "p2", "gender": "male"}}
            ]
        });
        let bundle = map_bundle(payload, NS).unwrap();
        assert_eq!(bundle.total, Some(3));
        assert_eq!(bundle.entry.len(), 2);
        assert_eq!(bundle.entry[0].resource.id.as_deref(), Some("p1"));
        assert_eq!(bundle.entry[1].resource.id.as_deref(), Some("p2"));
    }

    #[test]
    fn test_map_bundle_without_total_counts_mapped() {
        let payload = json!({
            "resourceType": "Bundle",
            "type": "searchset",
            "entry": [
                {"resource": {"resourceType": "Observation", "id": "o1", "status": "final"}}
            ]
        });
        let bundle = map_bundle(payload, NS).unwrap();
        assert_eq!(bundle.total, Some(1));
    }

    #[test]
    fn test_map_bundle_rejects_non_bundle() {
        let err = map_bundle(json!({"resourceType": "Patient"}), NS).unwrap_err();
        assert!(matches!(err, ClientError::InvalidResponse { .. }));
    }
}
