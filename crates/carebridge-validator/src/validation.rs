use serde::Serialize;
use serde_json::Value;

use carebridge_core::{Bundle, ClinicalResource, ResourceKind, outcome};

use crate::profile::{element_present, required_elements};

/// One missing-element violation. `element` is the wire-level path from the
/// profile table, `message` the human-readable description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub element: String,
    pub message: String,
}

/// Result of checking one resource against its kind's profile.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub violations: Vec<Violation>,
}

impl ValidationOutcome {
    pub fn pass() -> Self {
        Self {
            valid: true,
            violations: Vec::new(),
        }
    }

    pub fn fail(violations: Vec<Violation>) -> Self {
        Self {
            valid: false,
            violations,
        }
    }

    /// Render the outcome as an OperationOutcome body.
    pub fn to_operation_outcome(&self) -> Value {
        if self.valid {
            return outcome::single("information", "informational", "validation passed");
        }
        let issues = self
            .violations
            .iter()
            .map(|violation| outcome::issue("error", "required", violation.message.clone()))
            .collect();
        outcome::operation_outcome(issues)
    }
}

/// Check a resource against the required-element profile for `kind`.
///
/// Collects every violation rather than stopping at the first, so a caller
/// can report the full repair list in one round trip. A resource tagged with
/// a different kind fails before any element check.
pub fn validate(resource: &ClinicalResource, kind: ResourceKind) -> ValidationOutcome {
    let mut violations = Vec::new();
    if resource.kind != kind {
        violations.push(Violation {
            element: "resourceType".to_string(),
            message: format!("resource is a {} but was validated as {kind}", resource.kind),
        });
    }
    for required in required_elements(kind) {
        if !element_present(resource, required.path) {
            violations.push(Violation {
                element: required.path.to_string(),
                message: format!("{} is required", required.label),
            });
        }
    }
    if violations.is_empty() {
        ValidationOutcome::pass()
    } else {
        ValidationOutcome::fail(violations)
    }
}

/// First non-compliant entry found while walking a bundle. The whole batch
/// is rejected; consumers treat each fetched bundle as all-or-nothing.
#[derive(Debug, thiserror::Error)]
#[error("bundle entry {index} ({kind}/{id}) failed validation: {}", summarize(.violations))]
pub struct BundleValidationError {
    pub index: usize,
    pub kind: ResourceKind,
    pub id: String,
    pub violations: Vec<Violation>,
}

fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|violation| violation.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate every entry of a bundle against the profile for `kind`, failing
/// on the first non-compliant resource. Returns the number of entries
/// checked when all pass.
pub fn validate_bundle_entries(
    bundle: &Bundle,
    kind: ResourceKind,
) -> Result<usize, BundleValidationError> {
    for (index, entry) in bundle.entry.iter().enumerate() {
        let outcome = validate(&entry.resource, kind);
        if !outcome.valid {
            return Err(BundleValidationError {
                index,
                kind,
                id: entry
                    .resource
                    .id
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
                violations: outcome.violations,
            });
        }
    }
    Ok(bundle.entry.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compliant_patient(id: &str) -> ClinicalResource {
        let mut patient = ClinicalResource::new(ResourceKind::Patient).with_id(id);
        patient.set_field("name", json!([{"family": "Doe"}]));
        patient.set_field("birthDate", json!("1980-06-01"));
        patient.set_field("gender", json!("female"));
        patient
    }

    #[test]
    fn test_compliant_patient_passes() {
        let outcome = validate(&compliant_patient("p1"), ResourceKind::Patient);
        assert!(outcome.valid);
        assert!(outcome.violations.is_empty());
    }

    #[test]
    fn test_all_violations_reported() {
        let mut patient = ClinicalResource::new(ResourceKind::Patient);
        patient.set_field("name", json!([{"family": "Doe"}]));

        let outcome = validate(&patient, ResourceKind::Patient);
        assert!(!outcome.valid);
        let messages: Vec<_> = outcome
            .violations
            .iter()
            .map(|v| v.message.as_str())
            .collect();
        assert_eq!(messages, vec!["birth date is required", "gender is required"]);
    }

    #[test]
    fn test_kind_mismatch_is_a_violation() {
        let outcome = validate(&compliant_patient("p1"), ResourceKind::Observation);
        assert!(!outcome.valid);
        assert_eq!(outcome.violations[0].element, "resourceType");
    }

    #[test]
    fn test_observation_choice_element() {
        let mut observation = ClinicalResource::new(ResourceKind::Observation);
        observation.set_field("status", json!("final"));
        observation.set_field("category", json!([{"coding": [{"code": "vital-signs"}]}]));
        observation.set_field("code", json!({"text": "heart rate"}));

        let missing = validate(&observation, ResourceKind::Observation);
        assert!(!missing.valid);
        assert_eq!(missing.violations[0].message, "effective time is required");

        observation.set_field("effectiveDateTime", json!("2024-03-01T10:00:00Z"));
        assert!(validate(&observation, ResourceKind::Observation).valid);
    }

    #[test]
    fn test_bundle_fails_on_first_bad_entry() {
        let mut bundle = Bundle::searchset(3);
        bundle.push_match(compliant_patient("p1"));
        let mut bad = ClinicalResource::new(ResourceKind::Patient).with_id("p2");
        bad.set_field("name", json!([{"family": "Doe"}]));
        bundle.push_match(bad);
        // also invalid, but never reached
        bundle.push_match(ClinicalResource::new(ResourceKind::Patient).with_id("p3"));

        let err = validate_bundle_entries(&bundle, ResourceKind::Patient).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.id, "p2");
        assert_eq!(err.violations.len(), 2);
        let rendered = err.to_string();
        assert!(rendered.contains("entry 1"));
        assert!(rendered.contains("Patient/p2"));
        assert!(rendered.contains("birth date is required"));
    }

    #[test]
    fn test_bundle_all_compliant() {
        let mut bundle = Bundle::searchset(2);
        bundle.push_match(compliant_patient("p1"));
        bundle.push_match(compliant_patient("p2"));
        assert_eq!(
            validate_bundle_entries(&bundle, ResourceKind::Patient).unwrap(),
            2
        );
    }

    #[test]
    fn test_empty_bundle_is_compliant() {
        let bundle = Bundle::searchset(0);
        assert_eq!(
            validate_bundle_entries(&bundle, ResourceKind::Patient).unwrap(),
            0
        );
    }

    #[test]
    fn test_operation_outcome_rendering() {
        let mut patient = ClinicalResource::new(ResourceKind::Patient);
        patient.set_field("name", json!([{"family": "Doe"}]));
        let body = validate(&patient, ResourceKind::Patient).to_operation_outcome();

        assert_eq!(body["resourceType"], "OperationOutcome");
        let issues = body["issue"].as_array().unwrap();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0]["severity"], "error");
        assert_eq!(issues[0]["code"], "required");
        assert_eq!(issues[0]["diagnostics"], "birth date is required");

        let ok = validate(&compliant_patient("p1"), ResourceKind::Patient).to_operation_outcome();
        assert_eq!(ok["issue"][0]["severity"], "information");
    }
}
