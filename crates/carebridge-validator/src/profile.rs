//! Required-element tables for each supported resource kind, modeled on the
//! USCDI data-element requirements.

use serde_json::Value;

use carebridge_core::{ClinicalResource, ResourceKind};

/// One required data element. `path` is the element name as it appears on
/// the wire; a `[x]` suffix marks a choice element satisfied by any variant
/// (`effective[x]` accepts `effectiveDateTime`, `effectivePeriod`, ...).
/// `label` is how violation messages name the element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredElement {
    pub path: &'static str,
    pub label: &'static str,
}

/// Elements the compliance profile requires for a kind.
pub fn required_elements(kind: ResourceKind) -> &'static [RequiredElement] {
    match kind {
        ResourceKind::Patient => &[
            RequiredElement { path: "name", label: "name" },
            RequiredElement { path: "birthDate", label: "birth date" },
            RequiredElement { path: "gender", label: "gender" },
        ],
        ResourceKind::Practitioner => &[
            RequiredElement { path: "name", label: "name" },
            RequiredElement { path: "identifier", label: "identifier" },
        ],
        ResourceKind::Organization => &[
            RequiredElement { path: "name", label: "name" },
        ],
        ResourceKind::Location => &[
            RequiredElement { path: "name", label: "name" },
        ],
        ResourceKind::Encounter => &[
            RequiredElement { path: "status", label: "status" },
            RequiredElement { path: "class", label: "class" },
            RequiredElement { path: "subject", label: "subject" },
        ],
        ResourceKind::Observation => &[
            RequiredElement { path: "status", label: "status" },
            RequiredElement { path: "category", label: "category" },
            RequiredElement { path: "code", label: "code" },
            RequiredElement { path: "effective[x]", label: "effective time" },
        ],
        ResourceKind::Condition => &[
            RequiredElement { path: "code", label: "code" },
            RequiredElement { path: "subject", label: "subject" },
        ],
        ResourceKind::MedicationRequest => &[
            RequiredElement { path: "status", label: "status" },
            RequiredElement { path: "intent", label: "intent" },
            RequiredElement { path: "medication[x]", label: "medication" },
            RequiredElement { path: "subject", label: "subject" },
        ],
        ResourceKind::Procedure => &[
            RequiredElement { path: "status", label: "status" },
            RequiredElement { path: "code", label: "code" },
            RequiredElement { path: "subject", label: "subject" },
        ],
        ResourceKind::DocumentReference => &[
            RequiredElement { path: "status", label: "status" },
            RequiredElement { path: "type", label: "type" },
            RequiredElement { path: "content", label: "content" },
        ],
        ResourceKind::DiagnosticReport => &[
            RequiredElement { path: "status", label: "status" },
            RequiredElement { path: "code", label: "code" },
            RequiredElement { path: "subject", label: "subject" },
        ],
        ResourceKind::Immunization => &[
            RequiredElement { path: "status", label: "status" },
            RequiredElement { path: "vaccineCode", label: "vaccine code" },
            RequiredElement { path: "patient", label: "patient" },
        ],
        ResourceKind::AllergyIntolerance => &[
            RequiredElement { path: "code", label: "code" },
            RequiredElement { path: "patient", label: "patient" },
        ],
    }
}

/// Whether the element is present with usable content. A choice element is
/// satisfied by any variant key carrying content.
pub fn element_present(resource: &ClinicalResource, path: &str) -> bool {
    if let Some(prefix) = path.strip_suffix("[x]") {
        return resource
            .data
            .iter()
            .any(|(key, value)| is_choice_variant(key, prefix) && has_content(value));
    }
    resource.field(path).is_some_and(has_content)
}

/// `effectiveDateTime` is a variant of `effective[x]`; `effectiveness` is
/// not. The character after the prefix must start a new camelCase word.
fn is_choice_variant(key: &str, prefix: &str) -> bool {
    match key.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.chars().next().is_some_and(char::is_uppercase),
        None => false,
    }
}

/// Empty strings, arrays and objects do not count as data.
fn has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}
