//! Element-shape checks shared by every resource kind.
//!
//! Resource bodies are open-ended maps, but three element shapes recur across
//! kinds and are checked the same way everywhere: references (`Kind/id`),
//! codeable concepts, and identifiers.

use serde_json::Value;

use crate::id::is_valid_id;
use crate::kind::ResourceKind;

/// Parse a relative `Kind/id` reference into its target kind and id.
///
/// Returns `None` when the kind is not a known [`ResourceKind`] or the id
/// violates the bounded grammar.
pub fn reference_target(reference: &str) -> Option<(ResourceKind, &str)> {
    let (kind, id) = reference.split_once('/')?;
    let kind: ResourceKind = kind.parse().ok()?;
    is_valid_id(id).then_some((kind, id))
}

/// Check a reference element: either a bare `Kind/id` string or an object
/// whose `reference` field holds one.
pub fn is_valid_reference(value: &Value) -> bool {
    match value {
        Value::String(reference) => reference_target(reference).is_some(),
        Value::Object(fields) => fields
            .get("reference")
            .and_then(Value::as_str)
            .is_some_and(|reference| reference_target(reference).is_some()),
        _ => false,
    }
}

/// Check a codeable-concept element: a non-empty `coding` list or free text.
pub fn is_valid_coded_concept(value: &Value) -> bool {
    let Value::Object(fields) = value else {
        return false;
    };
    let has_coding = fields
        .get("coding")
        .and_then(Value::as_array)
        .is_some_and(|codings| !codings.is_empty());
    let has_text = fields
        .get("text")
        .and_then(Value::as_str)
        .is_some_and(|text| !text.trim().is_empty());
    has_coding || has_text
}

/// Check an identifier element: a non-empty `value` plus either a `system`
/// or a `type`.
pub fn is_valid_identifier(value: &Value) -> bool {
    let Value::Object(fields) = value else {
        return false;
    };
    let has_value = fields
        .get("value")
        .and_then(Value::as_str)
        .is_some_and(|v| !v.is_empty());
    let has_scope = fields.get("system").is_some_and(|v| !v.is_null())
        || fields.get("type").is_some_and(|v| !v.is_null());
    has_value && has_scope
}
