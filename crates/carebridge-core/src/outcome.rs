//! OperationOutcome JSON builders used when surfacing errors and validation
//! results in the protocol's native shape.

use serde_json::{Value, json};

/// Build a single OperationOutcome issue.
pub fn issue(severity: &str, code: &str, diagnostics: impl Into<String>) -> Value {
    json!({
        "severity": severity,
        "code": code,
        "diagnostics": diagnostics.into(),
    })
}

/// Wrap issues in an OperationOutcome resource body.
pub fn operation_outcome(issues: Vec<Value>) -> Value {
    json!({
        "resourceType": "OperationOutcome",
        "issue": issues,
    })
}

/// OperationOutcome with exactly one issue.
pub fn single(severity: &str, code: &str, diagnostics: impl Into<String>) -> Value {
    operation_outcome(vec![issue(severity, code, diagnostics)])
}
