use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};

use carebridge_core::{FhirInstant, generate_id};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditDirection {
    Request,
    Response,
    Error,
}

impl AuditDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for AuditDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only audit record for an outbound vendor exchange.
/// Payloads are summarized, never stored whole.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: String,
    pub vendor: String,
    pub direction: AuditDirection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub timestamp: FhirInstant,
    pub payload_summary: String,
}

impl AuditEntry {
    pub fn new(vendor: impl Into<String>, direction: AuditDirection) -> Self {
        Self {
            id: generate_id(),
            vendor: vendor.into(),
            direction,
            method: None,
            status: None,
            target: None,
            timestamp: FhirInstant::now(),
            payload_summary: String::new(),
        }
    }

    /// Render as a FHIR AuditEvent body for sinks that persist
    /// protocol-native records.
    pub fn to_audit_event(&self) -> Value {
        let mut event = json!({
            "resourceType": "AuditEvent",
            "id": self.id,
            "type": {
                "system": "http://terminology.hl7.org/CodeSystem/audit-event-type",
                "code": "rest"
            },
            "action": "E",
            "recorded": self.timestamp.to_string(),
            "outcome": if self.direction == AuditDirection::Error { "8" } else { "0" },
            "agent": [{
                "who": {"display": self.vendor},
                "requestor": self.direction == AuditDirection::Request
            }],
            "source": {"observer": {"display": "carebridge"}},
            "entity": [{
                "detail": [{
                    "type": self.direction.as_str(),
                    "valueString": self.payload_summary
                }]
            }]
        });
        if let Some(target) = &self.target {
            event["entity"][0]["what"] = json!({"display": target});
        }
        if let Some(status) = self.status
            && let Some(details) = event["entity"][0]["detail"].as_array_mut()
        {
            details.push(json!({"type": "status", "valueString": status.to_string()}));
        }
        event
    }
}

/// Summary used in place of the payload: resource type plus rendered size.
pub fn summarize_payload(body: Option<&Value>) -> String {
    match body {
        None => "empty".to_string(),
        Some(value) => {
            let resource_type = value
                .get("resourceType")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            format!("{resource_type} ({} bytes)", value.to_string().len())
        }
    }
}

/// Destination for audit entries. Implementations must not assume entries
/// will be read back; the recorder treats them as write-only.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: AuditEntry) -> Result<()>;
}

/// Emits each entry as a structured log event.
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn append(&self, entry: AuditEntry) -> Result<()> {
        tracing::info!(
            audit_id = %entry.id,
            vendor = %entry.vendor,
            direction = %entry.direction,
            method = entry.method.as_deref().unwrap_or(""),
            status = entry.status.map(i64::from).unwrap_or(-1),
            target = entry.target.as_deref().unwrap_or(""),
            summary = %entry.payload_summary,
            "vendor exchange"
        );
        Ok(())
    }
}

/// Collects entries in memory for test inspection.
#[derive(Default)]
pub struct MemoryAuditSink {
    entries: tokio::sync::Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append(&self, entry: AuditEntry) -> Result<()> {
        self.entries.lock().await.push(entry);
        Ok(())
    }
}

/// Append-only recorder wrapped around an injected sink.
///
/// Recording is side-effect only: a failing sink is logged at warn level and
/// swallowed so it can never abort the business operation it observes.
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
}

impl AuditRecorder {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    pub async fn log_request(&self, vendor: &str, method: &str, url: &str, body: Option<&Value>) {
        let mut entry = AuditEntry::new(vendor, AuditDirection::Request);
        entry.method = Some(method.to_string());
        entry.target = Some(url.to_string());
        entry.payload_summary = summarize_payload(body);
        self.append(entry).await;
    }

    pub async fn log_response(&self, vendor: &str, status: u16, body: Option<&Value>) {
        let mut entry = AuditEntry::new(vendor, AuditDirection::Response);
        entry.status = Some(status);
        entry.payload_summary = summarize_payload(body);
        self.append(entry).await;
    }

    pub async fn log_error(&self, vendor: &str, status: Option<u16>, message: &str) {
        let mut entry = AuditEntry::new(vendor, AuditDirection::Error);
        entry.status = status;
        entry.payload_summary = message.to_string();
        self.append(entry).await;
    }

    async fn append(&self, entry: AuditEntry) {
        if let Err(error) = self.sink.append(entry).await {
            tracing::warn!(error = %error, "audit sink failed, entry dropped");
        }
    }
}
