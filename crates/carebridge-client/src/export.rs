use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle of a bulk export job. `failed` is terminal; the client never
/// re-initiates on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportState {
    InProgress,
    Completed,
    Failed,
}

impl ExportState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A patient-level bulk export tracked by its vendor status URL. The caller
/// owns the polling loop.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportJob {
    pub subject_id: String,
    pub status_url: String,
    pub state: ExportState,
    pub output_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExportJob {
    pub fn in_progress(subject_id: impl Into<String>, status_url: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            status_url: status_url.into(),
            state: ExportState::InProgress,
            output_urls: Vec::new(),
            error: None,
        }
    }

    /// This job with the outcome of one status poll applied.
    pub(crate) fn with_poll_outcome(&self, outcome: PollOutcome) -> Self {
        Self {
            subject_id: self.subject_id.clone(),
            status_url: self.status_url.clone(),
            state: outcome.state,
            output_urls: outcome.output_urls,
            error: outcome.error,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct PollOutcome {
    pub state: ExportState,
    pub output_urls: Vec<String>,
    pub error: Option<String>,
}

/// Classify one poll of the status endpoint: 202 means still running, 200
/// with an `output` listing means done, anything else is a failure with a
/// best-effort message taken from the body.
pub(crate) fn classify_poll(status: u16, body: Option<&Value>) -> PollOutcome {
    match status {
        202 => PollOutcome {
            state: ExportState::InProgress,
            output_urls: Vec::new(),
            error: None,
        },
        200 => match body.and_then(|b| b.get("output")).and_then(Value::as_array) {
            Some(output) => PollOutcome {
                state: ExportState::Completed,
                output_urls: output
                    .iter()
                    .filter_map(|item| item.get("url").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect(),
                error: None,
            },
            None => PollOutcome {
                state: ExportState::Failed,
                output_urls: Vec::new(),
                error: Some("status response missing output listing".to_string()),
            },
        },
        other => PollOutcome {
            state: ExportState::Failed,
            output_urls: Vec::new(),
            error: Some(
                body_diagnostics(body)
                    .unwrap_or_else(|| format!("unexpected status {other} from export endpoint")),
            ),
        },
    }
}

/// Pull a human-readable message out of an OperationOutcome-shaped body.
fn body_diagnostics(body: Option<&Value>) -> Option<String> {
    body?
        .get("issue")?
        .as_array()?
        .first()?
        .get("diagnostics")?
        .as_str()
        .map(str::to_string)
}
