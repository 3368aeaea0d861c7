use serde_json::Value;

use carebridge_core::{CoreError, outcome};

/// Failures surfaced by the vendor integration client.
///
/// The classification is load-bearing: [`ClientError::is_retryable`] drives
/// the retry executor, and the 401/429 recovery paths in the call pipeline
/// match on specific variants. Callers always see the original failure kind,
/// never a flattened generic error.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Bad credentials or grant, expired token with no refresh path, or a
    /// second 401 after a refresh. Never retried.
    #[error("authentication failed: {message}")]
    Auth { message: String },

    /// Timeout, connection reset, DNS failure. Retryable.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx vendor status. 5xx is retryable, 4xx is fatal.
    #[error("vendor returned status {status}: {body}")]
    Http { status: u16, body: String },

    /// Vendor 429. A `Retry-After` hint is honored once outside the retry
    /// budget; an un-hinted 429 rides the budget like any transient failure.
    #[error("vendor rate limited the request{}", retry_after_suffix(.retry_after))]
    RateLimited { retry_after: Option<u64> },

    #[error("bulk export failed: {message}")]
    Export { message: String },

    #[error("payload mapping failed: {message}")]
    Mapping { message: String },

    #[error("unexpected vendor response: {message}")]
    InvalidResponse { message: String },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}

fn retry_after_suffix(retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(seconds) => format!(", retry after {seconds}s"),
        None => String::new(),
    }
}

impl ClientError {
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }

    pub fn export(message: impl Into<String>) -> Self {
        Self::Export {
            message: message.into(),
        }
    }

    pub fn mapping(message: impl Into<String>) -> Self {
        Self::Mapping {
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the retry executor may spend budget on this failure:
    /// transport errors, vendor 5xx, and 429s without a `Retry-After` hint.
    /// A hinted 429 is excluded; the pipeline honors the hint itself.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Http { status, .. } => *status >= 500,
            Self::RateLimited { retry_after } => retry_after.is_none(),
            _ => false,
        }
    }

    /// The HTTP status behind this failure, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "auth",
            Self::Transport(_) => "transport",
            Self::Http { .. } => "http",
            Self::RateLimited { .. } => "rate-limit",
            Self::Export { .. } => "export",
            Self::Mapping { .. } => "mapping",
            Self::InvalidResponse { .. } => "invalid-response",
            Self::Config { .. } => "config",
            Self::Core(_) => "core",
        }
    }

    /// Render as an OperationOutcome body using the closest protocol issue
    /// code.
    pub fn to_operation_outcome(&self) -> Value {
        let code = match self {
            Self::Auth { .. } => "security",
            Self::Transport(_) => "transient",
            Self::Http { status, .. } if *status >= 500 => "transient",
            Self::Http { .. } => "processing",
            Self::RateLimited { .. } => "throttled",
            Self::Export { .. } => "processing",
            Self::Mapping { .. } | Self::InvalidResponse { .. } => "structure",
            Self::Config { .. } => "invalid",
            Self::Core(core) => match core.category() {
                carebridge_core::ErrorCategory::NotFound => "not-found",
                carebridge_core::ErrorCategory::Conflict => "conflict",
                carebridge_core::ErrorCategory::Validation => "invalid",
                _ => "processing",
            },
        };
        outcome::single("error", code, self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ClientError::http(500, "oops").is_retryable());
        assert!(ClientError::http(503, "unavailable").is_retryable());
        assert!(!ClientError::http(404, "missing").is_retryable());
        assert!(!ClientError::auth("bad credentials").is_retryable());
        assert!(!ClientError::mapping("bad payload").is_retryable());
        // hinted rate limits are handled by the pipeline, un-hinted ones retry
        assert!(!ClientError::RateLimited { retry_after: Some(2) }.is_retryable());
        assert!(ClientError::RateLimited { retry_after: None }.is_retryable());
    }

    #[test]
    fn test_status_extraction() {
        assert_eq!(ClientError::http(502, "").status(), Some(502));
        assert_eq!(
            ClientError::RateLimited { retry_after: None }.status(),
            Some(429)
        );
        assert_eq!(ClientError::auth("x").status(), None);
    }

    #[test]
    fn test_display_messages() {
        let err = ClientError::RateLimited {
            retry_after: Some(3),
        };
        assert_eq!(err.to_string(), "vendor rate limited the request, retry after 3s");

        let bare = ClientError::RateLimited { retry_after: None };
        assert_eq!(bare.to_string(), "vendor rate limited the request");

        let auth = ClientError::auth("token expired and no refresh path available");
        assert!(auth.to_string().contains("no refresh path"));
    }

    #[test]
    fn test_core_error_passes_through() {
        let core = CoreError::resource_not_found("Patient", "p1");
        let err = ClientError::from(core);
        assert_eq!(err.category(), "core");
        let outcome = err.to_operation_outcome();
        assert_eq!(outcome["issue"][0]["code"], "not-found");
    }

    #[test]
    fn test_operation_outcome_codes() {
        assert_eq!(
            ClientError::auth("x").to_operation_outcome()["issue"][0]["code"],
            "security"
        );
        assert_eq!(
            ClientError::RateLimited { retry_after: None }.to_operation_outcome()["issue"][0]
                ["code"],
            "throttled"
        );
        assert_eq!(
            ClientError::http(500, "x").to_operation_outcome()["issue"][0]["code"],
            "transient"
        );
        assert_eq!(
            ClientError::http(422, "x").to_operation_outcome()["issue"][0]["code"],
            "processing"
        );
    }
}
