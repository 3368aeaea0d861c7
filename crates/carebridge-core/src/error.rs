use thiserror::Error;

/// Core error types for CareBridge resource operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid resource kind: {0}")]
    InvalidResourceKind(String),

    #[error("Invalid resource id: {0}")]
    InvalidId(String),

    #[error("Invalid instant: {0}")]
    InvalidInstant(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Time parsing error: {0}")]
    TimeError(#[from] time::error::Parse),

    #[error("Resource not found: {kind}/{id}")]
    ResourceNotFound { kind: String, id: String },

    #[error("Resource conflict: {kind}/{id} already exists")]
    ResourceConflict { kind: String, id: String },

    #[error("Resource kind mismatch: expected {expected}, got {actual}")]
    KindMismatch { expected: String, actual: String },

    #[error("Invalid resource data: {message}")]
    InvalidResource { message: String },

    #[error("Invalid search query: {message}")]
    InvalidQuery { message: String },
}

impl CoreError {
    /// Create a new InvalidResourceKind error
    pub fn invalid_resource_kind(kind: impl Into<String>) -> Self {
        Self::InvalidResourceKind(kind.into())
    }

    /// Create a new InvalidId error
    pub fn invalid_id(id: impl Into<String>) -> Self {
        Self::InvalidId(id.into())
    }

    /// Create a new InvalidInstant error
    pub fn invalid_instant(instant: impl Into<String>) -> Self {
        Self::InvalidInstant(instant.into())
    }

    /// Create a new ResourceNotFound error
    pub fn resource_not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Create a new ResourceConflict error
    pub fn resource_conflict(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::ResourceConflict {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Create a new KindMismatch error
    pub fn kind_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::KindMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a new InvalidResource error
    pub fn invalid_resource(message: impl Into<String>) -> Self {
        Self::InvalidResource {
            message: message.into(),
        }
    }

    /// Create a new InvalidQuery error
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Check if this error is caused by the caller's input (4xx category)
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::TimeError(_))
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidResourceKind(_)
            | Self::InvalidId(_)
            | Self::InvalidInstant(_)
            | Self::KindMismatch { .. }
            | Self::InvalidResource { .. } => ErrorCategory::Validation,
            Self::ResourceNotFound { .. } => ErrorCategory::NotFound,
            Self::ResourceConflict { .. } => ErrorCategory::Conflict,
            Self::JsonError(_) => ErrorCategory::Serialization,
            Self::InvalidQuery { .. } => ErrorCategory::Query,
            Self::TimeError(_) => ErrorCategory::System,
        }
    }
}

/// Error categories for monitoring and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Conflict,
    Serialization,
    Query,
    System,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Serialization => write!(f, "serialization"),
            Self::Query => write!(f, "query"),
            Self::System => write!(f, "system"),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
