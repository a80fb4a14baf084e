use std::time::Duration;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field or configuration key that caused the error (e.g., "request.level", "CONCEPT_UPSTREAM_URL")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected values, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "broker", "config")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Failure of the single upstream generation call.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream request timed out")]
    Timeout,

    #[error("upstream returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("upstream unreachable: {0}")]
    Network(String),

    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),

    /// The provider's own stop signal reported a failed generation.
    #[error("provider reported a failed generation: {0}")]
    Provider(String),
}

/// Local persistence failure. Never interpreted as a cache miss.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store operation exceeded {0:?}")]
    Timeout(Duration),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("corrupt store row: {0}")]
    Corrupt(String),

    #[error("store task failed: {0}")]
    Join(String),
}

/// Unified error type for the explanation broker.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Generation error: {0}")]
    Generation(#[from] UpstreamError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Runtime error: {message}{}", format_context(.context))]
    Runtime {
        message: String,
        context: ErrorContext,
    },
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new validation error with structured context
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Create a new runtime error with structured context
    pub fn runtime_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Runtime {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Validation { context, .. }
            | Error::Configuration { context, .. }
            | Error::Runtime { context, .. } => Some(context),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Whether a caller may retry the same request.
    ///
    /// Every generation failure qualifies, as does a store timeout. Validation
    /// and configuration faults will fail identically on every attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Generation(_) => true,
            Error::Store(StoreError::Timeout(_)) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_is_rendered() {
        let err = Error::validation_with_context(
            "unknown level",
            ErrorContext::new()
                .with_field_path("request.level")
                .with_details("got 'expert'"),
        );
        let text = err.to_string();
        assert!(text.contains("unknown level"));
        assert!(text.contains("field: request.level"));
        assert!(text.contains("details: got 'expert'"));
    }

    #[test]
    fn test_retry_classification() {
        assert!(Error::from(UpstreamError::Timeout).is_retryable());
        assert!(Error::from(UpstreamError::Http {
            status: 502,
            message: "bad gateway".into()
        })
        .is_retryable());
        assert!(Error::from(StoreError::Timeout(Duration::from_millis(10))).is_retryable());
        assert!(!Error::from(StoreError::Poisoned).is_retryable());
        assert!(!Error::validation_with_context("empty topic", ErrorContext::new()).is_retryable());
    }
}
