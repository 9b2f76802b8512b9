//! Model-call errors.

use std::time::Duration;

/// Errors from a model call, classified for retry decisions.
#[derive(Clone, Debug, thiserror::Error)]
pub enum LlmError {
    // Retryable
    /// HTTP 429.
    #[error("rate limited")]
    RateLimited {
        /// Wait requested by the provider.
        retry_after: Option<Duration>,
    },
    /// HTTP 5xx.
    #[error("server error {status}: {body}")]
    ServerError {
        /// Response status.
        status: u16,
        /// Response body.
        body: String,
    },
    /// Connection failed or was reset.
    #[error("network error: {0}")]
    Network(String),
    /// No response in time.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    // Fatal
    /// HTTP 401/403.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    /// Any other rejected request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl LlmError {
    /// Whether the same call may succeed if attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::ServerError { .. } | Self::Network(_) | Self::Timeout(_)
        )
    }

    /// Delay requested by the provider, if any.
    pub fn suggested_delay(&self) -> Option<Duration> {
        if let Self::RateLimited { retry_after } = self {
            *retry_after
        } else {
            None
        }
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::ServerError { .. } => "server_error",
            Self::Network(_) => "network_error",
            Self::Timeout(_) => "timeout",
            Self::AuthenticationFailed(_) => "authentication_failed",
            Self::InvalidRequest(_) => "invalid_request",
        }
    }

    /// Classify an HTTP status code into the appropriate error variant.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => Self::AuthenticationFailed(body),
            429 => Self::RateLimited { retry_after: None },
            500..=599 => Self::ServerError { status, body },
            _ => Self::InvalidRequest(format!("unexpected status {status}: {body}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(LlmError::RateLimited { retry_after: None }.is_retryable());
        assert!(LlmError::ServerError { status: 503, body: "busy".into() }.is_retryable());
        assert!(LlmError::Network("reset".into()).is_retryable());
        assert!(LlmError::Timeout(Duration::from_secs(30)).is_retryable());
    }

    #[test]
    fn fatal_classification() {
        assert!(!LlmError::AuthenticationFailed("bad key".into()).is_retryable());
        assert!(!LlmError::InvalidRequest("bad".into()).is_retryable());
    }

    #[test]
    fn from_status_mapping() {
        assert!(matches!(LlmError::from_status(401, "no"), LlmError::AuthenticationFailed(_)));
        assert!(matches!(LlmError::from_status(403, "no"), LlmError::AuthenticationFailed(_)));
        assert!(matches!(LlmError::from_status(429, ""), LlmError::RateLimited { retry_after: None }));
        assert!(matches!(
            LlmError::from_status(502, "gateway"),
            LlmError::ServerError { status: 502, .. }
        ));
        let err = LlmError::from_status(404, "missing");
        assert_eq!(err.to_string(), "invalid request: unexpected status 404: missing");
        assert!(!err.is_retryable());
    }

    #[test]
    fn suggested_delay_only_for_rate_limit() {
        let limited = LlmError::RateLimited {
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(limited.suggested_delay(), Some(Duration::from_secs(7)));
        assert_eq!(LlmError::Network("x".into()).suggested_delay(), None);
    }

    #[test]
    fn error_kinds() {
        assert_eq!(LlmError::Timeout(Duration::ZERO).error_kind(), "timeout");
        assert_eq!(LlmError::from_status(500, "").error_kind(), "server_error");
    }
}
