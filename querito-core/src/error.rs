use thiserror::Error;

/// Errors produced by the normalizer and the resource cache.
///
/// The enum is `Clone` because a single failed fetch is shared by every
/// subscriber of the key it belongs to.
///
/// # Examples
///
/// ```
/// use querito_core::QueryError;
///
/// let err = QueryError::Http { status_code: 404, message: None };
/// assert_eq!(err.status_code(), Some(404));
/// assert!(err.is_retryable());
///
/// let err = QueryError::validation("unknown operator `between`");
/// assert!(!err.is_retryable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The transport could not reach the backend.
    #[error("network error: {message}")]
    Network { message: String },

    /// The backend answered with a non-2xx status.
    #[error("http error {status_code}{}", detail(.message))]
    Http {
        status_code: u16,
        message: Option<String>,
    },

    /// Malformed filter, sort or resource input. Raised before the cache map is touched.
    #[error("invalid query: {0}")]
    Validation(String),

    /// `ResourceCache::init` was called outside a tokio runtime.
    #[error("no async runtime available")]
    NoRuntime,

    /// The cache was torn down, or the entry evicted, while a caller was waiting.
    #[error("cache closed")]
    Closed,
}

impl QueryError {
    pub fn validation(message: impl Into<String>) -> Self {
        QueryError::Validation(message.into())
    }

    /// Returns the HTTP status code for `Http` errors.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            QueryError::Http { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Transport failures (network and HTTP) are eligible for the automatic retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, QueryError::Network { .. } | QueryError::Http { .. })
    }
}

fn detail(message: &Option<String>) -> String {
    match message {
        Some(m) => format!(": {m}"),
        None => String::new(),
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_display_with_and_without_message() {
        let bare = QueryError::Http {
            status_code: 500,
            message: None,
        };
        assert_eq!(bare.to_string(), "http error 500");

        let detailed = QueryError::Http {
            status_code: 401,
            message: Some("token expired".to_string()),
        };
        assert_eq!(detailed.to_string(), "http error 401: token expired");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(QueryError::Network {
            message: "refused".into()
        }
        .is_retryable());
        assert!(!QueryError::validation("bad").is_retryable());
        assert!(!QueryError::Closed.is_retryable());
        assert!(!QueryError::NoRuntime.is_retryable());
    }
}
