//! Injected HTTP transport boundary.
//!
//! The cache never performs I/O itself; every request goes through a
//! [`Transport`] supplied at construction time.

use async_trait::async_trait;
use querito_core::{QueryError, WireParams};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        })
    }
}

/// One request handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    pub path: String,
    pub query: WireParams,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl TransportRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: WireParams::new(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>, query: WireParams) -> Self {
        Self {
            query,
            ..Self::new(Method::Get, path)
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            body: Some(body),
            ..Self::new(Method::Post, path)
        }
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self {
            body: Some(body),
            ..Self::new(Method::Put, path)
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Backend answer: HTTP status, decoded body and an optional error message.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub data: Value,
    pub error: Option<String>,
}

impl TransportResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            status: 200,
            data,
            error: None,
        }
    }

    pub fn failed(status: u16, error: impl Into<String>) -> Self {
        Self {
            status,
            data: Value::Null,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Maps non-2xx statuses to [`QueryError::Http`]. A 401 is not special.
    pub fn into_result(self) -> Result<Value, QueryError> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(QueryError::Http {
                status_code: self.status,
                message: self.error,
            })
        }
    }
}

/// The transport could not complete the exchange at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<TransportError> for QueryError {
    fn from(err: TransportError) -> Self {
        QueryError::Network {
            message: err.message,
        }
    }
}

/// HTTP client used by the cache for list fetches and mutations.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use querito_async::{Transport, TransportError, TransportRequest, TransportResponse};
/// use serde_json::json;
///
/// struct Fixed;
///
/// #[async_trait]
/// impl Transport for Fixed {
///     async fn request(
///         &self,
///         request: TransportRequest,
///     ) -> Result<TransportResponse, TransportError> {
///         Ok(TransportResponse::ok(json!({ "path": request.path })))
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, request: TransportRequest)
        -> Result<TransportResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            TransportResponse::ok(json!([1])).into_result(),
            Ok(json!([1]))
        );
        assert_eq!(
            TransportResponse::failed(401, "unauthorized").into_result(),
            Err(QueryError::Http {
                status_code: 401,
                message: Some("unauthorized".to_string())
            })
        );
        let created = TransportResponse {
            status: 201,
            data: json!({"id": 9}),
            error: None,
        };
        assert!(created.is_success());
    }

    #[test]
    fn test_transport_error_becomes_network_error() {
        let err: QueryError = TransportError::new("connection refused").into();
        assert_eq!(
            err,
            QueryError::Network {
                message: "connection refused".to_string()
            }
        );
    }

    #[test]
    fn test_request_builders() {
        let req = TransportRequest::delete("/reward/3").with_header("x-trace", "abc");
        assert_eq!(req.method, Method::Delete);
        assert_eq!(req.headers, vec![("x-trace".to_string(), "abc".to_string())]);
        assert_eq!(Method::Put.to_string(), "PUT");
    }
}
