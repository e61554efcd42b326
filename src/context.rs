//! Per-request context stored in request extensions.
//!
//! The middleware inserts a [`RequestId`] and a [`RequestErrors`] accumulator
//! into the request's extensions before delegating, so downstream extractors,
//! handlers, and other middleware can read the correlation id and report
//! failures back to the logger.

use std::fmt;
use std::sync::{Arc, Mutex};

use axum::http::Request;
use uuid::Uuid;

// ============================================================================
// Request ID
// ============================================================================

/// Correlation identifier for a single request.
///
/// Stored in request extensions under this type, so handlers can retrieve it
/// with `Extension<RequestId>` or [`get_request_id`].
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a fresh identifier (UUID v4).
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Error accumulator
// ============================================================================

/// Errors recorded by downstream handlers for the current request.
///
/// Clones share the same storage, so the copy the middleware keeps observes
/// everything recorded through the copy handed to handlers. When at least one
/// error has been recorded by the time the response is produced, the logger
/// emits one error-level entry per message instead of the request record.
#[derive(Clone, Debug, Default)]
pub struct RequestErrors {
    inner: Arc<Mutex<Vec<String>>>,
}

impl RequestErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error; its `Display` form becomes the log message.
    pub fn record(&self, error: impl fmt::Display) {
        self.inner.lock().unwrap().push(error.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// Snapshot of the recorded messages, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.inner.lock().unwrap().clone()
    }
}

// ============================================================================
// Extension accessors
// ============================================================================

/// Get the correlation id from a request's extensions.
///
/// Returns `None` when the request never passed through the logging
/// middleware.
pub fn get_request_id<B>(request: &Request<B>) -> Option<&RequestId> {
    request.extensions().get::<RequestId>()
}

/// Get the error accumulator from a request's extensions.
pub fn get_request_errors<B>(request: &Request<B>) -> Option<&RequestErrors> {
    request.extensions().get::<RequestErrors>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_generation() {
        let id = RequestId::new();
        assert_eq!(id.as_str().len(), 36);
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn test_request_ids_are_unique() {
        let first = RequestId::new();
        let second = RequestId::new();
        assert_ne!(first.as_str(), second.as_str());
    }

    #[test]
    fn test_request_id_display() {
        let id = RequestId("abc-123".to_string());
        assert_eq!(id.to_string(), "abc-123");
    }

    #[test]
    fn test_errors_accumulate_in_order() {
        let errors = RequestErrors::new();
        assert!(errors.is_empty());

        errors.record("first failure");
        errors.record("second failure");

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.messages(), vec!["first failure", "second failure"]);
    }

    #[test]
    fn test_errors_shared_between_clones() {
        let errors = RequestErrors::new();
        let handle = errors.clone();

        handle.record("recorded through the clone");

        assert_eq!(errors.len(), 1);
        assert_eq!(errors.messages()[0], "recorded through the clone");
    }

    #[test]
    fn test_extension_accessors() {
        let mut request = Request::builder().body(()).unwrap();
        assert!(get_request_id(&request).is_none());
        assert!(get_request_errors(&request).is_none());

        request
            .extensions_mut()
            .insert(RequestId("abc-123".to_string()));
        request.extensions_mut().insert(RequestErrors::new());

        assert_eq!(get_request_id(&request).map(RequestId::as_str), Some("abc-123"));
        assert!(get_request_errors(&request).is_some());
    }
}
