//! Pluggable destinations for emitted log entries.

use std::sync::{Arc, Mutex};

use crate::record::RequestRecord;

// ============================================================================
// Sink trait
// ============================================================================

/// Destination for the entries the middleware emits.
///
/// Implementations must be thread-safe: the middleware calls them
/// concurrently from whichever tasks are completing requests. [`TracingSink`]
/// is the default; [`MemorySink`] captures entries for assertions in tests.
pub trait LogSink: Send + Sync {
    /// Handle the informational record for one completed request.
    fn emit(&self, record: &RequestRecord);

    /// Handle one error-level entry.
    fn emit_error(&self, message: &str);
}

// ============================================================================
// Tracing sink (default)
// ============================================================================

/// Development sink forwarding entries to the `tracing` facade.
///
/// Records become a single `info` event carrying every record field; errors
/// become one `error` event each. Field rendering (JSON, pretty, ...) is left
/// to whatever subscriber the application installed.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, record: &RequestRecord) {
        tracing::info!(
            request_id = %record.request_id,
            status = record.status,
            method = %record.method,
            path = %record.path,
            query = %record.query,
            ip = %record.ip,
            user_agent = %record.user_agent,
            latency_ms = record.latency.as_secs_f64() * 1000.0,
            time = %record.time.to_rfc3339(),
            request_body = record.request_body.as_deref().unwrap_or(""),
            response_body = record.response_body.as_deref().unwrap_or(""),
            "Request completed"
        );
    }

    fn emit_error(&self, message: &str) {
        tracing::error!("{}", message);
    }
}

// ============================================================================
// Memory sink (tests)
// ============================================================================

/// Sink that stores emitted entries in memory.
///
/// Clones share the same storage, which makes it easy to keep a handle for
/// assertions while the middleware owns the other one.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    inner: Arc<MemorySinkInner>,
}

#[derive(Debug, Default)]
struct MemorySinkInner {
    records: Mutex<Vec<RequestRecord>>,
    errors: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records emitted so far.
    pub fn records(&self) -> Vec<RequestRecord> {
        self.inner.records.lock().unwrap().clone()
    }

    /// Snapshot of the error messages emitted so far.
    pub fn errors(&self) -> Vec<String> {
        self.inner.errors.lock().unwrap().clone()
    }
}

impl LogSink for MemorySink {
    fn emit(&self, record: &RequestRecord) {
        self.inner.records.lock().unwrap().push(record.clone());
    }

    fn emit_error(&self, message: &str) {
        self.inner.errors.lock().unwrap().push(message.to_string());
    }
}
