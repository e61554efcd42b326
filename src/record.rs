//! Structured log record emitted once per request.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// The structured record handed to the sink for one completed request.
///
/// Serializes with kebab-case field names (`request-id`, `user-agent`,
/// `request-body`, ...); `latency` serializes as fractional milliseconds and
/// `time` as an RFC 3339 UTC timestamp. The optional body fields are omitted
/// entirely when unset rather than serialized as null.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RequestRecord {
    /// Correlation identifier, also echoed on the `X-Request-ID` response header.
    pub request_id: String,

    /// Response status code.
    pub status: u16,

    /// HTTP method.
    pub method: String,

    /// URL path.
    pub path: String,

    /// Raw query string; empty when the URL carries none.
    pub query: String,

    /// Client IP, resolved from forwarded headers or the peer address.
    pub ip: String,

    /// `User-Agent` header; empty when absent.
    pub user_agent: String,

    /// Time from delegation to handler completion.
    #[serde(serialize_with = "latency_millis")]
    pub latency: Duration,

    /// Completion timestamp (UTC).
    pub time: DateTime<Utc>,

    /// Request payload, present for POST/PUT/PATCH requests only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<String>,

    /// Captured response payload, present when response logging is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
}

/// Serialize a latency as fractional milliseconds.
fn latency_millis<S>(latency: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(latency.as_secs_f64() * 1000.0)
}
