//! Request logging middleware.
//!
//! Tags every request with a correlation id, measures handler latency, and
//! emits one structured record per request (or one error-level entry per
//! error recorded downstream) to a pluggable sink.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use crate::capture::CaptureBody;
use crate::context::{RequestErrors, RequestId};
use crate::record::RequestRecord;
use crate::sink::{LogSink, TracingSink};

/// Correlation id header, read from the request and set on the response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
const REAL_IP_HEADER: &str = "x-real-ip";

// ============================================================================
// Configuration
// ============================================================================

/// Configuration and sink handle for [`log_request`], passed to the
/// middleware as state.
///
/// ```no_run
/// use axum::{middleware, routing::get, Router};
/// use axum_request_logger::{log_request, RequestLogger};
///
/// let logger = RequestLogger::new().log_response(true);
/// let app: Router = Router::new()
///     .route("/", get(|| async { "ok" }))
///     .layer(middleware::from_fn_with_state(logger, log_request));
/// ```
#[derive(Clone)]
pub struct RequestLogger {
    log_response: bool,
    sink: Arc<dyn LogSink>,
}

impl RequestLogger {
    /// Create a logger with response capture disabled and [`TracingSink`] as
    /// the destination.
    pub fn new() -> Self {
        Self {
            log_response: false,
            sink: Arc::new(TracingSink),
        }
    }

    /// Enable or disable capturing the response payload into the record.
    pub fn log_response(mut self, enabled: bool) -> Self {
        self.log_response = enabled;
        self
    }

    /// Replace the sink entries are emitted to.
    pub fn sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Replace the sink with an already-shared handle.
    pub fn shared_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }
}

impl Default for RequestLogger {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Middleware that logs every request passing through the router.
///
/// For each request this:
/// 1. Extracts the inbound `X-Request-ID` header, generating a UUID v4 when
///    the header is absent or empty
/// 2. Stores a [`RequestId`] and a [`RequestErrors`] accumulator in the
///    request extensions for downstream handlers
/// 3. Buffers the payload of POST/PUT/PATCH requests and replays it to the
///    handler
/// 4. Delegates to the rest of the stack, measuring handler latency
/// 5. Echoes the correlation id as the `X-Request-ID` response header
/// 6. Emits one error-level entry per recorded error, or else exactly one
///    [`RequestRecord`] to the configured sink
///
/// With response capture enabled the record is completed and emitted once
/// the response body has finished streaming to the client.
pub async fn log_request(
    State(logger): State<RequestLogger>,
    mut request: Request,
    next: Next,
) -> Response {
    let request_id = extract_or_generate_request_id(&request);
    let errors = RequestErrors::new();

    request.extensions_mut().insert(request_id.clone());
    request.extensions_mut().insert(errors.clone());

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let query = request.uri().query().unwrap_or_default().to_string();
    let ip = client_ip(&request);
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let mutating = method == Method::POST || method == Method::PUT || method == Method::PATCH;

    // Mutating requests get their payload buffered for the record, with no
    // size cap, and replayed to the handler.
    let mut request_body: Option<Bytes> = None;
    let mut body_read_error: Option<String> = None;
    if mutating {
        let (parts, body) = request.into_parts();
        match to_bytes(body, usize::MAX).await {
            Ok(bytes) => {
                request = Request::from_parts(parts, Body::from(bytes.clone()));
                request_body = Some(bytes);
            }
            Err(error) => {
                body_read_error = Some(error.to_string());
                request = Request::from_parts(parts, Body::empty());
            }
        }
    }

    let start = Instant::now();
    let mut response = next.run(request).await;
    let latency = start.elapsed();
    let time = Utc::now();

    if let Ok(header_value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, header_value);
    }

    // Recorded errors preempt the request record: one error-level entry per
    // recorded error and nothing else.
    let recorded = errors.messages();
    if !recorded.is_empty() {
        for message in &recorded {
            logger.sink.emit_error(message);
        }
        return response;
    }

    if let Some(error) = body_read_error {
        logger
            .sink
            .emit_error(&format!("error while reading request body: {error}"));
    }

    let record = RequestRecord {
        request_id: request_id.as_str().to_string(),
        status: response.status().as_u16(),
        method: method.to_string(),
        path,
        query,
        ip,
        user_agent,
        latency,
        time,
        request_body: if mutating {
            Some(
                request_body
                    .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                    .unwrap_or_default(),
            )
        } else {
            None
        },
        response_body: None,
    };

    if logger.log_response {
        let (parts, body) = response.into_parts();
        let wrapped = Body::new(CaptureBody::new(body, record, Arc::clone(&logger.sink)));
        Response::from_parts(parts, wrapped)
    } else {
        logger.sink.emit(&record);
        response
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Extract the inbound correlation id, or generate a fresh one when the
/// header is absent or carries an empty value.
fn extract_or_generate_request_id(request: &Request) -> RequestId {
    request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(|value| RequestId(value.to_string()))
        .unwrap_or_else(RequestId::new)
}

/// Resolve the client IP: first hop of `X-Forwarded-For`, then `X-Real-IP`,
/// then the peer address recorded by the server, then empty.
fn client_ip(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get(FORWARDED_FOR_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').map(str::trim).find(|hop| !hop.is_empty()) {
            return first.to_string();
        }
    }

    if let Some(real_ip) = request
        .headers()
        .get(REAL_IP_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        return real_ip.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn empty_request() -> Request {
        Request::builder().uri("/").body(Body::empty()).unwrap()
    }

    #[test]
    fn test_generates_request_id_when_header_missing() {
        let request = empty_request();
        let id = extract_or_generate_request_id(&request);
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn test_extracts_existing_request_id() {
        let request = Request::builder()
            .uri("/")
            .header(REQUEST_ID_HEADER, "abc-123")
            .body(Body::empty())
            .unwrap();

        let id = extract_or_generate_request_id(&request);
        assert_eq!(id.as_str(), "abc-123");
    }

    #[test]
    fn test_regenerates_when_header_empty() {
        let request = Request::builder()
            .uri("/")
            .header(REQUEST_ID_HEADER, "")
            .body(Body::empty())
            .unwrap();

        let id = extract_or_generate_request_id(&request);
        assert!(!id.as_str().is_empty());
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn test_client_ip_prefers_forwarded_for_first_hop() {
        let request = Request::builder()
            .uri("/")
            .header(FORWARDED_FOR_HEADER, "1.2.3.4, 5.6.7.8")
            .header(REAL_IP_HEADER, "9.9.9.9")
            .body(Body::empty())
            .unwrap();

        assert_eq!(client_ip(&request), "1.2.3.4");
    }

    #[test]
    fn test_client_ip_falls_back_to_real_ip() {
        let request = Request::builder()
            .uri("/")
            .header(REAL_IP_HEADER, "9.9.9.9")
            .body(Body::empty())
            .unwrap();

        assert_eq!(client_ip(&request), "9.9.9.9");
    }

    #[test]
    fn test_client_ip_uses_peer_address() {
        let request = Request::builder()
            .uri("/")
            .extension(ConnectInfo(SocketAddr::from(([192, 168, 1, 9], 4321))))
            .body(Body::empty())
            .unwrap();

        assert_eq!(client_ip(&request), "192.168.1.9");
    }

    #[test]
    fn test_client_ip_empty_when_unknown() {
        let request = empty_request();
        assert_eq!(client_ip(&request), "");
    }

    #[test]
    fn test_logger_defaults() {
        let logger = RequestLogger::new();
        assert!(!logger.log_response);

        let logger = logger.log_response(true);
        assert!(logger.log_response);
    }
}
