//! Request-logging middleware for axum.
//!
//! [`log_request`] wraps every request passing through a router: it tags the
//! request with a correlation id (generated, or echoed from the inbound
//! `X-Request-ID` header), stores the id in the request extensions, measures
//! handler latency, sets the id on the response, and emits one structured
//! [`RequestRecord`] per request to a pluggable [`LogSink`]. Errors recorded
//! by handlers through [`RequestErrors`] replace the record with one
//! error-level entry each. With response capture enabled, the response body
//! streams to the client unchanged while a copy lands in the record.
//!
//! ```no_run
//! use axum::{middleware, routing::get, Router};
//! use axum_request_logger::{log_request, RequestLogger};
//!
//! #[tokio::main]
//! async fn main() {
//!     let logger = RequestLogger::new().log_response(true);
//!
//!     let app = Router::new()
//!         .route("/", get(|| async { "ok" }))
//!         .layer(middleware::from_fn_with_state(logger, log_request));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

// Public modules
pub mod capture;
pub mod context;
pub mod logging;
pub mod record;
pub mod sink;

// Re-export commonly used types
pub use context::{get_request_errors, get_request_id, RequestErrors, RequestId};
pub use logging::{log_request, RequestLogger, REQUEST_ID_HEADER};
pub use record::RequestRecord;
pub use sink::{LogSink, MemorySink, TracingSink};
