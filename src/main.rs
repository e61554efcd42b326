//! Demo server for the request-logging middleware.
//!
//! Serves a couple of toy routes with [`log_request`] installed, so the
//! middleware's output can be inspected with curl: correlation id echoing,
//! per-request records on stdout, error-level entries for failed requests,
//! and optional response body capture.

use anyhow::{Context, Result};
use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use axum_request_logger::{log_request, RequestErrors, RequestId, RequestLogger};

/// Demo server for the request-logging middleware.
#[derive(Parser, Debug)]
#[command(name = "demo-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on (overrides PORT env var)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to (overrides HOST env var)
    #[arg(long)]
    host: Option<String>,

    /// Log level: trace, debug, info, warn, error (overrides LOG_LEVEL env var)
    #[arg(long)]
    log_level: Option<String>,

    /// Capture response bodies into the request records (overrides LOG_RESPONSE env var)
    #[arg(long)]
    log_response: bool,
}

// ============================================================================
// Settings
// ============================================================================

/// Server settings, loaded from environment variables with defaults.
#[derive(Debug, Clone)]
struct Settings {
    host: String,
    port: u16,
    log_level: String,
    log_response: bool,
}

impl Settings {
    /// Load settings from environment variables with defaults
    fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let settings = Self {
            host: env_or_default("HOST", "0.0.0.0"),
            port: env_or_default("PORT", "8000")
                .parse()
                .context("Invalid PORT value")?,
            log_level: env_or_default("LOG_LEVEL", "info"),
            log_response: env_or_default("LOG_RESPONSE", "false")
                .parse()
                .unwrap_or(false),
        };

        settings.validate()?;

        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("Port cannot be 0");
        }
        Ok(())
    }

    /// Get the server address string
    fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Helper function to get environment variable with default
fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

// ============================================================================
// Routes
// ============================================================================

/// Create the demo router with the logging middleware installed.
fn create_router(logger: RequestLogger) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/items", get(list_items).post(create_item))
        .layer(create_cors_layer())
        // Request logging runs outermost so every request gets a record
        .layer(middleware::from_fn_with_state(logger, log_request))
}

/// Create CORS layer with permissive settings for development
fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            // Expose the correlation id header to browser clients
            "x-request-id".parse().unwrap(),
        ])
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Serialize)]
struct Item {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct CreateItem {
    name: String,
}

#[derive(Debug, Serialize)]
struct ItemsResponse {
    request_id: String,
    items: Vec<Item>,
}

/// List items, echoing the correlation id retrieved from the request context.
async fn list_items(Extension(request_id): Extension<RequestId>) -> Json<ItemsResponse> {
    Json(ItemsResponse {
        request_id: request_id.to_string(),
        items: vec![Item {
            id: 1,
            name: "example".to_string(),
        }],
    })
}

/// Create an item, recording a request error when validation fails.
async fn create_item(
    Extension(errors): Extension<RequestErrors>,
    Json(item): Json<CreateItem>,
) -> Result<(StatusCode, Json<Item>), AppError> {
    if item.name.trim().is_empty() {
        let error = AppError::InvalidItem("name must not be empty".to_string());
        errors.record(&error);
        return Err(error);
    }

    Ok((StatusCode::CREATED, Json(Item { id: 1, name: item.name })))
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
enum AppError {
    #[error("Invalid item: {0}")]
    InvalidItem(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::InvalidItem(_) => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

// ============================================================================
// Startup
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration first (before logging, so we can use log_level)
    let mut settings = Settings::load()?;

    // Override settings with CLI arguments
    if let Some(port) = args.port {
        settings.port = port;
    }
    if let Some(host) = args.host {
        settings.host = host;
    }
    if let Some(log_level) = args.log_level {
        settings.log_level = log_level;
    }
    if args.log_response {
        settings.log_response = true;
    }

    // Initialize tracing subscriber with JSON output
    init_tracing(&settings.log_level);

    tracing::info!(
        host = %settings.host,
        port = settings.port,
        log_response = settings.log_response,
        "Starting demo server"
    );

    let logger = RequestLogger::new().log_response(settings.log_response);
    let router = create_router(logger);

    let addr = settings.server_addr().parse::<SocketAddr>()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Serve with ConnectInfo so the middleware can resolve peer addresses
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Demo server shutdown complete");

    Ok(())
}

/// Initialize tracing subscriber with the specified log level
fn init_tracing(log_level: &str) {
    // Build filter from RUST_LOG env var or use provided log level
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let console_layer = fmt::layer().json().with_filter(filter);

    tracing_subscriber::registry().with(console_layer).init();
}

/// Create a future that completes when a shutdown signal is received
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
