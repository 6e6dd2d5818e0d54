//! NutriSnap Proxy Server
//!
//! Axum server that holds the upstream API credential and relays
//! `generateContent` requests for browser and CLI clients, so the key never
//! leaves the server. Optionally serves the static web UI.
//!
//! Routes:
//! - `POST /api/analyze`: photo analysis request, relayed as-is
//! - `POST /api/recalculate`: name lookup request, relayed as-is
//! - `GET /api/health`: liveness and whether an upstream key is configured

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};

use nutrisnap_core::ai::{AIBackend, GeminiBackend};

mod handlers;

/// Maximum request body size (20 MB; several photos inline as base64)
pub const MAX_BODY_SIZE: usize = 20 * 1024 * 1024;

/// Error message when no upstream credential is configured
pub const MISSING_KEY_MESSAGE: &str = "API Key not configured in environment";

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// Request body limit in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![],
            max_body_size: MAX_BODY_SIZE,
        }
    }
}

impl ServerConfig {
    /// Read `NUTRISNAP_ALLOWED_ORIGINS` (comma-separated)
    pub fn from_env() -> Self {
        let allowed_origins = std::env::var("NUTRISNAP_ALLOWED_ORIGINS")
            .map(|v| parse_origins(&v))
            .unwrap_or_default();
        Self {
            allowed_origins,
            ..Default::default()
        }
    }
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Shared application state
pub struct AppState {
    /// Upstream client; None when no API key is configured
    pub upstream: Option<GeminiBackend>,
    pub config: ServerConfig,
}

/// Create the application router
pub fn create_router(
    upstream: Option<GeminiBackend>,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> Router {
    match upstream {
        Some(ref client) => info!(
            "Upstream configured: {} (model: {})",
            client.host(),
            client.model()
        ),
        None => warn!("⚠️  GEMINI_API_KEY not set - proxy requests will fail with 500"),
    }

    let body_limit = config.max_body_size;
    let cors = cors_layer(&config.allowed_origins);
    let state = Arc::new(AppState { upstream, config });

    let api_routes = Router::new()
        .route("/analyze", post(handlers::analyze))
        .route("/recalculate", post(handlers::recalculate))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(body_limit));

    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' blob: data:; font-src 'self'; connect-src 'self'; frame-ancestors 'none'"
    );

    let security_headers = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    let mut app = Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(security_headers);

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if allowed_origins.is_empty() {
        return layer;
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    layer.allow_origin(origins)
}

/// Serve with the upstream and CORS settings taken from the environment
pub async fn serve(host: &str, port: u16, static_dir: Option<&str>) -> anyhow::Result<()> {
    serve_with_config(host, port, static_dir, ServerConfig::from_env()).await
}

pub async fn serve_with_config(
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    let upstream = GeminiBackend::from_env();
    if let Some(ref client) = upstream {
        if client.health_check().await {
            info!("✅ Upstream reachable: {} (model: {})", client.host(), client.model());
        } else {
            warn!(
                "⚠️  Upstream configured but not responding: {} (model: {})",
                client.host(),
                client.model()
            );
        }
    }

    let app = create_router(upstream, static_dir, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error with an HTTP status and a `{"error": ...}` body
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn new(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
            internal: Some(err),
        }
    }
}
