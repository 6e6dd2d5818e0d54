//! Upstream relay and health handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{AppError, AppState, MISSING_KEY_MESSAGE};
use nutrisnap_core::ai::AIBackend;

/// POST /api/analyze - Relay a photo analysis request upstream
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    relay(&state, "analyze", payload).await
}

/// POST /api/recalculate - Relay a name lookup request upstream
pub async fn recalculate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    relay(&state, "recalculate", payload).await
}

/// Forward the body unchanged and answer with the upstream status and JSON
///
/// The credential is checked before the body so a misconfigured proxy always
/// reports the missing key.
async fn relay(
    state: &AppState,
    route: &str,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let upstream = state
        .upstream
        .as_ref()
        .ok_or_else(|| AppError::internal(MISSING_KEY_MESSAGE))?;

    let Json(body) =
        payload.map_err(|rejection| AppError::new(rejection.status(), &rejection.body_text()))?;

    match upstream.forward(&body).await {
        Ok((status, body)) => {
            debug!(route, status, "Upstream answered");
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            Ok((status, Json(body)).into_response())
        }
        Err(e) => {
            warn!(route, "Upstream request failed");
            Err(e.into())
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub upstream_configured: bool,
    pub model: Option<String>,
}

/// GET /api/health - Liveness and upstream configuration
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        upstream_configured: state.upstream.is_some(),
        model: state.upstream.as_ref().map(|u| u.model().to_string()),
    })
}
