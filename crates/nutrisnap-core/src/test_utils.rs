//! Test utilities for nutrisnap-core
//!
//! A mock server speaking both the upstream `generateContent` API and the
//! proxy's `/api/*` routes, for integration tests and local development.

use std::net::SocketAddr;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::ai::{lookup_calories, DEFAULT_MODEL};

/// Mock upstream + proxy server
pub struct MockGeminiServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

#[derive(Clone, Copy)]
struct MockState {
    /// Reject every request as if the credential were missing or invalid
    failing: bool,
}

impl MockGeminiServer {
    /// Start a server that answers every request
    pub async fn start() -> Self {
        Self::start_with(MockState { failing: false }).await
    }

    /// Start a server that rejects every generation request
    pub async fn start_failing() -> Self {
        Self::start_with(MockState { failing: true }).await
    }

    async fn start_with(state: MockState) -> Self {
        let app = Router::new()
            .route(
                "/v1beta/models/:model_action",
                get(handle_model_info).post(handle_generate_content),
            )
            .route("/api/analyze", post(handle_proxy))
            .route("/api/recalculate", post(handle_proxy))
            .route("/api/health", get(handle_health))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Base URL, usable as both `GEMINI_HOST` and `NUTRISNAP_PROXY_URL`
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockGeminiServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn invalid_key() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT"
            }
        })),
    )
        .into_response()
}

async fn handle_model_info(
    State(state): State<MockState>,
    Path(model): Path<String>,
) -> Response {
    if state.failing {
        return invalid_key();
    }
    Json(json!({"name": format!("models/{}", model), "displayName": model})).into_response()
}

async fn handle_generate_content(
    State(state): State<MockState>,
    Path(model_action): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let Some((model, "generateContent")) = model_action.split_once(':') else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if state.failing {
        return invalid_key();
    }
    Json(generate(model, &body)).into_response()
}

async fn handle_proxy(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    if state.failing {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "API Key not configured in environment"})),
        )
            .into_response();
    }
    Json(generate(DEFAULT_MODEL, &body)).into_response()
}

async fn handle_health(State(state): State<MockState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "upstream_configured": !state.failing,
        "model": DEFAULT_MODEL,
    }))
}

/// Answer a `generateContent` body based on its prompt
fn generate(model: &str, body: &Value) -> Value {
    let prompt = body
        .pointer("/contents/0/parts/0/text")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let text = if prompt.contains("Identify ALL food items") {
        json!({
            "foods": [{
                "name": "쌀밥",
                "nameKo": "쌀밥",
                "nameEn": "Rice",
                "weight": "150g",
                "calories": 200,
                "carbs": 45,
                "protein": 4,
                "fat": 1
            }],
            "brands": [{
                "brandName": "A",
                "productName": "B",
                "nutritionInfo": {"sodium": "10mg"},
                "calories": 150,
                "weight": "100g"
            }]
        })
        .to_string()
    } else {
        let name = quoted_name(prompt).unwrap_or_default();
        let lookup = lookup_calories(name);
        if prompt.contains("caloriesPer100g") {
            json!({
                "nameKo": lookup.name_ko,
                "nameEn": lookup.name_en,
                "caloriesPer100g": lookup.calories_per_100
            })
            .to_string()
        } else {
            lookup.calories_per_100.to_string()
        }
    };

    json!({
        "candidates": [{
            "content": {"parts": [{"text": text}], "role": "model"},
            "finishReason": "STOP"
        }],
        "modelVersion": model
    })
}

/// First double-quoted run in the prompt (the food name)
fn quoted_name(prompt: &str) -> Option<&str> {
    let start = prompt.find('"')? + 1;
    let end = prompt[start..].find('"')?;
    Some(&prompt[start..start + end])
}
