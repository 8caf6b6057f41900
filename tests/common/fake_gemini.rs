//! Stand-in for the Gemini `generateContent` endpoint
//!
//! Answers with the text of the inline image (so tests choose the category by
//! choosing the image bytes), or echoes the prompt when there is no image.

use super::constants::*;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct FakeGemini {
    /// Base URL to hand to `GeminiClient` (ends in `/v1beta`)
    pub base_url: String,
    calls: Arc<AtomicUsize>,
    _shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

impl FakeGemini {
    pub async fn spawn() -> Self {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/v1beta/models/{model_action}", post(generate_content))
            .with_state(calls.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake Gemini");
        let addr = listener.local_addr().expect("Failed to get local address");
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Fake Gemini failed");
        });

        Self {
            base_url: format!("http://{}/v1beta", addr),
            calls,
            _shutdown_tx: shutdown_tx,
        }
    }

    /// Number of generateContent requests received so far
    #[allow(dead_code)]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

async fn generate_content(
    State(calls): State<Arc<AtomicUsize>>,
    Path(model_action): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    calls.fetch_add(1, Ordering::SeqCst);

    if model_action != format!("{}:generateContent", TEST_MODEL) {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"message": "unknown model"}})),
        );
    }
    if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some(TEST_API_KEY) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"message": "bad key"}})),
        );
    }

    let parts = body["contents"][0]["parts"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    let prompt = parts
        .iter()
        .find_map(|p| p["text"].as_str())
        .unwrap_or_default()
        .to_string();
    let image_text = parts
        .iter()
        .find_map(|p| p["inline_data"]["data"].as_str())
        .and_then(|data| BASE64.decode(data).ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).to_string());

    let answer = match image_text {
        Some(text) if text.contains(FAILING_IMAGE_MARKER) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": {"message": "model exploded"}})),
            )
        }
        Some(text) => text,
        None => format!("echo: {}", prompt),
    };

    (
        StatusCode::OK,
        Json(json!({
            "candidates": [{
                "content": {"parts": [{"text": answer}]},
                "finishReason": "STOP"
            }]
        })),
    )
}
