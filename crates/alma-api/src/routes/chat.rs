use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{error::{ApiError, ApiResult}, state::AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub thread_id: String,
    pub message: String,
    /// `<providerId>/<modelName>`
    pub model: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatAccepted {
    pub thread_id: String,
    pub status: &'static str,
}

/// Start a turn; progress is delivered over the thread's push channel
pub async fn start_turn(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> ApiResult<(StatusCode, Json<ChatAccepted>)> {
    if req.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    let pending = state
        .session
        .begin_turn(&req.thread_id, &req.message, &req.model)
        .await?;

    tracing::info!(thread_id = %req.thread_id, model = %req.model, "Turn accepted");
    tokio::spawn(async move {
        // Failures are already logged and broadcast by the turn itself
        let _ = pending.run().await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(ChatAccepted {
            thread_id: req.thread_id,
            status: "accepted",
        }),
    ))
}
