use axum::{extract::State, Json};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::{error::ApiResult, state::AppState};

/// Application settings document, `{}` until first saved
pub async fn get_settings(State(state): State<Arc<AppState>>) -> ApiResult<Json<Map<String, Value>>> {
    Ok(Json(state.persist.get_settings().await?))
}

/// Replace the settings document; the body must be a JSON object
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(settings): Json<Map<String, Value>>,
) -> ApiResult<Json<Map<String, Value>>> {
    let saved = state.persist.update_settings(settings).await?;
    tracing::info!(keys = saved.len(), "Settings updated");
    Ok(Json(saved))
}
