use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use alma_types::Message;
use crate::{error::{ApiError, ApiResult}, state::AppState};

/// List messages in a thread, oldest first
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<Vec<Message>>> {
    // Check if thread exists
    if state.persist.get_thread(&thread_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Thread not found: {}", thread_id)));
    }

    let messages = state.persist.get_messages(&thread_id).await?;
    Ok(Json(messages))
}
