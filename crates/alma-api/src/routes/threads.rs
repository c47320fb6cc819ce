use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use alma_types::{ModelRef, Thread, ThreadUpdate};
use crate::{error::{ApiError, ApiResult}, state::AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateThreadRequest {
    #[serde(default = "default_title")]
    pub title: String,
    pub model: Option<String>,
}

fn default_title() -> String {
    "New chat".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ListThreadsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

fn check_model(model: Option<&str>) -> ApiResult<()> {
    if let Some(model) = model {
        model
            .parse::<ModelRef>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    }
    Ok(())
}

/// Create a new thread
pub async fn create_thread(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateThreadRequest>,
) -> ApiResult<(StatusCode, Json<Thread>)> {
    check_model(req.model.as_deref())?;

    let mut thread = Thread::new(req.title);
    thread.model = req.model;
    if let Some(ws) = state.sandbox.active_workspace() {
        thread = thread.with_workspace(ws.id);
    }

    let thread = state.persist.create_thread(thread).await?;
    Ok((StatusCode::CREATED, Json(thread)))
}

/// List threads, most recently updated first
pub async fn list_threads(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListThreadsQuery>,
) -> ApiResult<Json<Vec<Thread>>> {
    let limit = query.limit.min(100); // Cap at 100
    let threads = state.persist.list_threads(Some(limit)).await?;
    Ok(Json(threads))
}

/// Get a specific thread by ID
pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<Thread>> {
    let thread = state
        .persist
        .get_thread(&thread_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Thread not found: {}", thread_id)))?;
    Ok(Json(thread))
}

/// Update title, model or favorite flag
pub async fn update_thread(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
    Json(mut update): Json<ThreadUpdate>,
) -> ApiResult<Json<Thread>> {
    check_model(update.model.as_deref())?;
    // Owned by the orchestrator
    update.is_generating = None;

    let thread = state.persist.update_thread(&thread_id, update).await?;
    Ok(Json(thread))
}

/// Delete a thread and its messages
pub async fn delete_thread(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> ApiResult<StatusCode> {
    if state.session.is_generating(&thread_id) {
        return Err(ApiError::Conflict(format!(
            "Thread {} has a turn in progress",
            thread_id
        )));
    }

    state.persist.delete_thread(&thread_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
