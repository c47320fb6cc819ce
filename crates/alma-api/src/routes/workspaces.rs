use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

use alma_types::Workspace;
use crate::{error::{ApiError, ApiResult}, state::AppState};

#[derive(Debug, Deserialize)]
pub struct RegisterWorkspaceRequest {
    pub name: String,
    pub path: PathBuf,
}

pub async fn list_workspaces(State(state): State<Arc<AppState>>) -> Json<Vec<Workspace>> {
    Json(state.sandbox.list_workspaces())
}

/// Register an existing directory as a workspace
pub async fn register_workspace(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterWorkspaceRequest>,
) -> ApiResult<(StatusCode, Json<Workspace>)> {
    let workspace = state.sandbox.register_workspace(req.name, &req.path)?;
    Ok((StatusCode::CREATED, Json(workspace)))
}

/// Switch the active workspace
pub async fn activate_workspace(
    State(state): State<Arc<AppState>>,
    Path(workspace_id): Path<String>,
) -> ApiResult<Json<Workspace>> {
    if state.sandbox.get_workspace(&workspace_id).is_none() {
        return Err(ApiError::NotFound(format!("Workspace not found: {}", workspace_id)));
    }
    Ok(Json(state.sandbox.set_active(&workspace_id)?))
}
