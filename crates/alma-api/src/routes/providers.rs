use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use alma_types::{Provider, ProviderKind};
use crate::{error::{ApiError, ApiResult}, state::AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertProviderRequest {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// List providers; API keys are never returned
pub async fn list_providers(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Provider>>> {
    Ok(Json(state.persist.list_providers().await?))
}

/// Create or replace a provider
pub async fn upsert_provider(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpsertProviderRequest>,
) -> ApiResult<(StatusCode, Json<Provider>)> {
    if req.id.is_empty() || req.id.contains('/') {
        return Err(ApiError::BadRequest(
            "provider id must be non-empty and must not contain '/'".to_string(),
        ));
    }

    let mut provider = Provider::new(req.id, req.name, req.kind).with_enabled(req.enabled);
    if let Some(key) = req.api_key {
        provider = provider.with_api_key(key);
    }
    if let Some(url) = req.base_url {
        provider = provider.with_base_url(url);
    }

    let provider = state.persist.upsert_provider(provider).await?;
    Ok((StatusCode::CREATED, Json(provider)))
}

pub async fn delete_provider(
    State(state): State<Arc<AppState>>,
    Path(provider_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.persist.delete_provider(&provider_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
