use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::BroadcastStream;

use alma_types::{ApprovalDecision, PermissionRequest};
use crate::{error::{ApiError, ApiResult}, state::AppState};

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub decision: ApprovalDecision,
}

#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub id: String,
    pub decision: ApprovalDecision,
}

/// Most recent request still awaiting a decision, or `null`
pub async fn pending_request(State(state): State<Arc<AppState>>) -> Json<Option<PermissionRequest>> {
    Json(state.gate.get_latest_pending_request())
}

pub async fn decide(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<String>,
    Json(req): Json<DecisionRequest>,
) -> ApiResult<Json<DecisionResponse>> {
    if !state.gate.handle_decision(&request_id, req.decision) {
        return Err(ApiError::NotFound(format!(
            "Permission request not found: {}",
            request_id
        )));
    }
    Ok(Json(DecisionResponse {
        id: request_id,
        decision: req.decision,
    }))
}

/// Permission notifications as Server-Sent Events.
///
/// A request still pending at connect time is replayed first.
pub async fn permission_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Subscribe before the snapshot so nothing falls in between
    let events = BroadcastStream::new(state.gate.subscribe());
    let replay = state
        .gate
        .get_latest_pending_request()
        .map(alma_tools::PermissionEvent::Required);

    let live = events.filter_map(|event| async move {
        match event {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!("Permission event stream lagged: {}", e);
                None
            }
        }
    });

    let stream = futures::stream::iter(replay)
        .chain(live)
        .filter_map(|event| async move {
            Event::default()
                .event(event.event_name())
                .json_data(&event)
                .ok()
                .map(Ok)
        });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
