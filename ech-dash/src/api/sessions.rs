//! Session lifecycle and control events

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use ech_common::Error;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::selection::{ControlEvent, ControlUpdate};
use crate::session::{Session, View};
use crate::AppState;

/// POST /api/sessions response
#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    pub view: View,
}

/// Look up a live session or 404
pub(crate) async fn find_session(state: &AppState, id: Uuid) -> ApiResult<Arc<Session>> {
    state
        .registry
        .get(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("session {}", id)))
}

/// POST /api/sessions
pub async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let session = state.registry.create().await;
    let view = session.view().await;
    (
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: session.id,
            view,
        }),
    )
}

/// GET /api/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<View>> {
    let session = find_session(&state, id).await?;
    Ok(Json(session.view().await))
}

/// DELETE /api/sessions/:id
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if state.registry.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("session {}", id)))
    }
}

/// Decode a control update, normalizing malformed tri-state values unless strict
fn decode_control(update: &ControlUpdate, strict: bool) -> ApiResult<ControlEvent> {
    match ControlEvent::decode(update) {
        Ok(event) => Ok(event),
        Err(Error::MalformedSelection(msg)) if !strict => match ControlEvent::normalized(update) {
            Some(event) => {
                warn!(
                    "Malformed value for '{}' normalized to default: {}",
                    update.control, msg
                );
                Ok(event)
            }
            None => Err(ApiError::BadRequest(msg)),
        },
        Err(e) => Err(e.into()),
    }
}

/// POST /api/sessions/:id/controls
pub async fn post_control(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<ControlUpdate>,
) -> ApiResult<Json<View>> {
    let session = find_session(&state, id).await?;
    let event = decode_control(&update, state.strict_controls)?;
    debug!("Session {} control {} -> {:?}", id, update.control, event);
    let view = session.apply(event).await?;
    Ok(Json(view))
}
