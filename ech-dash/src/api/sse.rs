//! Server-Sent Events for session activity

use axum::{
    extract::{Path, State},
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use uuid::Uuid;

use super::sessions::find_session;
use crate::error::ApiResult;
use crate::AppState;

/// GET /api/sessions/:id/events
///
/// Streams busy/idle transitions and load/summary outcomes of one session.
pub async fn event_stream(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let session = find_session(&state, id).await?;
    Ok(ech_common::sse::create_event_sse_stream(session.subscribe()))
}
