//! Server-Sent Events (SSE) utilities

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

use crate::events::EchEvent;

/// Convert one event into an SSE frame, `event:` set to its type
pub fn to_sse_event(event: &EchEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().event(event.event_type()).data(json)),
        Err(e) => {
            warn!("Failed to serialize event: {}", e);
            None
        }
    }
}

/// Stream a session's events to one SSE client
///
/// Starts with a `ConnectionStatus: connected` frame; lagged receivers skip
/// the dropped events and keep streaming.
pub fn create_event_sse_stream(
    rx: broadcast::Receiver<EchEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("New SSE client connected");

    let connected = stream::once(async {
        Ok::<_, Infallible>(Event::default().event("ConnectionStatus").data("connected"))
    });

    let events = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => to_sse_event(&event).map(Ok),
            Err(e) => {
                warn!("SSE stream error: {:?}", e);
                None
            }
        }
    });

    Sse::new(connected.chain(events)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
