//! Session event types
//!
//! Each dashboard session owns an [`EventBus`]; its events are streamed to
//! the browser over SSE to drive the busy spinner and result notices.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::survey::Weights;

/// Long-running work channels. A newer request on a channel supersedes the
/// in-flight one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkChannel {
    /// Year / weights selection
    Load,
    /// Summary inputs
    Summary,
}

/// ECH session events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EchEvent {
    /// Work started; the UI shows the loading overlay
    Busy {
        session_id: Uuid,
        channel: WorkChannel,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Work finished (successfully or not)
    Idle {
        session_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Survey year and weights are both in place
    SurveyLoaded {
        session_id: Uuid,
        year: u16,
        weights: Weights,
        status: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Load or weight assignment failed
    LoadFailed {
        session_id: Uuid,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A new summary artifact was published
    SummaryUpdated {
        session_id: Uuid,
        rows: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Summarization failed; no artifact
    SummaryFailed {
        session_id: Uuid,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// In-flight work was replaced by a newer request
    Superseded {
        session_id: Uuid,
        channel: WorkChannel,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl EchEvent {
    /// Event type as string, used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            EchEvent::Busy { .. } => "Busy",
            EchEvent::Idle { .. } => "Idle",
            EchEvent::SurveyLoaded { .. } => "SurveyLoaded",
            EchEvent::LoadFailed { .. } => "LoadFailed",
            EchEvent::SummaryUpdated { .. } => "SummaryUpdated",
            EchEvent::SummaryFailed { .. } => "SummaryFailed",
            EchEvent::Superseded { .. } => "Superseded",
        }
    }
}

/// Broadcast channel for one session's events
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<EchEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<EchEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: EchEvent) {
        let _ = self.tx.send(event);
    }
}
