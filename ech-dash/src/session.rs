//! Dashboard sessions
//!
//! Each browser tab gets a [`Session`] owning its own survey handle and
//! pipeline state. Control events on one session are serialized through an
//! async mutex; the load and summary channels each carry a cancellation
//! token so a newer event supersedes older in-flight work.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use ech_common::events::{EchEvent, EventBus, WorkChannel};
use ech_common::{Error, Result, SurveyHandle, Table};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::pipeline::chart_controls::AxisOptions;
use crate::pipeline::render::{ColumnSpec, Figure, TableView};
use crate::pipeline::graph::{self, Signal};
use crate::pipeline::{self, ChoiceOption, Derived, Inputs, Notice};
use crate::selection::ControlEvent;

/// Buffered events per session before slow SSE listeners start lagging
const EVENT_CAPACITY: usize = 64;

/// Creates the survey handle for a new session
pub type SurveyFactory = Arc<dyn Fn() -> Box<dyn SurveyHandle> + Send + Sync>;

type SharedSurvey = Arc<StdMutex<Box<dyn SurveyHandle>>>;

/// Recover the guard from a poisoned lock; the protected data stays usable
fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct SessionState {
    inputs: Inputs,
    derived: Derived,
    /// Signals whose recompute was superseded and not yet redone
    stale: BTreeSet<Signal>,
}

/// Table header info carried in the view; rows are fetched paged
#[derive(Debug, Clone, Serialize)]
pub struct TableMeta {
    pub columns: Vec<ColumnSpec>,
    pub total_rows: usize,
    pub page_size: usize,
}

/// Snapshot of a session as rendered by the UI
#[derive(Debug, Clone, Serialize)]
pub struct View {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub inputs: Inputs,
    /// Summary controls are enabled
    pub fully_loaded: bool,
    pub status: String,
    pub load_error: Option<String>,
    /// Choices for the variable and grouping dropdowns
    pub variables: Vec<ChoiceOption>,
    pub dictionary_visible: bool,
    pub dictionary_error: Option<String>,
    pub reveal: bool,
    pub summary_error: Option<String>,
    pub axis_options: AxisOptions,
    pub table: Option<TableMeta>,
    pub chart: Option<Figure>,
}

pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    survey: SharedSurvey,
    state: Mutex<SessionState>,
    tokens: StdMutex<HashMap<&'static str, CancellationToken>>,
    events: EventBus,
    last_seen: StdMutex<Instant>,
}

impl Session {
    pub fn new(id: Uuid, survey: Box<dyn SurveyHandle>) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            survey: Arc::new(StdMutex::new(survey)),
            state: Mutex::new(SessionState::default()),
            tokens: StdMutex::new(HashMap::new()),
            events: EventBus::new(EVENT_CAPACITY),
            last_seen: StdMutex::new(Instant::now()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EchEvent> {
        self.events.subscribe()
    }

    pub fn touch(&self) {
        *lock(&self.last_seen) = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        lock(&self.last_seen).elapsed()
    }

    /// Cancel in-flight work for `control` and hand out the new token
    fn supersede(&self, control: &'static str) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some(previous) = lock(&self.tokens).insert(control, token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Cancel all in-flight work
    pub fn cancel_all(&self) {
        for (_, token) in lock(&self.tokens).drain() {
            token.cancel();
        }
    }

    /// Apply one control event and recompute the affected nodes
    ///
    /// A newer event for the same control cancels this one, which then
    /// returns [`Error::Superseded`]. The selection itself is still recorded;
    /// only its recompute is dropped, and the next event to run redoes it
    /// before its own.
    pub async fn apply(&self, event: ControlEvent) -> Result<View> {
        self.touch();
        let channel = event.channel();
        // Installed before queueing on the state lock so later events can cancel us
        let token = channel.map(|_| self.supersede(event.control()));

        let mut state = self.state.lock().await;
        if let (Some(channel), Some(token)) = (channel, &token) {
            if token.is_cancelled() {
                return Err(self.abandon(&mut state, event, channel));
            }
        }

        let signal = event.signal();
        // The event's own plan covers its signal
        let catch_up: Vec<Signal> = state.stale.iter().copied().filter(|s| *s != signal).collect();
        let mut inputs = state.inputs.clone();
        let mut derived = state.derived.clone();
        let pending = event.clone();
        debug!("Session {} applying {:?}, catching up {:?}", self.id, signal, catch_up);

        if let Some(channel) = channel {
            self.events.emit_lossy(EchEvent::Busy {
                session_id: self.id,
                channel,
                timestamp: Utc::now(),
            });
        }

        let survey = Arc::clone(&self.survey);
        let work = tokio::task::spawn_blocking(move || {
            let mut guard = lock(&survey);
            let handle = &mut **guard;
            let mut notices = Vec::new();
            for stale in catch_up {
                let plan = graph::schedule(stale);
                notices.extend(pipeline::run(&plan, stale, &mut inputs, &mut derived, handle));
            }
            let signal = inputs.apply(event);
            let plan = graph::schedule(signal);
            notices.extend(pipeline::run(&plan, signal, &mut inputs, &mut derived, handle));
            (inputs, derived, notices)
        });

        let joined = match (channel, &token) {
            (Some(channel), Some(token)) => {
                let outcome = tokio::select! {
                    biased;
                    _ = token.cancelled() => None,
                    joined = work => Some(joined),
                };
                self.events.emit_lossy(EchEvent::Idle {
                    session_id: self.id,
                    timestamp: Utc::now(),
                });
                match outcome {
                    Some(joined) => joined,
                    // The blocking call finishes in the background; its result is dropped
                    None => return Err(self.abandon(&mut state, pending, channel)),
                }
            }
            _ => work.await,
        };
        let (inputs, derived, notices) =
            joined.map_err(|e| Error::Internal(format!("pipeline task failed: {}", e)))?;

        state.inputs = inputs;
        state.derived = derived;
        state.stale.clear();
        for notice in notices {
            self.emit_notice(notice);
        }
        Ok(self.view_of(&state))
    }

    /// Record a superseded event's selection and mark its recompute stale
    fn abandon(&self, state: &mut SessionState, event: ControlEvent, channel: WorkChannel) -> Error {
        let control = event.control();
        let signal = state.inputs.apply(event);
        state.stale.insert(signal);
        warn!(
            "Session {}: {:?} work for '{}' superseded",
            self.id, channel, control
        );
        self.events.emit_lossy(EchEvent::Superseded {
            session_id: self.id,
            channel,
            timestamp: Utc::now(),
        });
        Error::Superseded
    }

    fn emit_notice(&self, notice: Notice) {
        let session_id = self.id;
        let timestamp = Utc::now();
        let event = match notice {
            Notice::Loaded {
                year,
                weights,
                status,
            } => {
                info!("Session {}: loaded {} with {}", session_id, year, weights);
                EchEvent::SurveyLoaded {
                    session_id,
                    year,
                    weights,
                    status,
                    timestamp,
                }
            }
            Notice::LoadFailed(message) => EchEvent::LoadFailed {
                session_id,
                message,
                timestamp,
            },
            Notice::SummaryUpdated(rows) => EchEvent::SummaryUpdated {
                session_id,
                rows,
                timestamp,
            },
            Notice::SummaryFailed(message) => EchEvent::SummaryFailed {
                session_id,
                message,
                timestamp,
            },
        };
        self.events.emit_lossy(event);
    }

    fn view_of(&self, state: &SessionState) -> View {
        let derived = &state.derived;
        View {
            session_id: self.id,
            created_at: self.created_at,
            inputs: state.inputs.clone(),
            fully_loaded: derived.load.fully_loaded,
            status: derived.load.status.clone(),
            load_error: derived.load.error.clone(),
            variables: derived.load.catalog.clone(),
            dictionary_visible: derived.dictionary.is_some(),
            dictionary_error: derived.dictionary_error.clone(),
            reveal: derived.summary.reveal,
            summary_error: derived.summary.error.clone(),
            axis_options: derived.axis_options.clone(),
            table: derived.rendered.as_ref().map(|r| TableMeta {
                columns: r.table.columns.clone(),
                total_rows: r.table.table.len(),
                page_size: r.table.page_size,
            }),
            chart: derived.rendered.as_ref().map(|r| r.chart.clone()),
        }
    }

    pub async fn view(&self) -> View {
        self.touch();
        let state = self.state.lock().await;
        self.view_of(&state)
    }

    /// Rendered summary table, if any
    pub async fn table(&self) -> Option<TableView> {
        self.touch();
        let state = self.state.lock().await;
        state.derived.rendered.as_ref().map(|r| r.table.clone())
    }

    /// Visible dictionary, if any
    pub async fn dictionary(&self) -> Option<Table> {
        self.touch();
        let state = self.state.lock().await;
        state.derived.dictionary.clone()
    }
}

/// All live sessions
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
    factory: SurveyFactory,
}

impl SessionRegistry {
    pub fn new(factory: SurveyFactory) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            factory,
        }
    }

    pub async fn create(&self) -> Arc<Session> {
        let session = Arc::new(Session::new(Uuid::new_v4(), (self.factory)()));
        self.sessions
            .write()
            .await
            .insert(session.id, Arc::clone(&session));
        info!("Session {} created", session.id);
        session
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<Session>> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Drop a session and its survey handle
    pub async fn remove(&self, id: Uuid) -> bool {
        match self.sessions.write().await.remove(&id) {
            Some(session) => {
                session.cancel_all();
                info!("Session {} deleted", id);
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Remove sessions idle for at least `timeout`; returns how many
    pub async fn sweep_idle(&self, timeout: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, session| {
            let keep = session.idle_for() < timeout;
            if !keep {
                session.cancel_all();
                info!("Session {} expired after {:?} idle", id, session.idle_for());
            }
            keep
        });
        before - sessions.len()
    }
}
