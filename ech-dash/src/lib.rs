//! ech-dash library - ECH survey dashboard
//!
//! Serves a browser UI for summarizing the Encuesta Continua de Hogares:
//! pick a year and weights, a variable and its grouping, and get a weighted
//! table and bar chart back. Every browser session owns its own survey
//! handle and reactive pipeline state.

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use ech_common::survey::CsvSurvey;
use ech_common::SurveyHandle;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod pagination;
pub mod pipeline;
pub mod selection;
pub mod session;

pub use crate::error::{ApiError, ApiResult};
use session::{SessionRegistry, SurveyFactory};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Live sessions
    pub registry: Arc<SessionRegistry>,
    /// Folder holding the per-year survey files
    pub data_folder: PathBuf,
    /// Reject malformed control values instead of normalizing them
    pub strict_controls: bool,
    /// Service startup timestamp
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// State whose sessions read CSV surveys from `data_folder`
    ///
    /// Malformed controls are rejected in debug builds and normalized in
    /// release builds.
    pub fn new(data_folder: PathBuf) -> Self {
        let folder = data_folder.clone();
        let factory: SurveyFactory =
            Arc::new(move || Box::new(CsvSurvey::new(folder.clone())) as Box<dyn SurveyHandle>);
        Self::with_factory(data_folder, factory)
    }

    /// State with a custom survey factory
    pub fn with_factory(data_folder: PathBuf, factory: SurveyFactory) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new(factory)),
            data_folder,
            strict_controls: cfg!(debug_assertions),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let sessions = Router::new()
        .route("/api/sessions", post(api::create_session))
        .route(
            "/api/sessions/:id",
            get(api::get_session).delete(api::delete_session),
        )
        .route("/api/sessions/:id/controls", post(api::post_control))
        .route("/api/sessions/:id/table", get(api::get_table_data))
        .route("/api/sessions/:id/table.csv", get(api::export_table_csv))
        .route("/api/sessions/:id/dictionary", get(api::get_dictionary))
        .route("/api/sessions/:id/events", get(api::event_stream));

    let public = Router::new()
        .route("/", get(api::serve_index))
        .route("/static/app.js", get(api::serve_app_js))
        .route("/api/options", get(api::get_options))
        .merge(api::health_routes());

    Router::new()
        .merge(sessions)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
