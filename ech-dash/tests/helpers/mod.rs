//! Test Helper Utilities
//!
//! Shared utilities for testing ech-dash: fixture survey folders, a slow
//! survey handle for supersession tests, and request helpers.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use ech_common::survey::{CsvSurvey, Metadata};
use ech_common::{Result, SummaryRequest, SurveyHandle, Table, Weights};
use ech_dash::session::SurveyFactory;
use ech_dash::{build_router, AppState};
use serde_json::Value;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

/// Six people in four households; `nper == 1` marks household heads
pub const ECH_2019: &str = "\
anio,numero,nper,sexo,dpto,ingreso,pesoano,pesomen
2019,1,1,1,Montevideo,1000,10,1
2019,1,2,2,Montevideo,500,10,1
2019,2,1,2,Salto,2000,5,2
2019,3,1,1,Salto,1500,20,2
2019,3,2,2,Salto,,20,2
2019,4,1,2,Rivera,3000,15,3
";

pub const ECH_2019_LABELS: &str = "\
variable,label
sexo,Sexo
dpto,Departamento
ingreso,Ingreso total
";

/// Only monthly weights
pub const ECH_2018: &str = "\
anio,numero,nper,sexo,dpto,ingreso,pesomen
2018,1,1,1,Montevideo,900,3
";

/// Data folder with the 2018 and 2019 fixtures
pub fn fixture_dir() -> TempDir {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    write_fixtures(dir.path());
    dir
}

pub fn write_fixtures(dir: &Path) {
    std::fs::write(dir.join("ech_2019.csv"), ECH_2019).expect("Should write 2019 data");
    std::fs::write(dir.join("ech_2019_labels.csv"), ECH_2019_LABELS)
        .expect("Should write 2019 labels");
    std::fs::write(dir.join("ech_2018.csv"), ECH_2018).expect("Should write 2018 data");
}

/// Router over a CSV data folder, with lenient (release) control decoding
pub fn setup_app(dir: &Path) -> Router {
    let mut state = AppState::new(dir.to_path_buf());
    state.strict_controls = false;
    build_router(state)
}

/// Router over a CSV data folder, rejecting malformed controls
pub fn setup_strict_app(dir: &Path) -> Router {
    let mut state = AppState::new(dir.to_path_buf());
    state.strict_controls = true;
    build_router(state)
}

/// CSV survey whose loads of `slow_year` block for `delay`
pub struct SlowSurvey {
    inner: CsvSurvey,
    slow_year: u16,
    delay: Duration,
}

impl SlowSurvey {
    pub fn new(dir: &Path, slow_year: u16, delay: Duration) -> Self {
        Self {
            inner: CsvSurvey::new(dir),
            slow_year,
            delay,
        }
    }

    pub fn factory(dir: &Path, slow_year: u16, delay: Duration) -> SurveyFactory {
        let dir = dir.to_path_buf();
        Arc::new(move || {
            Box::new(SlowSurvey::new(&dir, slow_year, delay)) as Box<dyn SurveyHandle>
        })
    }
}

impl SurveyHandle for SlowSurvey {
    fn load(&mut self, year: u16) -> Result<()> {
        if year == self.slow_year {
            std::thread::sleep(self.delay);
        }
        self.inner.load(year)
    }

    fn year(&self) -> Option<u16> {
        self.inner.year()
    }

    fn weights(&self) -> Option<Weights> {
        self.inner.weights()
    }

    fn set_weights(&mut self, weights: Weights) -> Result<()> {
        self.inner.set_weights(weights)
    }

    fn data(&self) -> Option<&Table> {
        self.inner.data()
    }

    fn metadata(&self) -> &Metadata {
        self.inner.metadata()
    }

    fn dictionary(&self) -> Option<&Table> {
        self.inner.dictionary()
    }

    fn search_dictionary(&self, term: &str) -> Result<Table> {
        self.inner.search_dictionary(term)
    }

    fn summarize(&self, request: &SummaryRequest) -> Result<Table> {
        self.inner.summarize(request)
    }
}

/// Build a request with an optional JSON body
pub fn json_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Extract JSON body from response
pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Send one request through a clone of the router
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Create a session, returning its id
pub async fn create_session(app: &Router) -> String {
    let (status, json) = send(app, json_request("POST", "/api/sessions", None)).await;
    assert_eq!(status, StatusCode::CREATED);
    json["session_id"].as_str().unwrap().to_string()
}

/// Post one control update, returning status and body
pub async fn control(app: &Router, session: &str, control: &str, value: Value) -> (StatusCode, Value) {
    let uri = format!("/api/sessions/{}/controls", session);
    let body = serde_json::json!({ "control": control, "value": value });
    send(app, json_request("POST", &uri, Some(body))).await
}

/// Create a session with 2019 + pesoano loaded
pub async fn loaded_session(app: &Router) -> String {
    let id = create_session(app).await;
    let (status, _) = control(app, &id, "year", serde_json::json!(2019)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, view) = control(app, &id, "weights", serde_json::json!("pesoano")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["fully_loaded"], true);
    id
}
