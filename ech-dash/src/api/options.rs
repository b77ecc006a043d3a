//! Static control choices

use axum::{extract::State, Json};
use ech_common::survey::{CsvSurvey, SURVEY_YEARS};
use ech_common::{AggFunc, Tristate, Weights};
use serde::Serialize;
use tracing::warn;

use crate::pipeline::ChoiceOption;
use crate::AppState;

/// GET /api/options response
#[derive(Debug, Serialize)]
pub struct OptionsResponse {
    pub years: Vec<u16>,
    pub weights: Vec<ChoiceOption>,
    pub aggfuncs: Vec<ChoiceOption>,
    pub categorical: Vec<ChoiceOption>,
}

/// Supported years that have a survey file in the data folder
fn offered_years(state: &AppState) -> Vec<u16> {
    match CsvSurvey::available_years(&state.data_folder) {
        Ok(years) => years
            .into_iter()
            .filter(|y| SURVEY_YEARS.contains(y))
            .collect(),
        Err(e) => {
            warn!(
                "Cannot list surveys in {}: {}",
                state.data_folder.display(),
                e
            );
            Vec::new()
        }
    }
}

/// GET /api/options
pub async fn get_options(State(state): State<AppState>) -> Json<OptionsResponse> {
    Json(OptionsResponse {
        years: offered_years(&state),
        weights: Weights::ALL
            .iter()
            .map(|w| ChoiceOption::new(w.label(), w.as_str()))
            .collect(),
        aggfuncs: AggFunc::ALL
            .iter()
            .map(|a| ChoiceOption::new(a.label(), a.as_str()))
            .collect(),
        categorical: [
            ("Auto", Tristate::Auto),
            ("Sí", Tristate::True),
            ("No", Tristate::False),
        ]
        .into_iter()
        .map(|(label, t)| ChoiceOption::new(label, t.encode()))
        .collect(),
    })
}
