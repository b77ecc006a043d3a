//! Survey load gating
//!
//! Decides from year/weights selections whether the survey (re)loads and
//! whether the summary controls unlock.

use ech_common::survey::YEAR_COLUMN;
use ech_common::{Result, SurveyHandle};
use serde::Serialize;
use tracing::{info, warn};

use super::graph::Signal;
use super::{ChoiceOption, Inputs};

/// Status banner shown until both year and weights are in place
pub const UNLOADED_STATUS: &str = "Seleccionar encuesta y ponderador";

/// Outcome of the load gate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadState {
    /// Year loaded and weights assigned; dependent controls enabled
    pub fully_loaded: bool,
    /// Variable choices for the `sumvar` and `by` dropdowns
    pub catalog: Vec<ChoiceOption>,
    pub status: String,
    pub error: Option<String>,
}

impl Default for LoadState {
    fn default() -> Self {
        Self {
            fully_loaded: false,
            catalog: Vec::new(),
            status: UNLOADED_STATUS.to_string(),
            error: None,
        }
    }
}

/// Apply the transition rule for `trigger`; `Ok(true)` means fully loaded
fn transition(trigger: Signal, inputs: &Inputs, survey: &mut dyn SurveyHandle) -> Result<bool> {
    match (trigger, inputs.year, inputs.weights) {
        (Signal::Year, Some(year), weights) => {
            survey.load(year)?;
            match weights {
                Some(w) => {
                    survey.set_weights(w)?;
                    Ok(true)
                }
                None => Ok(false),
            }
        }
        (Signal::Weights, Some(year), Some(weights)) => {
            // The year load may have been superseded before it ran
            if survey.year() != Some(year) {
                survey.load(year)?;
            }
            survey.set_weights(weights)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Status banner: first `anio` value of the data, else the selected year
fn status_line(inputs: &Inputs, survey: &dyn SurveyHandle) -> String {
    let year = survey
        .data()
        .and_then(|data| data.column(YEAR_COLUMN).and_then(|mut values| values.next().cloned()))
        .map(|cell| cell.to_string())
        .or_else(|| inputs.year.map(|y| y.to_string()))
        .unwrap_or_default();
    let weights = survey
        .weights()
        .map(|w| w.to_string())
        .unwrap_or_default();
    format!("Año: {} | Ponderador: {}", year, weights)
}

/// Run the load gate; resets the variable and grouping selections
pub fn evaluate(trigger: Signal, inputs: &mut Inputs, survey: &mut dyn SurveyHandle) -> LoadState {
    inputs.sumvar = None;
    inputs.by.clear();

    match transition(trigger, inputs, survey) {
        Ok(true) => {
            let metadata = survey.metadata();
            let catalog = survey
                .data()
                .map(|data| {
                    data.columns
                        .iter()
                        .map(|c| ChoiceOption::new(metadata.label_and_name(c), c.as_str()))
                        .collect()
                })
                .unwrap_or_default();
            let status = status_line(inputs, survey);
            info!("Survey ready: {}", status);
            LoadState {
                fully_loaded: true,
                catalog,
                status,
                error: None,
            }
        }
        Ok(false) => LoadState::default(),
        Err(e) => {
            warn!("Survey load failed: {}", e);
            LoadState {
                error: Some(e.to_string()),
                ..LoadState::default()
            }
        }
    }
}
