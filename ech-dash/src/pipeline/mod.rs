//! Reactive summarization pipeline
//!
//! A session's state is split into user [`Inputs`] and [`Derived`] outputs.
//! Applying a control event changes one input, [`graph::schedule`] picks the
//! affected nodes, and [`run`] recomputes them in order against the
//! session's survey handle. Nodes are plain functions of their inputs.

pub mod chart_controls;
pub mod dictionary;
pub mod graph;
pub mod load_gate;
pub mod render;
pub mod summary;

#[cfg(test)]
pub(crate) mod testing;

use ech_common::{AggFunc, SurveyHandle, Table, Tristate, Weights};
use serde::Serialize;
use tracing::debug;

use crate::selection::ControlEvent;
use chart_controls::AxisOptions;
use graph::{Node, Signal};
use load_gate::LoadState;
use render::Rendered;
use summary::SummaryState;

/// A dropdown entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceOption {
    pub label: String,
    pub value: String,
}

impl ChoiceOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Chart channel → artifact column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AxisBindings {
    pub x_axis: Option<String>,
    pub color: Option<String>,
    pub facet_col: Option<String>,
    pub facet_row: Option<String>,
}

/// Current user selections
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Inputs {
    pub year: Option<u16>,
    pub weights: Option<Weights>,
    pub sumvar: Option<String>,
    pub by: Vec<String>,
    pub aggfunc: AggFunc,
    pub is_categorical: Tristate,
    pub household_level: bool,
    pub bindings: AxisBindings,
    pub search: Option<String>,
}

impl Inputs {
    /// Record a selection and return the signal it raises
    pub fn apply(&mut self, event: ControlEvent) -> Signal {
        let signal = event.signal();
        match event {
            ControlEvent::Year(v) => self.year = v,
            ControlEvent::Weights(v) => self.weights = v,
            ControlEvent::SumVar(v) => self.sumvar = v,
            ControlEvent::By(v) => self.by = v,
            ControlEvent::AggFunc(v) => self.aggfunc = v,
            ControlEvent::IsCategorical(v) => self.is_categorical = v,
            ControlEvent::HouseholdLevel(v) => self.household_level = v,
            ControlEvent::XAxis(v) => self.bindings.x_axis = v,
            ControlEvent::Color(v) => self.bindings.color = v,
            ControlEvent::FacetCol(v) => self.bindings.facet_col = v,
            ControlEvent::FacetRow(v) => self.bindings.facet_row = v,
            ControlEvent::Search(v) => self.search = v,
        }
        signal
    }
}

/// Everything computed from the inputs
#[derive(Debug, Clone, Default)]
pub struct Derived {
    pub load: LoadState,
    /// Visible (possibly filtered) dictionary; `None` hides it
    pub dictionary: Option<Table>,
    pub dictionary_error: Option<String>,
    pub summary: SummaryState,
    pub axis_options: AxisOptions,
    pub rendered: Option<Rendered>,
}

/// Outcomes worth announcing to the session's listeners
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Loaded {
        year: u16,
        weights: Weights,
        status: String,
    },
    LoadFailed(String),
    SummaryUpdated(usize),
    SummaryFailed(String),
}

/// Recompute `plan` after `trigger` changed
pub fn run(
    plan: &[Node],
    trigger: Signal,
    inputs: &mut Inputs,
    derived: &mut Derived,
    survey: &mut dyn SurveyHandle,
) -> Vec<Notice> {
    let mut notices = Vec::new();

    for node in plan {
        debug!("Running pipeline node {:?} (trigger {:?})", node, trigger);
        match node {
            Node::LoadGate => {
                derived.load = load_gate::evaluate(trigger, inputs, survey);
                if derived.load.fully_loaded {
                    derived.dictionary = survey.dictionary().cloned();
                    derived.dictionary_error = None;
                    if let (Some(year), Some(weights)) = (inputs.year, inputs.weights) {
                        notices.push(Notice::Loaded {
                            year,
                            weights,
                            status: derived.load.status.clone(),
                        });
                    }
                } else {
                    derived.dictionary = None;
                    derived.dictionary_error = None;
                    if let Some(message) = &derived.load.error {
                        notices.push(Notice::LoadFailed(message.clone()));
                    }
                }
            }
            Node::Dictionary => {
                dictionary::refresh(
                    derived.load.fully_loaded,
                    inputs.search.as_deref(),
                    survey,
                    &mut derived.dictionary,
                    &mut derived.dictionary_error,
                );
            }
            Node::Summary => {
                derived.summary = summary::compute(derived.load.fully_loaded, inputs, survey);
                match (&derived.summary.artifact, &derived.summary.error) {
                    (Some(artifact), _) => notices.push(Notice::SummaryUpdated(artifact.len())),
                    (None, Some(message)) => notices.push(Notice::SummaryFailed(message.clone())),
                    (None, None) => {}
                }
            }
            Node::ChartOptions => {
                derived.axis_options = chart_controls::options(
                    derived.summary.artifact.as_ref(),
                    &inputs.by,
                    inputs.sumvar.as_deref(),
                    survey.metadata(),
                );
            }
            Node::Sanitize => {
                inputs.bindings = chart_controls::sanitize(
                    derived.summary.artifact.as_ref(),
                    &inputs.bindings,
                    inputs.sumvar.as_deref(),
                );
            }
            Node::Render => {
                derived.rendered = render::render(
                    derived.summary.artifact.as_ref(),
                    inputs,
                    survey.metadata(),
                );
            }
        }
    }

    notices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::FakeSurvey;
    use ech_common::survey::COUNT_COLUMN;

    /// Apply one event the way a session does
    fn step(
        event: ControlEvent,
        inputs: &mut Inputs,
        derived: &mut Derived,
        survey: &mut FakeSurvey,
    ) -> Vec<Notice> {
        let signal = inputs.apply(event);
        let plan = graph::schedule(signal);
        run(&plan, signal, inputs, derived, survey)
    }

    fn loaded() -> (Inputs, Derived, FakeSurvey) {
        let mut inputs = Inputs::default();
        let mut derived = Derived::default();
        let mut survey = FakeSurvey::new();
        step(ControlEvent::Year(Some(2019)), &mut inputs, &mut derived, &mut survey);
        let notices = step(
            ControlEvent::Weights(Some(Weights::Pesoano)),
            &mut inputs,
            &mut derived,
            &mut survey,
        );
        assert!(matches!(notices[0], Notice::Loaded { year: 2019, .. }));
        (inputs, derived, survey)
    }

    #[test]
    fn test_ingreso_by_sexo_scenario() {
        let (mut inputs, mut derived, mut survey) = loaded();
        step(ControlEvent::By(vec!["sexo".into()]), &mut inputs, &mut derived, &mut survey);
        step(ControlEvent::IsCategorical(Tristate::False), &mut inputs, &mut derived, &mut survey);
        let notices = step(
            ControlEvent::SumVar(Some("ingreso".into())),
            &mut inputs,
            &mut derived,
            &mut survey,
        );
        assert_eq!(notices, vec![Notice::SummaryUpdated(2)]);

        let artifact = derived.summary.artifact.as_ref().unwrap();
        assert_eq!(artifact.table.columns, vec!["sexo", "ingreso"]);
        assert!(derived.summary.reveal);

        let x: Vec<_> = derived.axis_options.x_axis.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(x, vec!["sexo"]);

        let rendered = derived.rendered.as_ref().unwrap();
        assert_eq!(rendered.chart.title(), "Ingreso total (2019, pesoano)");
    }

    #[test]
    fn test_categorical_count_scenario() {
        let (mut inputs, mut derived, mut survey) = loaded();
        step(ControlEvent::By(vec!["sexo".into()]), &mut inputs, &mut derived, &mut survey);
        step(ControlEvent::AggFunc(AggFunc::Count), &mut inputs, &mut derived, &mut survey);
        step(ControlEvent::XAxis(Some("sexo".into())), &mut inputs, &mut derived, &mut survey);
        step(
            ControlEvent::SumVar(Some("dpto".into())),
            &mut inputs,
            &mut derived,
            &mut survey,
        );

        let artifact = derived.summary.artifact.as_ref().unwrap();
        assert_eq!(artifact.table.columns, vec!["sexo", "dpto", COUNT_COLUMN]);
        assert_eq!(inputs.bindings.x_axis.as_deref(), Some("dpto"));
        assert_eq!(derived.axis_options.x_axis, vec![ChoiceOption::new("Departamento (dpto)", "dpto")]);
        assert_eq!(derived.rendered.as_ref().unwrap().chart.y_column(), COUNT_COLUMN);
    }

    #[test]
    fn test_unsetting_sumvar_clears_everything() {
        let (mut inputs, mut derived, mut survey) = loaded();
        step(ControlEvent::SumVar(Some("ingreso".into())), &mut inputs, &mut derived, &mut survey);
        assert!(derived.summary.artifact.is_some());

        let notices = step(ControlEvent::SumVar(None), &mut inputs, &mut derived, &mut survey);
        assert!(notices.is_empty());
        assert!(derived.summary.artifact.is_none());
        assert!(derived.summary.error.is_none());
        assert!(!derived.summary.reveal);
        assert!(derived.rendered.is_none());
        assert_eq!(derived.axis_options, AxisOptions::default());
        assert_eq!(inputs.bindings, AxisBindings::default());
    }

    #[test]
    fn test_reload_resets_variable_selection() {
        let (mut inputs, mut derived, mut survey) = loaded();
        step(ControlEvent::SumVar(Some("ingreso".into())), &mut inputs, &mut derived, &mut survey);
        step(ControlEvent::Year(Some(2019)), &mut inputs, &mut derived, &mut survey);

        assert_eq!(survey.load_calls, 2);
        assert!(inputs.sumvar.is_none());
        assert!(derived.summary.artifact.is_none());
        assert!(derived.load.fully_loaded);
    }

    #[test]
    fn test_load_failure_is_visible_and_locks_controls() {
        let (mut inputs, mut derived, mut survey) = loaded();
        let notices = step(ControlEvent::Year(Some(1990)), &mut inputs, &mut derived, &mut survey);

        assert!(matches!(&notices[0], Notice::LoadFailed(m) if m.contains("1990")));
        assert!(!derived.load.fully_loaded);
        assert!(derived.load.catalog.is_empty());
        assert!(derived.dictionary.is_none());
    }

    #[test]
    fn test_summary_error_is_visible() {
        let (mut inputs, mut derived, mut survey) = loaded();
        step(ControlEvent::AggFunc(AggFunc::Sum), &mut inputs, &mut derived, &mut survey);
        let notices = step(
            ControlEvent::SumVar(Some("dpto".into())),
            &mut inputs,
            &mut derived,
            &mut survey,
        );
        assert!(matches!(&notices[0], Notice::SummaryFailed(_)));
        assert!(derived.summary.artifact.is_none());
        assert!(derived.rendered.is_none());
    }

    #[test]
    fn test_search_before_load_is_ignored() {
        let mut inputs = Inputs::default();
        let mut derived = Derived::default();
        let mut survey = FakeSurvey::new();

        let notices = step(
            ControlEvent::Search(Some("ingreso".into())),
            &mut inputs,
            &mut derived,
            &mut survey,
        );
        assert!(notices.is_empty());
        assert!(derived.dictionary.is_none());
        assert!(derived.dictionary_error.is_none());
        assert_eq!(survey.search_calls(), 0);
    }
}
