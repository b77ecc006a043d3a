//! Summary artifact computation

use ech_common::survey::COUNT_COLUMN;
use ech_common::{Error, Result, SummaryRequest, SurveyHandle, Table};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::Inputs;

/// Rows produced by one summarization call
///
/// The last column is the value column (`sumvar` or [`COUNT_COLUMN`]); all
/// others are grouping columns.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryArtifact {
    pub table: Table,
    pub value_column: String,
}

impl SummaryArtifact {
    /// Wrap a summarize result, checking it has the expected shape
    pub fn from_table(table: Table, sumvar: &str) -> Result<Self> {
        let value_column = match table.columns.last() {
            Some(last) if last == sumvar || last == COUNT_COLUMN => last.clone(),
            Some(last) => {
                return Err(Error::Internal(format!(
                    "summary value column '{}' is neither '{}' nor '{}'",
                    last, sumvar, COUNT_COLUMN
                )))
            }
            None => return Err(Error::Internal("summary has no columns".to_string())),
        };
        Ok(Self {
            table,
            value_column,
        })
    }

    pub fn has_count_column(&self) -> bool {
        self.value_column == COUNT_COLUMN
    }

    pub fn grouping_columns(&self) -> &[String] {
        let n = self.table.columns.len().saturating_sub(1);
        &self.table.columns[..n]
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.table.has_column(name)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Rows as JSON records carrying a 0-based `index`
    pub fn records(&self) -> Vec<Value> {
        self.table
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let mut record = Map::new();
                record.insert("index".to_string(), Value::from(i));
                for (column, cell) in self.table.columns.iter().zip(row) {
                    record.insert(column.clone(), serde_json::to_value(cell).unwrap_or(Value::Null));
                }
                Value::Object(record)
            })
            .collect()
    }
}

/// Summary node output
#[derive(Debug, Clone, Default)]
pub struct SummaryState {
    pub artifact: Option<SummaryArtifact>,
    /// Whether the results pane is shown
    pub reveal: bool,
    pub error: Option<String>,
}

/// Recompute the artifact for the current selections
pub fn compute(loaded: bool, inputs: &Inputs, survey: &dyn SurveyHandle) -> SummaryState {
    let sumvar = match (&inputs.sumvar, loaded) {
        (Some(sumvar), true) => sumvar,
        _ => return SummaryState::default(),
    };

    let request = SummaryRequest {
        variable: sumvar.clone(),
        by: inputs.by.clone(),
        aggfunc: inputs.aggfunc,
        is_categorical: inputs.is_categorical,
        household_level: inputs.household_level,
    };
    debug!("Summarizing {:?}", request);

    match survey
        .summarize(&request)
        .and_then(|table| SummaryArtifact::from_table(table, sumvar))
    {
        Ok(artifact) => SummaryState {
            artifact: Some(artifact),
            reveal: true,
            error: None,
        },
        Err(e) => {
            warn!("Summary of '{}' failed: {}", sumvar, e);
            SummaryState {
                artifact: None,
                reveal: false,
                error: Some(e.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::FakeSurvey;
    use ech_common::{AggFunc, Cell, Tristate, Weights};

    fn loaded_survey() -> FakeSurvey {
        let mut survey = FakeSurvey::new();
        survey.load(2019).unwrap();
        survey.set_weights(Weights::Pesoano).unwrap();
        survey
    }

    fn inputs(sumvar: &str, by: &[&str], aggfunc: AggFunc) -> Inputs {
        Inputs {
            sumvar: Some(sumvar.to_string()),
            by: by.iter().map(|b| b.to_string()).collect(),
            aggfunc,
            ..Inputs::default()
        }
    }

    #[test]
    fn test_no_sumvar_is_empty_state() {
        let survey = loaded_survey();
        let state = compute(true, &Inputs::default(), &survey);
        assert!(state.artifact.is_none());
        assert!(!state.reveal);
        assert!(state.error.is_none());
    }

    #[test]
    fn test_not_loaded_is_empty_state() {
        let survey = FakeSurvey::new();
        let state = compute(false, &inputs("ingreso", &[], AggFunc::Mean), &survey);
        assert!(state.artifact.is_none());
        assert!(state.error.is_none());
    }

    #[test]
    fn test_weighted_mean_by_sexo() {
        let survey = loaded_survey();
        let state = compute(true, &inputs("ingreso", &["sexo"], AggFunc::Mean), &survey);
        let artifact = state.artifact.unwrap();

        assert!(state.reveal);
        assert_eq!(artifact.grouping_columns(), ["sexo".to_string()]);
        assert!(!artifact.has_count_column());
        // sexo 1: (1000*10 + 1500*20) / 30
        assert_eq!(artifact.table.rows[0][1], Cell::Number(40000.0 / 30.0));
    }

    #[test]
    fn test_categorical_count() {
        let survey = loaded_survey();
        let state = compute(true, &inputs("dpto", &[], AggFunc::Count), &survey);
        let artifact = state.artifact.unwrap();

        assert!(artifact.has_count_column());
        assert_eq!(artifact.grouping_columns(), ["dpto".to_string()]);
        assert_eq!(artifact.table.rows[0], vec![Cell::from("Montevideo"), Cell::Number(20.0)]);
        assert_eq!(artifact.table.rows[1], vec![Cell::from("Salto"), Cell::Number(25.0)]);
    }

    #[test]
    fn test_count_forced_numeric_is_an_error() {
        let survey = loaded_survey();
        let mut inp = inputs("ingreso", &[], AggFunc::Count);
        inp.is_categorical = Tristate::False;
        let state = compute(true, &inp, &survey);

        assert!(state.artifact.is_none());
        assert!(!state.reveal);
        assert!(state.error.is_some());
    }

    #[test]
    fn test_records_carry_index() {
        let survey = loaded_survey();
        let state = compute(true, &inputs("ingreso", &["dpto"], AggFunc::Sum), &survey);
        let records = state.artifact.unwrap().records();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["index"], 1);
        assert_eq!(records[1]["dpto"], "Salto");
        assert_eq!(records[1]["ingreso"], 40000.0);
    }

    #[test]
    fn test_from_table_rejects_unexpected_value_column() {
        let table = Table::new(vec!["sexo".to_string(), "other".to_string()]);
        assert!(SummaryArtifact::from_table(table, "ingreso").is_err());
        assert!(SummaryArtifact::from_table(Table::default(), "ingreso").is_err());
    }
}
