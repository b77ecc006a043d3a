//! Variable dictionary view
//!
//! Matching semantics belong to the survey handle; this node only decides
//! whether to ask.

use ech_common::{SurveyHandle, Table};
use tracing::warn;

/// Refresh the visible dictionary for `term`
///
/// With no survey loaded the call is ignored: nothing visible changes.
pub fn refresh(
    loaded: bool,
    term: Option<&str>,
    survey: &dyn SurveyHandle,
    visible: &mut Option<Table>,
    error: &mut Option<String>,
) {
    if !loaded {
        return;
    }

    // Blank terms go to the handle too; it decides what they match
    match survey.search_dictionary(term.unwrap_or_default()) {
        Ok(table) => {
            *visible = Some(table);
            *error = None;
        }
        Err(e) => {
            warn!("Dictionary search failed: {}", e);
            *error = Some(e.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::FakeSurvey;
    use ech_common::{Cell, Weights};

    fn loaded_survey() -> FakeSurvey {
        let mut survey = FakeSurvey::new();
        survey.load(2019).unwrap();
        survey.set_weights(Weights::Pesoano).unwrap();
        survey
    }

    #[test]
    fn test_term_is_delegated() {
        let survey = loaded_survey();
        let mut visible = None;
        let mut error = None;
        refresh(true, Some("INGRESO"), &survey, &mut visible, &mut error);

        let table = visible.unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0][0], Cell::from("ingreso"));
        assert_eq!(survey.search_calls(), 1);
        assert!(error.is_none());
    }

    #[test]
    fn test_blank_and_absent_terms_are_delegated() {
        let survey = loaded_survey();
        let mut visible = None;
        let mut error = None;
        refresh(true, Some("   "), &survey, &mut visible, &mut error);
        assert_eq!(visible.as_ref().unwrap().len(), survey.dictionary().unwrap().len());
        assert_eq!(survey.search_calls(), 1);

        refresh(true, None, &survey, &mut visible, &mut error);
        assert_eq!(visible.unwrap().len(), survey.dictionary().unwrap().len());
        assert_eq!(survey.search_calls(), 2);
        assert!(error.is_none());
    }

    #[test]
    fn test_not_loaded_is_a_no_op() {
        let survey = FakeSurvey::new();
        let previous = Table::new(vec!["Nombre".to_string()]);
        let mut visible = Some(previous.clone());
        let mut error = None;
        refresh(false, Some("ingreso"), &survey, &mut visible, &mut error);

        assert_eq!(visible, Some(previous));
        assert!(error.is_none());
        assert_eq!(survey.search_calls(), 0);
    }
}
