//! Chart axis option lists and binding sanitation

use ech_common::survey::Metadata;
use serde::Serialize;

use super::summary::SummaryArtifact;
use super::{AxisBindings, ChoiceOption};

/// Choices offered by the four axis pickers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AxisOptions {
    pub x_axis: Vec<ChoiceOption>,
    pub color: Vec<ChoiceOption>,
    pub facet_col: Vec<ChoiceOption>,
    pub facet_row: Vec<ChoiceOption>,
}

fn choice(column: &str, metadata: &Metadata) -> ChoiceOption {
    ChoiceOption::new(metadata.label_and_name(column), column)
}

/// Axis picker options for the current artifact
///
/// A categorical artifact pins X to the summarized variable; otherwise every
/// picker offers the grouping columns.
pub fn options(
    artifact: Option<&SummaryArtifact>,
    by: &[String],
    sumvar: Option<&str>,
    metadata: &Metadata,
) -> AxisOptions {
    let Some(artifact) = artifact else {
        return AxisOptions::default();
    };

    let by_options: Vec<ChoiceOption> = by.iter().map(|c| choice(c, metadata)).collect();
    let x_axis = match sumvar {
        Some(sumvar) if artifact.has_count_column() => vec![choice(sumvar, metadata)],
        _ => by_options.clone(),
    };

    AxisOptions {
        x_axis,
        color: by_options.clone(),
        facet_col: by_options.clone(),
        facet_row: by_options,
    }
}

/// Clear bindings that do not name an artifact column
///
/// Idempotent: `sanitize(a, &sanitize(a, b, s), s) == sanitize(a, b, s)`.
pub fn sanitize(
    artifact: Option<&SummaryArtifact>,
    bindings: &AxisBindings,
    sumvar: Option<&str>,
) -> AxisBindings {
    let Some(artifact) = artifact else {
        return AxisBindings::default();
    };

    let keep = |binding: &Option<String>| {
        binding
            .as_ref()
            .filter(|column| artifact.has_column(column))
            .cloned()
    };

    let x_axis = match sumvar {
        Some(sumvar) if artifact.has_count_column() && artifact.has_column(sumvar) => {
            Some(sumvar.to_string())
        }
        _ => keep(&bindings.x_axis),
    };

    AxisBindings {
        x_axis,
        color: keep(&bindings.color),
        facet_col: keep(&bindings.facet_col),
        facet_row: keep(&bindings.facet_row),
    }
}
