//! Survey collaborator interface
//!
//! The dashboard never touches survey files directly; everything it needs is
//! behind [`SurveyHandle`]. [`CsvSurvey`] is the bundled file-backed
//! implementation.

mod csv_survey;
mod summarize;

pub use csv_survey::CsvSurvey;
pub use summarize::weighted_summary;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::table::Table;
use crate::{Error, Result};

/// Name of the synthetic count column produced by categorical summaries
pub const COUNT_COLUMN: &str = "Recuento";

/// Column holding the survey year in every ECH file
pub const YEAR_COLUMN: &str = "anio";

/// Survey years offered by the UI
pub const SURVEY_YEARS: std::ops::RangeInclusive<u16> = 2006..=2020;

/// Sampling weight columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weights {
    Pesoano,
    Pesomen,
    Pesosem,
    Pesotri,
}

impl Weights {
    pub const ALL: [Weights; 4] = [
        Weights::Pesoano,
        Weights::Pesomen,
        Weights::Pesosem,
        Weights::Pesotri,
    ];

    /// Column name in the survey data
    pub fn as_str(&self) -> &'static str {
        match self {
            Weights::Pesoano => "pesoano",
            Weights::Pesomen => "pesomen",
            Weights::Pesosem => "pesosem",
            Weights::Pesotri => "pesotri",
        }
    }

    /// Human-readable dropdown label
    pub fn label(&self) -> &'static str {
        match self {
            Weights::Pesoano => "Anual (pesoano)",
            Weights::Pesomen => "Mensual (pesomen)",
            Weights::Pesosem => "Semestral (pesosem)",
            Weights::Pesotri => "Trimestral (pesotri)",
        }
    }
}

impl fmt::Display for Weights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weights {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Weights::ALL
            .iter()
            .copied()
            .find(|w| w.as_str() == s)
            .ok_or_else(|| Error::MalformedSelection(format!("unknown weights: {}", s)))
    }
}

/// Aggregation function applied by `summarize`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggFunc {
    Sum,
    #[default]
    Mean,
    Count,
}

impl AggFunc {
    pub const ALL: [AggFunc; 3] = [AggFunc::Sum, AggFunc::Mean, AggFunc::Count];

    pub fn as_str(&self) -> &'static str {
        match self {
            AggFunc::Sum => "sum",
            AggFunc::Mean => "mean",
            AggFunc::Count => "count",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AggFunc::Sum => "Suma",
            AggFunc::Mean => "Promedio",
            AggFunc::Count => "Recuento",
        }
    }
}

impl FromStr for AggFunc {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        AggFunc::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| Error::MalformedSelection(format!("unknown aggregation: {}", s)))
    }
}

/// Three-valued override: let the survey decide, or force true/false
///
/// Serialized in the UI encoding (`"None"`, `"True"`, `"False"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tristate {
    #[default]
    Auto,
    True,
    False,
}

impl Tristate {
    /// Decode the UI encoding `"None"` / `"True"` / `"False"`
    pub fn decode(raw: &str) -> Result<Self> {
        match raw {
            "None" => Ok(Tristate::Auto),
            "True" => Ok(Tristate::True),
            "False" => Ok(Tristate::False),
            other => Err(Error::MalformedSelection(format!(
                "expected None, True or False, got {:?}",
                other
            ))),
        }
    }

    pub fn encode(&self) -> &'static str {
        match self {
            Tristate::Auto => "None",
            Tristate::True => "True",
            Tristate::False => "False",
        }
    }

    pub fn as_option(&self) -> Option<bool> {
        match self {
            Tristate::Auto => None,
            Tristate::True => Some(true),
            Tristate::False => Some(false),
        }
    }
}

impl Serialize for Tristate {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.encode())
    }
}

impl<'de> Deserialize<'de> for Tristate {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Tristate::decode(&raw).map_err(serde::de::Error::custom)
    }
}

/// Parameters of one summarization call
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRequest {
    pub variable: String,
    pub by: Vec<String>,
    pub aggfunc: AggFunc,
    pub is_categorical: Tristate,
    pub household_level: bool,
}

/// Column labelling derived from a loaded survey
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    /// column → `"<label> (<column>)"`, used for dropdown entries
    pub column_labels_and_names: BTreeMap<String, String>,
    /// column → bare label
    pub column_names_to_labels: BTreeMap<String, String>,
}

impl Metadata {
    /// Build labels for `columns`; columns without a label are labelled by name
    pub fn from_labels(columns: &[String], labels: &BTreeMap<String, String>) -> Self {
        let mut meta = Metadata::default();
        for column in columns {
            let label = labels.get(column).cloned().unwrap_or_else(|| column.clone());
            meta.column_labels_and_names
                .insert(column.clone(), format!("{} ({})", label, column));
            meta.column_names_to_labels.insert(column.clone(), label);
        }
        meta
    }

    /// Dropdown label for a column, falling back to the column id
    pub fn label_and_name(&self, column: &str) -> String {
        self.column_labels_and_names
            .get(column)
            .cloned()
            .unwrap_or_else(|| column.to_string())
    }

    /// Bare label for a column, falling back to the column id
    pub fn label(&self, column: &str) -> String {
        self.column_names_to_labels
            .get(column)
            .cloned()
            .unwrap_or_else(|| column.to_string())
    }
}

/// A loaded household survey with an active weight column
///
/// Implementations own all survey state; callers are expected to hold one
/// handle per user session.
pub trait SurveyHandle: Send {
    /// Load the survey for `year`, replacing any previously loaded year.
    /// On failure the previously loaded survey stays untouched.
    fn load(&mut self, year: u16) -> Result<()>;

    /// Year currently loaded
    fn year(&self) -> Option<u16>;

    /// Active weight column
    fn weights(&self) -> Option<Weights>;

    /// Select the weight column; fails if the loaded year lacks it
    fn set_weights(&mut self, weights: Weights) -> Result<()>;

    /// Raw survey rows
    fn data(&self) -> Option<&Table>;

    fn metadata(&self) -> &Metadata;

    /// Variable dictionary of the loaded year
    fn dictionary(&self) -> Option<&Table>;

    /// Dictionary rows matching a free-text term
    fn search_dictionary(&self, term: &str) -> Result<Table>;

    /// Weighted summary of one variable, grouped by `request.by`
    fn summarize(&self, request: &SummaryRequest) -> Result<Table>;
}
