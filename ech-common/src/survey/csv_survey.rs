//! File-backed survey handle
//!
//! Layout under the data folder:
//! - `ech_<year>.csv` survey rows (required)
//! - `ech_<year>_labels.csv` with `variable,label` columns (optional)
//! - `ech_<year>_dictionary.csv` variable dictionary (optional; built from
//!   the labels when absent)

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{weighted_summary, Metadata, SummaryRequest, SurveyHandle, Weights};
use crate::table::{Cell, Table};
use crate::{Error, Result};

/// Dictionary column names used when no dictionary file exists
const DICTIONARY_NAME: &str = "Nombre";
const DICTIONARY_LABEL: &str = "Descripción";

#[derive(Debug, Clone)]
struct LoadedSurvey {
    year: u16,
    data: Table,
    metadata: Metadata,
    dictionary: Table,
}

/// Survey handle reading per-year CSV files from a data folder
#[derive(Debug, Clone)]
pub struct CsvSurvey {
    data_folder: PathBuf,
    loaded: Option<LoadedSurvey>,
    weights: Option<Weights>,
    empty_metadata: Metadata,
}

impl CsvSurvey {
    pub fn new(data_folder: impl Into<PathBuf>) -> Self {
        Self {
            data_folder: data_folder.into(),
            loaded: None,
            weights: None,
            empty_metadata: Metadata::default(),
        }
    }

    fn data_path(folder: &Path, year: u16) -> PathBuf {
        folder.join(format!("ech_{}.csv", year))
    }

    /// Years with a survey file present in `folder`, ascending
    pub fn available_years(folder: &Path) -> Result<Vec<u16>> {
        let mut years = Vec::new();
        for entry in std::fs::read_dir(folder)? {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(year) = name
                .strip_prefix("ech_")
                .and_then(|rest| rest.strip_suffix(".csv"))
                .and_then(|digits| digits.parse::<u16>().ok())
            {
                years.push(year);
            }
        }
        years.sort_unstable();
        Ok(years)
    }

    fn read_labels(path: &Path) -> Result<BTreeMap<String, String>> {
        let table = Table::from_csv_reader(File::open(path)?)?;
        let (Some(var), Some(label)) = (table.column_index("variable"), table.column_index("label"))
        else {
            return Err(Error::Load(format!(
                "{} must have 'variable' and 'label' columns",
                path.display()
            )));
        };
        Ok(table
            .rows
            .iter()
            .filter(|row| !row[var].is_null())
            .map(|row| (row[var].to_string(), row[label].to_string()))
            .collect())
    }

    fn build_dictionary(columns: &[String], metadata: &Metadata) -> Result<Table> {
        let mut dictionary = Table::new(vec![
            DICTIONARY_NAME.to_string(),
            DICTIONARY_LABEL.to_string(),
        ]);
        for column in columns {
            dictionary.push_row(vec![
                Cell::from(column.as_str()),
                Cell::from(metadata.label(column)),
            ])?;
        }
        Ok(dictionary)
    }

    fn read_year(folder: &Path, year: u16) -> Result<LoadedSurvey> {
        let data_path = Self::data_path(folder, year);
        if !data_path.exists() {
            return Err(Error::Load(format!("no survey data for year {}", year)));
        }

        let data = Table::from_csv_reader(File::open(&data_path)?)
            .map_err(|e| Error::Load(format!("{}: {}", data_path.display(), e)))?;

        let labels_path = folder.join(format!("ech_{}_labels.csv", year));
        let labels = if labels_path.exists() {
            Self::read_labels(&labels_path)?
        } else {
            debug!("No labels file for {}, using column names", year);
            BTreeMap::new()
        };
        let metadata = Metadata::from_labels(&data.columns, &labels);

        let dictionary_path = folder.join(format!("ech_{}_dictionary.csv", year));
        let dictionary = if dictionary_path.exists() {
            Table::from_csv_reader(File::open(&dictionary_path)?)?
        } else {
            Self::build_dictionary(&data.columns, &metadata)?
        };

        Ok(LoadedSurvey {
            year,
            data,
            metadata,
            dictionary,
        })
    }

    fn require_loaded(&self) -> Result<&LoadedSurvey> {
        self.loaded
            .as_ref()
            .ok_or_else(|| Error::NotFound("no survey loaded".to_string()))
    }
}

impl SurveyHandle for CsvSurvey {
    fn load(&mut self, year: u16) -> Result<()> {
        let loaded = Self::read_year(&self.data_folder, year).map_err(|e| match e {
            Error::Load(_) => e,
            other => Error::Load(other.to_string()),
        })?;
        info!(
            "Loaded ECH {}: {} rows, {} columns",
            year,
            loaded.data.len(),
            loaded.data.columns.len()
        );
        self.loaded = Some(loaded);
        // Weight availability differs across years; callers reassign after loading
        self.weights = None;
        Ok(())
    }

    fn year(&self) -> Option<u16> {
        self.loaded.as_ref().map(|l| l.year)
    }

    fn weights(&self) -> Option<Weights> {
        self.weights
    }

    fn set_weights(&mut self, weights: Weights) -> Result<()> {
        let loaded = self
            .loaded
            .as_ref()
            .ok_or_else(|| Error::Load("no survey loaded".to_string()))?;
        if !loaded.data.has_column(weights.as_str()) {
            return Err(Error::Load(format!(
                "weight column '{}' not available for {}",
                weights, loaded.year
            )));
        }
        self.weights = Some(weights);
        Ok(())
    }

    fn data(&self) -> Option<&Table> {
        self.loaded.as_ref().map(|l| &l.data)
    }

    fn metadata(&self) -> &Metadata {
        self.loaded
            .as_ref()
            .map(|l| &l.metadata)
            .unwrap_or(&self.empty_metadata)
    }

    fn dictionary(&self) -> Option<&Table> {
        self.loaded.as_ref().map(|l| &l.dictionary)
    }

    /// Case-insensitive substring match against every text cell of a row
    fn search_dictionary(&self, term: &str) -> Result<Table> {
        let loaded = self.require_loaded()?;
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(loaded.dictionary.clone());
        }
        Ok(loaded.dictionary.filter_rows(|row| {
            row.iter()
                .any(|cell| cell.to_string().to_lowercase().contains(&needle))
        }))
    }

    fn summarize(&self, request: &SummaryRequest) -> Result<Table> {
        let loaded = self.require_loaded()?;
        let weights = self
            .weights
            .ok_or_else(|| Error::InvalidInput("weights not set".to_string()))?;
        weighted_summary(&loaded.data, weights.as_str(), request)
    }
}
