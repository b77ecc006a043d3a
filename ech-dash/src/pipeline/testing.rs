//! In-memory survey handle for pipeline unit tests

use std::cell::Cell as CallCounter;
use std::collections::BTreeMap;

use ech_common::survey::{weighted_summary, Metadata};
use ech_common::{Error, Result, SummaryRequest, SurveyHandle, Table, Weights};

const DATA_2019: &str = "\
anio,numero,nper,sexo,dpto,ingreso,pesoano
2019,1,1,1,Montevideo,1000,10
2019,1,2,2,Montevideo,500,10
2019,2,1,2,Salto,2000,5
2019,3,1,1,Salto,1500,20
";

// 2018 has no annual weights
const DATA_2018: &str = "\
anio,numero,nper,sexo,dpto,ingreso,pesomen
2018,1,1,1,Montevideo,900,3
";

pub struct FakeSurvey {
    year: Option<u16>,
    data: Option<Table>,
    dictionary: Option<Table>,
    metadata: Metadata,
    weights: Option<Weights>,
    pub load_calls: usize,
    search_calls: CallCounter<usize>,
}

impl FakeSurvey {
    pub fn new() -> Self {
        Self {
            year: None,
            data: None,
            dictionary: None,
            metadata: Metadata::default(),
            weights: None,
            load_calls: 0,
            search_calls: CallCounter::new(0),
        }
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.get()
    }
}

fn labels() -> BTreeMap<String, String> {
    [
        ("sexo", "Sexo"),
        ("dpto", "Departamento"),
        ("ingreso", "Ingreso total"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl SurveyHandle for FakeSurvey {
    fn load(&mut self, year: u16) -> Result<()> {
        self.load_calls += 1;
        let raw = match year {
            2019 => DATA_2019,
            2018 => DATA_2018,
            _ => return Err(Error::Load(format!("no survey data for year {}", year))),
        };
        let data = Table::from_csv_reader(raw.as_bytes())?;
        let metadata = Metadata::from_labels(&data.columns, &labels());
        let mut dictionary = Table::new(vec!["Nombre".to_string(), "Descripción".to_string()]);
        for column in &data.columns {
            dictionary.push_row(vec![column.as_str().into(), metadata.label(column).into()])?;
        }
        self.year = Some(year);
        self.data = Some(data);
        self.metadata = metadata;
        self.dictionary = Some(dictionary);
        self.weights = None;
        Ok(())
    }

    fn year(&self) -> Option<u16> {
        self.year
    }

    fn weights(&self) -> Option<Weights> {
        self.weights
    }

    fn set_weights(&mut self, weights: Weights) -> Result<()> {
        match &self.data {
            Some(data) if data.has_column(weights.as_str()) => {
                self.weights = Some(weights);
                Ok(())
            }
            _ => Err(Error::Load(format!("weight column '{}' not available", weights))),
        }
    }

    fn data(&self) -> Option<&Table> {
        self.data.as_ref()
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn dictionary(&self) -> Option<&Table> {
        self.dictionary.as_ref()
    }

    fn search_dictionary(&self, term: &str) -> Result<Table> {
        self.search_calls.set(self.search_calls.get() + 1);
        let dictionary = self
            .dictionary
            .as_ref()
            .ok_or_else(|| Error::NotFound("no survey loaded".to_string()))?;
        let needle = term.trim().to_lowercase();
        Ok(dictionary.filter_rows(|row| {
            row.iter()
                .any(|c| c.to_string().to_lowercase().contains(&needle))
        }))
    }

    fn summarize(&self, request: &SummaryRequest) -> Result<Table> {
        let data = self
            .data
            .as_ref()
            .ok_or_else(|| Error::NotFound("no survey loaded".to_string()))?;
        let weights = self
            .weights
            .ok_or_else(|| Error::InvalidInput("weights not set".to_string()))?;
        weighted_summary(data, weights.as_str(), request)
    }
}
