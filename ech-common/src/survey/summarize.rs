//! Weighted group summaries over survey rows

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use super::{AggFunc, SummaryRequest, Tristate, COUNT_COLUMN};
use crate::table::{Cell, Table};
use crate::{Error, Result};

/// Household id column
const HOUSEHOLD_ID: &str = "numero";
/// Person number within the household; 1 marks the household head row
const PERSON_NUMBER: &str = "nper";

/// Group key ordered by [`Cell::total_cmp`]
#[derive(Debug, Clone)]
struct GroupKey(Vec<Cell>);

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GroupKey {}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            match a.total_cmp(b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        self.0.len().cmp(&other.0.len())
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    weighted_sum: f64,
    weight_total: f64,
}

fn column_index(data: &Table, name: &str) -> Result<usize> {
    data.column_index(name)
        .ok_or_else(|| Error::UnknownColumn(name.to_string()))
}

/// Rows representing one household each
fn household_rows(data: &Table) -> Result<Vec<&Vec<Cell>>> {
    if let Some(nper) = data.column_index(PERSON_NUMBER) {
        return Ok(data
            .rows
            .iter()
            .filter(|row| row[nper].as_f64() == Some(1.0))
            .collect());
    }
    if let Some(numero) = data.column_index(HOUSEHOLD_ID) {
        let mut seen = HashSet::new();
        return Ok(data
            .rows
            .iter()
            .filter(|row| seen.insert(row[numero].to_string()))
            .collect());
    }
    Err(Error::UnsupportedAggregation(format!(
        "household level needs a '{}' or '{}' column",
        PERSON_NUMBER, HOUSEHOLD_ID
    )))
}

/// Summarize `request.variable` over `data` weighted by `weight_column`
///
/// Numeric variables reduce to Σw·x (sum) or Σw·x/Σw (mean) per group of
/// `request.by`. Categorical variables are counted per `by + [variable]`
/// group, yielding a `Recuento` column of summed weights. Rows whose group
/// key, value or weight is null are skipped.
pub fn weighted_summary(
    data: &Table,
    weight_column: &str,
    request: &SummaryRequest,
) -> Result<Table> {
    if request.by.iter().any(|b| b == &request.variable) {
        return Err(Error::InvalidInput(format!(
            "'{}' cannot be both the summarized variable and a grouping column",
            request.variable
        )));
    }

    let var_idx = column_index(data, &request.variable)?;
    let by_idx = request
        .by
        .iter()
        .map(|b| column_index(data, b))
        .collect::<Result<Vec<_>>>()?;
    let weight_idx = column_index(data, weight_column)?;

    let rows = if request.household_level {
        household_rows(data)?
    } else {
        data.rows.iter().collect()
    };

    let has_text = rows.iter().any(|row| matches!(row[var_idx], Cell::Text(_)));
    let categorical = match request.is_categorical {
        Tristate::Auto => request.aggfunc == AggFunc::Count || has_text,
        Tristate::True => true,
        Tristate::False => false,
    };

    match (categorical, request.aggfunc) {
        (true, AggFunc::Sum | AggFunc::Mean) => {
            return Err(Error::UnsupportedAggregation(format!(
                "'{}' is categorical; only count is available",
                request.variable
            )));
        }
        (false, AggFunc::Count) => {
            return Err(Error::UnsupportedAggregation(format!(
                "count requires '{}' to be categorical",
                request.variable
            )));
        }
        (false, _) if has_text => {
            return Err(Error::UnsupportedAggregation(format!(
                "'{}' has non-numeric values and cannot be summed or averaged",
                request.variable
            )));
        }
        _ => {}
    }

    let mut key_idx = by_idx;
    if categorical {
        key_idx.push(var_idx);
    }

    let mut groups: BTreeMap<GroupKey, Accumulator> = BTreeMap::new();
    for row in rows {
        let Some(weight) = row[weight_idx].as_f64() else {
            continue;
        };
        let key: Vec<Cell> = key_idx.iter().map(|&i| row[i].clone()).collect();
        if key.iter().any(Cell::is_null) {
            continue;
        }
        let contribution = if categorical {
            1.0
        } else {
            match row[var_idx].as_f64() {
                Some(x) => x,
                None => continue,
            }
        };

        let acc = groups.entry(GroupKey(key)).or_default();
        acc.weighted_sum += weight * contribution;
        acc.weight_total += weight;
    }

    let mut columns = request.by.clone();
    if categorical {
        columns.push(request.variable.clone());
        columns.push(COUNT_COLUMN.to_string());
    } else {
        columns.push(request.variable.clone());
    }

    let mut out = Table::new(columns);
    for (GroupKey(mut key), acc) in groups {
        let value = match (categorical, request.aggfunc) {
            (true, _) | (false, AggFunc::Sum) => Cell::Number(acc.weighted_sum),
            (false, _) if acc.weight_total == 0.0 => Cell::Null,
            (false, _) => Cell::Number(acc.weighted_sum / acc.weight_total),
        };
        key.push(value);
        out.push_row(key)?;
    }
    Ok(out)
}
