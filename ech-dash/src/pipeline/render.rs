//! Table and chart rendering of the summary artifact
//!
//! The chart is a Plotly figure document (`data` + `layout`) that the UI
//! hands straight to `Plotly.react`.

use std::cmp::Ordering;

use ech_common::format::{format_cell, PRECISION};
use ech_common::survey::{Metadata, COUNT_COLUMN};
use ech_common::{Cell, Error, Result, Table};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

use super::summary::SummaryArtifact;
use crate::pagination::PAGE_SIZE;
use super::{AxisBindings, Inputs};

/// Plotly's qualitative "Prism" palette
pub const PRISM: [&str; 11] = [
    "rgb(95, 70, 144)",
    "rgb(29, 105, 150)",
    "rgb(56, 166, 165)",
    "rgb(15, 133, 84)",
    "rgb(115, 175, 72)",
    "rgb(237, 173, 8)",
    "rgb(225, 124, 5)",
    "rgb(204, 80, 62)",
    "rgb(148, 52, 110)",
    "rgb(111, 64, 112)",
    "rgb(102, 102, 102)",
];

const FACET_COL_SPACING: f64 = 0.03;
const FACET_ROW_SPACING: f64 = 0.07;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Text,
}

/// Display format for numeric cells
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NumberFormat {
    pub precision: usize,
    pub scheme: &'static str,
    pub group: bool,
    pub trim: bool,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            precision: PRECISION,
            scheme: "fixed",
            group: true,
            trim: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSpec {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ColumnKind,
    pub format: NumberFormat,
}

/// Tabular view of the artifact
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    pub columns: Vec<ColumnSpec>,
    #[serde(skip)]
    pub table: Table,
    pub page_size: usize,
}

impl TableView {
    fn new(table: &Table, metadata: &Metadata) -> Self {
        let columns = table
            .columns
            .iter()
            .map(|id| ColumnSpec {
                id: id.clone(),
                name: column_label(id, metadata),
                kind: if table.is_numeric_column(id) {
                    ColumnKind::Numeric
                } else {
                    ColumnKind::Text
                },
                format: NumberFormat::default(),
            })
            .collect();
        Self {
            columns,
            table: table.clone(),
            page_size: PAGE_SIZE,
        }
    }

    /// Display text of every row
    pub fn formatted_rows(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.table
            .rows
            .iter()
            .map(|row| row.iter().map(format_cell).collect())
    }

    /// Full table as CSV, headed by the column labels
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(self.columns.iter().map(|c| c.name.as_str()))?;
        for row in self.formatted_rows() {
            writer.write_record(&row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| Error::Internal(format!("CSV export failed: {}", e)))?;
        String::from_utf8(bytes).map_err(|e| Error::Internal(format!("CSV export failed: {}", e)))
    }
}

/// One bar trace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarTrace {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
    pub x: Vec<Cell>,
    pub y: Vec<Cell>,
    pub xaxis: String,
    pub yaxis: String,
    pub marker: Value,
    pub legendgroup: String,
    pub offsetgroup: String,
    pub showlegend: bool,
}

/// Plotly figure document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub data: Vec<BarTrace>,
    pub layout: Value,
    #[serde(skip)]
    title: String,
    #[serde(skip)]
    y_column: String,
}

impl Figure {
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Column plotted on the Y axis
    pub fn y_column(&self) -> &str {
        &self.y_column
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rendered {
    pub table: TableView,
    pub chart: Figure,
}

fn column_label(column: &str, metadata: &Metadata) -> String {
    if column == COUNT_COLUMN {
        COUNT_COLUMN.to_string()
    } else {
        metadata.label(column)
    }
}

/// Sorted distinct values of a column; `None` is a single catch-all slot
fn distinct(table: &Table, idx: Option<usize>) -> Vec<Cell> {
    let Some(idx) = idx else {
        return vec![Cell::Null];
    };
    let mut values: Vec<Cell> = table.rows.iter().map(|row| row[idx].clone()).collect();
    values.sort_by(|a, b| a.total_cmp(b));
    values.dedup_by(|a, b| a.total_cmp(b) == Ordering::Equal);
    values
}

fn matches(row: &[Cell], idx: Option<usize>, value: &Cell) -> bool {
    idx.map_or(true, |i| row[i].total_cmp(value) == Ordering::Equal)
}

/// Plotly axis id for facet cell `k` (0-based): "", "2", "3", ...
fn axis_suffix(k: usize) -> String {
    if k == 0 {
        String::new()
    } else {
        (k + 1).to_string()
    }
}

/// Domain of slot `i` out of `n`, leaving `spacing` between slots
fn domain(i: usize, n: usize, spacing: f64) -> [f64; 2] {
    let step = 1.0 / n as f64;
    let start = i as f64 * step + if i > 0 { spacing / 2.0 } else { 0.0 };
    let end = (i + 1) as f64 * step - if i + 1 < n { spacing / 2.0 } else { 0.0 };
    [start, end]
}

struct ChartColumns {
    x: Option<usize>,
    color: Option<usize>,
    facet_col: Option<usize>,
    facet_row: Option<usize>,
    y: usize,
}

impl ChartColumns {
    fn resolve(table: &Table, bindings: &AxisBindings, y_column: &str) -> Result<Self> {
        let idx = |binding: &Option<String>| binding.as_deref().and_then(|c| table.column_index(c));
        Ok(Self {
            x: idx(&bindings.x_axis),
            color: idx(&bindings.color),
            facet_col: idx(&bindings.facet_col),
            facet_row: idx(&bindings.facet_row),
            y: table
                .column_index(y_column)
                .ok_or_else(|| Error::UnknownColumn(y_column.to_string()))?,
        })
    }
}

fn grouped_bar_chart(
    table: &Table,
    bindings: &AxisBindings,
    y_column: &str,
    title: String,
    metadata: &Metadata,
) -> Result<Figure> {
    let cols = ChartColumns::resolve(table, bindings, y_column)?;
    let facet_rows = distinct(table, cols.facet_row);
    let facet_cols = distinct(table, cols.facet_col);
    let colors = distinct(table, cols.color);
    let (nrows, ncols) = (facet_rows.len().max(1), facet_cols.len().max(1));

    let mut traces = Vec::new();
    let mut layout = serde_json::Map::new();
    let mut annotations = Vec::new();

    let x_title = bindings
        .x_axis
        .as_deref()
        .filter(|_| cols.x.is_some())
        .map(|c| column_label(c, metadata))
        .unwrap_or_else(|| "index".to_string());
    let y_title = column_label(y_column, metadata);

    for (r, row_value) in facet_rows.iter().enumerate() {
        for (c, col_value) in facet_cols.iter().enumerate() {
            let k = r * ncols + c;
            let suffix = axis_suffix(k);

            for (ci, color_value) in colors.iter().enumerate() {
                let (x, y): (Vec<Cell>, Vec<Cell>) = table
                    .rows
                    .iter()
                    .enumerate()
                    .filter(|(_, row)| {
                        matches(row, cols.facet_row, row_value)
                            && matches(row, cols.facet_col, col_value)
                            && matches(row, cols.color, color_value)
                    })
                    .map(|(i, row)| {
                        let x = match cols.x {
                            Some(xi) => row[xi].clone(),
                            None => Cell::Number(i as f64),
                        };
                        (x, row[cols.y].clone())
                    })
                    .unzip();

                let name = if cols.color.is_some() {
                    color_value.to_string()
                } else {
                    String::new()
                };
                traces.push(BarTrace {
                    kind: "bar",
                    name: name.clone(),
                    x,
                    y,
                    xaxis: format!("x{}", suffix),
                    yaxis: format!("y{}", suffix),
                    marker: json!({ "color": PRISM[ci % PRISM.len()] }),
                    legendgroup: name.clone(),
                    offsetgroup: name,
                    showlegend: cols.color.is_some() && k == 0,
                });
            }

            // Row 0 is drawn at the top
            let x_domain = domain(c, ncols, FACET_COL_SPACING);
            let y_domain = domain(nrows - 1 - r, nrows, FACET_ROW_SPACING);
            let mut xaxis = json!({ "domain": x_domain, "anchor": format!("y{}", suffix) });
            let mut yaxis = json!({ "domain": y_domain, "anchor": format!("x{}", suffix) });
            if k > 0 {
                xaxis["matches"] = json!("x");
                yaxis["matches"] = json!("y");
            }
            if cols.x.is_some() {
                xaxis["type"] = json!("category");
            }
            if r + 1 == nrows {
                xaxis["title"] = json!({ "text": x_title });
            }
            if c == 0 {
                yaxis["title"] = json!({ "text": y_title });
            }
            layout.insert(format!("xaxis{}", suffix), xaxis);
            layout.insert(format!("yaxis{}", suffix), yaxis);
        }
    }

    if let Some(column) = bindings.facet_col.as_deref().filter(|_| cols.facet_col.is_some()) {
        let label = column_label(column, metadata);
        for (c, value) in facet_cols.iter().enumerate() {
            let [start, end] = domain(c, ncols, FACET_COL_SPACING);
            annotations.push(json!({
                "text": format!("{}={}", label, value),
                "x": (start + end) / 2.0,
                "y": 1.0,
                "xref": "paper",
                "yref": "paper",
                "xanchor": "center",
                "yanchor": "bottom",
                "showarrow": false,
            }));
        }
    }
    if let Some(column) = bindings.facet_row.as_deref().filter(|_| cols.facet_row.is_some()) {
        let label = column_label(column, metadata);
        for (r, value) in facet_rows.iter().enumerate() {
            let [start, end] = domain(nrows - 1 - r, nrows, FACET_ROW_SPACING);
            annotations.push(json!({
                "text": format!("{}={}", label, value),
                "x": 1.0,
                "y": (start + end) / 2.0,
                "xref": "paper",
                "yref": "paper",
                "xanchor": "left",
                "yanchor": "middle",
                "textangle": 90,
                "showarrow": false,
            }));
        }
    }

    layout.insert("title".to_string(), json!({ "text": title }));
    layout.insert("barmode".to_string(), json!("group"));
    layout.insert("annotations".to_string(), Value::Array(annotations));
    if let Some(column) = bindings.color.as_deref().filter(|_| cols.color.is_some()) {
        layout.insert(
            "legend".to_string(),
            json!({ "title": { "text": column_label(column, metadata) }, "tracegrouporder": "normal" }),
        );
    }

    Ok(Figure {
        data: traces,
        layout: Value::Object(layout),
        title,
        y_column: y_column.to_string(),
    })
}

/// Render table and chart; `None` when there is nothing to show
pub fn render(
    artifact: Option<&SummaryArtifact>,
    inputs: &Inputs,
    metadata: &Metadata,
) -> Option<Rendered> {
    let artifact = artifact?;
    let sumvar = inputs.sumvar.as_deref()?;

    let y_column = if artifact.has_count_column() {
        COUNT_COLUMN
    } else {
        sumvar
    };
    let title = format!(
        "{} ({}, {})",
        metadata.label(sumvar),
        inputs.year.map(|y| y.to_string()).unwrap_or_default(),
        inputs.weights.map(|w| w.as_str()).unwrap_or_default()
    );

    let chart = match grouped_bar_chart(&artifact.table, &inputs.bindings, y_column, title, metadata) {
        Ok(chart) => chart,
        Err(e) => {
            warn!("Chart rendering skipped: {}", e);
            return None;
        }
    };

    Some(Rendered {
        table: TableView::new(&artifact.table, metadata),
        chart,
    })
}
