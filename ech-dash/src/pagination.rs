//! Pagination, sorting and filtering of in-memory tables
//!
//! Shared by the summary table and dictionary endpoints (50 rows/page).

use ech_common::format::format_cell;
use ech_common::{Cell, Error, Result, Table};
use serde::Deserialize;

/// Page size constant for all pagination
pub const PAGE_SIZE: usize = 50;

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: usize,
    /// Total number of pages
    pub total_pages: usize,
    /// Index of the first row on the page
    pub offset: usize,
}

/// Calculate pagination metadata from total results and requested page
///
/// Ensures page is within valid bounds [1, total_pages]
///
/// # Examples
/// ```
/// use ech_dash::pagination::calculate_pagination;
///
/// // 120 total results = 3 pages (50 + 50 + 20)
/// let p = calculate_pagination(120, 2);
/// assert_eq!(p.page, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 50);
///
/// // Requesting out-of-bounds page gets clamped
/// let p = calculate_pagination(120, 99);
/// assert_eq!(p.page, 3);
/// assert_eq!(p.offset, 100);
/// ```
pub fn calculate_pagination(total_results: usize, requested_page: usize) -> Pagination {
    let total_pages = total_results.div_ceil(PAGE_SIZE);
    let page = requested_page.max(1).min(total_pages.max(1));
    let offset = (page - 1) * PAGE_SIZE;

    Pagination {
        page,
        total_pages,
        offset,
    }
}

/// Query parameters for paged table views
#[derive(Debug, Clone, Deserialize)]
pub struct TableQuery {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    pub page: usize,

    /// Column id to sort by
    pub sort: Option<String>,

    /// Sort order: "asc" or "desc"
    #[serde(default = "default_order")]
    pub order: String,

    /// Case-insensitive substring matched against any displayed cell
    pub filter: Option<String>,
}

fn default_page() -> usize {
    1
}

fn default_order() -> String {
    "asc".to_string()
}

impl Default for TableQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            sort: None,
            order: default_order(),
            filter: None,
        }
    }
}

/// One page of rows after filtering and sorting
#[derive(Debug)]
pub struct Page<'a> {
    pub pagination: Pagination,
    /// Rows left after filtering
    pub total_rows: usize,
    pub rows: Vec<&'a [Cell]>,
}

/// Filter, sort and slice `table` per `query`
pub fn select_page<'a>(table: &'a Table, query: &TableQuery) -> Result<Page<'a>> {
    let mut rows: Vec<&[Cell]> = table.rows.iter().map(Vec::as_slice).collect();

    if let Some(needle) = query
        .filter
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
    {
        let needle = needle.to_lowercase();
        rows.retain(|row| {
            row.iter()
                .any(|cell| format_cell(cell).to_lowercase().contains(&needle))
        });
    }

    if let Some(column) = &query.sort {
        let idx = table
            .column_index(column)
            .ok_or_else(|| Error::UnknownColumn(column.clone()))?;
        let descending = query.order.eq_ignore_ascii_case("desc");
        rows.sort_by(|a, b| {
            let ord = a[idx].total_cmp(&b[idx]);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        });
    }

    let total_rows = rows.len();
    let pagination = calculate_pagination(total_rows, query.page);
    let rows = rows
        .into_iter()
        .skip(pagination.offset)
        .take(PAGE_SIZE)
        .collect();

    Ok(Page {
        pagination,
        total_rows,
        rows,
    })
}
