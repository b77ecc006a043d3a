//! Summary table API with pagination, sorting, filtering and CSV export

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use ech_common::format::format_cell;
use serde::Serialize;
use uuid::Uuid;

use super::sessions::find_session;
use crate::error::{ApiError, ApiResult};
use crate::pagination::{select_page, TableQuery, PAGE_SIZE};
use crate::pipeline::render::ColumnSpec;
use crate::AppState;

/// Paged summary table response
#[derive(Debug, Serialize)]
pub struct TableDataResponse {
    pub total_rows: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub columns: Vec<ColumnSpec>,
    /// Display text, formatted per column
    pub rows: Vec<Vec<String>>,
}

/// GET /api/sessions/:id/table
pub async fn get_table_data(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<TableQuery>,
) -> ApiResult<Json<TableDataResponse>> {
    let session = find_session(&state, id).await?;
    let view = session
        .table()
        .await
        .ok_or_else(|| ApiError::NotFound("no summary table".to_string()))?;

    let page = select_page(&view.table, &query)?;
    let rows = page
        .rows
        .iter()
        .map(|row| row.iter().map(format_cell).collect())
        .collect();

    Ok(Json(TableDataResponse {
        total_rows: page.total_rows,
        page: page.pagination.page,
        page_size: PAGE_SIZE,
        total_pages: page.pagination.total_pages,
        columns: view.columns.clone(),
        rows,
    }))
}

/// GET /api/sessions/:id/table.csv
///
/// Full table, unpaged and unfiltered, headed by column labels.
pub async fn export_table_csv(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let session = find_session(&state, id).await?;
    let view = session
        .table()
        .await
        .ok_or_else(|| ApiError::NotFound("no summary table".to_string()))?;
    let body = view.to_csv()?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"ech_summary.csv\"",
            ),
        ],
        body,
    )
        .into_response())
}
