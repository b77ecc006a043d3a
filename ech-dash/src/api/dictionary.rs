//! Variable dictionary API

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use super::sessions::find_session;
use crate::error::{ApiError, ApiResult};
use crate::pagination::{select_page, TableQuery, PAGE_SIZE};
use crate::AppState;

/// Paged dictionary response
#[derive(Debug, Serialize)]
pub struct DictionaryResponse {
    pub total_rows: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// GET /api/sessions/:id/dictionary
///
/// Serves the dictionary as filtered by the session's search term; 404
/// while no survey is loaded.
pub async fn get_dictionary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<TableQuery>,
) -> ApiResult<Json<DictionaryResponse>> {
    let session = find_session(&state, id).await?;
    let dictionary = session
        .dictionary()
        .await
        .ok_or_else(|| ApiError::NotFound("no survey loaded".to_string()))?;

    // The search term already filtered the table; `filter` is not applied twice
    let query = TableQuery {
        filter: None,
        ..query
    };
    let page = select_page(&dictionary, &query)?;
    let rows = page
        .rows
        .iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect();

    Ok(Json(DictionaryResponse {
        total_rows: page.total_rows,
        page: page.pagination.page,
        page_size: PAGE_SIZE,
        total_pages: page.pagination.total_pages,
        columns: dictionary.columns.clone(),
        rows,
    }))
}
