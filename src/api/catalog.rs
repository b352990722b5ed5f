//! Public catalog endpoint

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::book::{CatalogEntry, CatalogQuery},
    AppState,
};

use super::PaginatedResponse;

/// Search the public catalog by title, author or ISBN
#[utoipa::path(
    get,
    path = "/catalog",
    tag = "catalog",
    params(CatalogQuery),
    responses(
        (status = 200, description = "Matching titles ordered by title", body = PaginatedResponse<CatalogEntry>)
    )
)]
pub async fn search_catalog(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> AppResult<Json<PaginatedResponse<CatalogEntry>>> {
    let (items, total) = state.services.catalog.search(&query).await?;

    Ok(Json(PaginatedResponse {
        items,
        total,
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    }))
}
