//! Category endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::category::{AddCategory, Category},
    AppState,
};

use super::AdminUser;

/// List categories
#[utoipa::path(
    get,
    path = "/categories",
    tag = "categories",
    responses(
        (status = 200, description = "All categories by name", body = Vec<Category>)
    )
)]
pub async fn list_categories(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    let categories = state.services.catalog.list_categories().await?;
    Ok(Json(categories))
}

/// Add a category
#[utoipa::path(
    post,
    path = "/categories",
    tag = "categories",
    security(("bearer_auth" = [])),
    request_body = AddCategory,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 400, description = "Blank name"),
        (status = 409, description = "Name already taken")
    )
)]
pub async fn add_category(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Json(request): Json<AddCategory>,
) -> AppResult<(StatusCode, Json<Category>)> {
    let category = state.services.catalog.add_category(&request.name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Delete a category that no book refers to
#[utoipa::path(
    delete,
    path = "/categories/{id}",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Category ID")
    ),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Category still assigned to books")
    )
)]
pub async fn delete_category(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
