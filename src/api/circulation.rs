//! Circulation endpoints (admin)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::circulation::{Circulation, CirculationDetails, CirculationQuery},
    AppState,
};

use super::AdminUser;

/// Issue request
#[derive(Deserialize, ToSchema)]
pub struct IssueRequest {
    pub book_id: Uuid,
    pub member_id: Uuid,
    /// Loan period in days (server default when absent)
    pub loan_days: Option<i64>,
}

/// Fine request
#[derive(Deserialize, ToSchema)]
pub struct FineRequest {
    /// Non-negative amount
    pub amount: Decimal,
}

/// Circulation dashboard
#[utoipa::path(
    get,
    path = "/circulation",
    tag = "circulation",
    security(("bearer_auth" = [])),
    params(CirculationQuery),
    responses(
        (status = 200, description = "Loans, newest first", body = Vec<CirculationDetails>),
        (status = 403, description = "Not library staff")
    )
)]
pub async fn list_circulation(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Query(query): Query<CirculationQuery>,
) -> AppResult<Json<Vec<CirculationDetails>>> {
    let records = state.services.circulation.list(&query).await?;
    Ok(Json(records))
}

/// Issue a copy of a book to a member
#[utoipa::path(
    post,
    path = "/circulation",
    tag = "circulation",
    security(("bearer_auth" = [])),
    request_body = IssueRequest,
    responses(
        (status = 201, description = "Loan created", body = Circulation),
        (status = 400, description = "Member cannot borrow or loan period out of range"),
        (status = 404, description = "Book or member not found"),
        (status = 409, description = "No copy available"),
        (status = 503, description = "Store unavailable, retry")
    )
)]
pub async fn issue_book(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Json(request): Json<IssueRequest>,
) -> AppResult<(StatusCode, Json<Circulation>)> {
    let record = state
        .services
        .circulation
        .issue(request.book_id, request.member_id, request.loan_days)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Record a fine on a loan
#[utoipa::path(
    put,
    path = "/circulation/{id}/fine",
    tag = "circulation",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Circulation record ID")
    ),
    request_body = FineRequest,
    responses(
        (status = 200, description = "Fine recorded", body = Circulation),
        (status = 400, description = "Negative amount"),
        (status = 404, description = "Record not found")
    )
)]
pub async fn record_fine(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<FineRequest>,
) -> AppResult<Json<Circulation>> {
    let record = state.services.circulation.record_fine(id, request.amount).await?;
    Ok(Json(record))
}
