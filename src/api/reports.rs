//! Reports endpoint (admin)

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{error::AppResult, services::reports::Reports, AppState};

use super::AdminUser;

#[derive(Deserialize, IntoParams)]
pub struct ReportsQuery {
    /// Entries per ranking (server default when absent)
    pub limit: Option<usize>,
}

/// Most borrowed books, most active members, open and overdue loans
#[utoipa::path(
    get,
    path = "/reports",
    tag = "reports",
    security(("bearer_auth" = [])),
    params(ReportsQuery),
    responses(
        (status = 200, description = "Circulation reports", body = Reports),
        (status = 403, description = "Not library staff"),
        (status = 503, description = "Store unavailable, retry")
    )
)]
pub async fn get_reports(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Query(query): Query<ReportsQuery>,
) -> AppResult<Json<Reports>> {
    let reports = state.services.reports.get_reports(query.limit).await?;
    Ok(Json(reports))
}
