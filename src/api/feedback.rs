//! Feedback endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::feedback::{
        Feedback, FeedbackQuery, ModerateFeedback, SubmitReview, SubmitServiceFeedback,
        SubmitSuggestion,
    },
    AppState,
};

use super::AdminUser;

/// List feedback, newest first
#[utoipa::path(
    get,
    path = "/feedback",
    tag = "feedback",
    security(("bearer_auth" = [])),
    params(FeedbackQuery),
    responses(
        (status = 200, description = "Feedback entries", body = Vec<Feedback>),
        (status = 403, description = "Not library staff")
    )
)]
pub async fn list_feedback(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Query(query): Query<FeedbackQuery>,
) -> AppResult<Json<Vec<Feedback>>> {
    let rows = state.services.feedback.list(&query).await?;
    Ok(Json(rows))
}

/// Review a book
#[utoipa::path(
    post,
    path = "/feedback/reviews",
    tag = "feedback",
    request_body = SubmitReview,
    responses(
        (status = 201, description = "Review stored for moderation", body = Feedback),
        (status = 400, description = "Rating outside 1-5"),
        (status = 404, description = "Member or book not found")
    )
)]
pub async fn submit_review(
    State(state): State<AppState>,
    Json(request): Json<SubmitReview>,
) -> AppResult<(StatusCode, Json<Feedback>)> {
    let feedback = state.services.feedback.submit_review(request).await?;
    Ok((StatusCode::CREATED, Json(feedback)))
}

/// Suggest a title for acquisition
#[utoipa::path(
    post,
    path = "/feedback/suggestions",
    tag = "feedback",
    request_body = SubmitSuggestion,
    responses(
        (status = 201, description = "Suggestion stored for moderation", body = Feedback),
        (status = 400, description = "Missing title"),
        (status = 404, description = "Member not found")
    )
)]
pub async fn submit_suggestion(
    State(state): State<AppState>,
    Json(request): Json<SubmitSuggestion>,
) -> AppResult<(StatusCode, Json<Feedback>)> {
    let feedback = state.services.feedback.submit_suggestion(request).await?;
    Ok((StatusCode::CREATED, Json(feedback)))
}

/// Leave feedback about the library service
#[utoipa::path(
    post,
    path = "/feedback/service",
    tag = "feedback",
    request_body = SubmitServiceFeedback,
    responses(
        (status = 201, description = "Feedback stored for moderation", body = Feedback),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Member not found")
    )
)]
pub async fn submit_service_feedback(
    State(state): State<AppState>,
    Json(request): Json<SubmitServiceFeedback>,
) -> AppResult<(StatusCode, Json<Feedback>)> {
    let feedback = state.services.feedback.submit_service_feedback(request).await?;
    Ok((StatusCode::CREATED, Json(feedback)))
}

/// Approve or reject feedback
#[utoipa::path(
    put,
    path = "/feedback/{id}/status",
    tag = "feedback",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Feedback ID")
    ),
    request_body = ModerateFeedback,
    responses(
        (status = 200, description = "Status changed", body = Feedback),
        (status = 400, description = "Cannot move back to pending"),
        (status = 404, description = "Feedback not found")
    )
)]
pub async fn moderate_feedback(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ModerateFeedback>,
) -> AppResult<Json<Feedback>> {
    let feedback = state.services.feedback.moderate(id, request.status).await?;
    Ok(Json(feedback))
}
