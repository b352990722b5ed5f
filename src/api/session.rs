//! Session gate endpoint

use axum::{extract::State, Json};

use crate::{models::auth::SessionInfo, AppState};

use super::MaybeUser;

/// Tell the client which view to show. Never fails for anonymous callers.
#[utoipa::path(
    get,
    path = "/session",
    tag = "session",
    security((), ("bearer_auth" = [])),
    responses(
        (status = 200, description = "Resolved session", body = SessionInfo)
    )
)]
pub async fn get_session(
    State(state): State<AppState>,
    MaybeUser(claims): MaybeUser,
) -> Json<SessionInfo> {
    Json(SessionInfo::resolve(claims.as_ref(), &state.config.auth))
}
