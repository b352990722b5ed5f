//! API handlers for Libris REST endpoints

pub mod books;
pub mod catalog;
pub mod categories;
pub mod changes;
pub mod circulation;
pub mod feedback;
pub mod health;
pub mod members;
pub mod openapi;
pub mod reports;
pub mod session;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    routing::{delete, get, post, put},
    Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::ToSchema;

use crate::{error::AppError, models::auth::SessionClaims, AppState};

/// Paginated response wrapper
#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub items: Vec<T>,
    /// Total number of matching rows
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

/// Caller whose token resolves to an admin role
pub struct AdminUser(pub SessionClaims);

/// Caller who may or may not carry a valid token
pub struct MaybeUser(pub Option<SessionClaims>);

async fn bearer_claims(parts: &mut Parts, state: &AppState) -> Result<SessionClaims, AppError> {
    let TypedHeader(Authorization(bearer)) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::Authentication("Missing or malformed bearer token".to_string()))?;

    SessionClaims::from_token(bearer.token(), &state.config.auth)
        .map_err(|e| AppError::Authentication(e.to_string()))
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = bearer_claims(parts, state).await?;
        claims.require_admin(&state.config.auth)?;
        Ok(AdminUser(claims))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_claims(parts, state).await {
            Ok(claims) => Ok(MaybeUser(Some(claims))),
            Err(e) => {
                tracing::debug!("Treating caller as anonymous: {}", e);
                Ok(MaybeUser(None))
            }
        }
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Session gate
        .route("/session", get(session::get_session))
        // Public catalog
        .route("/catalog", get(catalog::search_catalog))
        // Categories
        .route("/categories", get(categories::list_categories))
        .route("/categories", post(categories::add_category))
        .route("/categories/:id", delete(categories::delete_category))
        // Books
        .route("/books", get(books::list_books))
        .route("/books", post(books::create_book))
        .route("/books/:id", get(books::get_book))
        .route("/books/:id", put(books::update_book))
        .route("/books/:id", delete(books::delete_book))
        .route("/books/:id/return", post(books::return_book))
        // Members
        .route("/members", get(members::list_members))
        .route("/members", post(members::create_member))
        .route("/members/:id", get(members::get_member))
        .route("/members/:id", put(members::update_member))
        .route("/members/:id", delete(members::delete_member))
        // Circulation
        .route("/circulation", get(circulation::list_circulation))
        .route("/circulation", post(circulation::issue_book))
        .route("/circulation/:id/fine", put(circulation::record_fine))
        // Reports
        .route("/reports", get(reports::get_reports))
        // Feedback
        .route("/feedback", get(feedback::list_feedback))
        .route("/feedback/reviews", post(feedback::submit_review))
        .route("/feedback/suggestions", post(feedback::submit_suggestion))
        .route("/feedback/service", post(feedback::submit_service_feedback))
        .route("/feedback/:id/status", put(feedback::moderate_feedback))
        // Change feed
        .route("/changes", get(changes::stream_changes))
        .with_state(state);

    // OpenAPI documentation
    let openapi = openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
