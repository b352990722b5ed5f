//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{
    books, catalog, categories, changes, circulation, feedback, health, members, reports, session,
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Libris API",
        version = "0.3.0",
        description = "Library catalog and circulation REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Session
        session::get_session,
        // Catalog
        catalog::search_catalog,
        // Categories
        categories::list_categories,
        categories::add_category,
        categories::delete_category,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::return_book,
        // Members
        members::list_members,
        members::get_member,
        members::create_member,
        members::update_member,
        members::delete_member,
        // Circulation
        circulation::list_circulation,
        circulation::issue_book,
        circulation::record_fine,
        // Reports
        reports::get_reports,
        // Feedback
        feedback::list_feedback,
        feedback::submit_review,
        feedback::submit_suggestion,
        feedback::submit_service_feedback,
        feedback::moderate_feedback,
        // Changes
        changes::stream_changes,
    ),
    components(
        schemas(
            // Books
            crate::models::book::Book,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::book::CatalogEntry,
            crate::models::enums::BookStatus,
            crate::models::enums::Language,
            // Categories
            crate::models::category::Category,
            crate::models::category::AddCategory,
            // Members
            crate::models::member::Member,
            crate::models::member::CreateMember,
            crate::models::member::UpdateMember,
            crate::models::enums::MembershipType,
            crate::models::enums::MemberStatus,
            // Circulation
            crate::models::circulation::Circulation,
            crate::models::circulation::CirculationDetails,
            crate::models::circulation::CirculationView,
            crate::models::enums::CirculationStatus,
            circulation::IssueRequest,
            circulation::FineRequest,
            // Reports
            crate::services::reports::Reports,
            crate::services::reports::BookCount,
            crate::services::reports::MemberCount,
            crate::services::reports::IssuedLoan,
            // Feedback
            crate::models::feedback::Feedback,
            crate::models::feedback::SubmitReview,
            crate::models::feedback::SubmitSuggestion,
            crate::models::feedback::SubmitServiceFeedback,
            crate::models::feedback::ModerateFeedback,
            crate::models::enums::FeedbackType,
            crate::models::enums::FeedbackStatus,
            // Session
            crate::models::auth::SessionInfo,
            crate::models::auth::SessionView,
            // Changes
            crate::services::changes::ChangeEvent,
            crate::services::changes::ChangeTable,
            crate::services::changes::ChangeAction,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "session", description = "Session gate"),
        (name = "catalog", description = "Public catalog"),
        (name = "categories", description = "Category procedures"),
        (name = "books", description = "Book management"),
        (name = "members", description = "Member management"),
        (name = "circulation", description = "Issue and return"),
        (name = "reports", description = "Circulation reports"),
        (name = "feedback", description = "Reviews, suggestions and moderation"),
        (name = "changes", description = "Server-sent change events")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
