//! HTTP API tests
//!
//! Drive the full router over the in-memory store.
//! Run with: cargo test --test api_tests

mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use libris_server::{
    api, config::AppConfig, models::auth::SessionClaims, repository::MemoryStore, AppState,
};

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    admin_token: String,
    anon_token: String,
}

impl TestApp {
    fn new() -> Self {
        let config = AppConfig::default();
        let admin_token = token(&config, "authenticated");
        let anon_token = token(&config, "anon");
        let store = Arc::new(MemoryStore::new());
        let router = api::create_router(AppState::new(config, store.clone()));
        Self {
            router,
            store,
            admin_token,
            anon_token,
        }
    }

    async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn admin(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let token = self.admin_token.clone();
        self.call(method, uri, Some(token.as_str()), body).await
    }
}

fn token(config: &AppConfig, role: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    SessionClaims {
        sub: uuid::Uuid::new_v4().to_string(),
        email: Some(format!("{}@example.org", role)),
        role: role.to_string(),
        exp: now + 3600,
        iat: Some(now),
    }
    .create_token(&config.auth.jwt_secret)
    .expect("token")
}

fn id_of(value: &Value) -> String {
    value["id"].as_str().expect("id").to_string()
}

// =============================================================================
// Health and session
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();
    let (status, body) = app.call("GET", "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_readiness_fails_when_store_is_down() {
    let app = TestApp::new();
    let (status, _) = app.call("GET", "/api/v1/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);

    app.store.set_offline(true);
    let (status, body) = app.call("GET", "/api/v1/ready", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["message"].as_str().unwrap_or_default().contains("retry"));
}

#[tokio::test]
async fn test_session_resolves_view() {
    let app = TestApp::new();

    let (status, body) = app.call("GET", "/api/v1/session", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authenticated"], false);
    assert_eq!(body["view"], "public");

    let (_, body) = app
        .call("GET", "/api/v1/session", Some("not-a-jwt"), None)
        .await;
    assert_eq!(body["authenticated"], false);

    let (_, body) = app.admin("GET", "/api/v1/session", None).await;
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["view"], "admin");
    assert_eq!(body["email"], "authenticated@example.org");
}

#[tokio::test]
async fn test_admin_routes_require_staff_token() {
    let app = TestApp::new();

    let (status, _) = app.call("GET", "/api/v1/books", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let anon = app.anon_token.clone();
    let (status, _) = app.call("GET", "/api/v1/books", Some(anon.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.admin("GET", "/api/v1/books", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
}

// =============================================================================
// Circulation flow
// =============================================================================

#[tokio::test]
async fn test_issue_and_return_flow() {
    let app = TestApp::new();

    let (status, category) = app
        .admin("POST", "/api/v1/categories", Some(json!({ "name": "fiction" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, book) = app
        .admin(
            "POST",
            "/api/v1/books",
            Some(json!({
                "title": "The Guide",
                "author": "R. K. Narayan",
                "category_id": category["id"],
                "total_copies": 1
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(book["available_copies"], 1);
    let book_id = id_of(&book);

    let (status, member) = app
        .admin(
            "POST",
            "/api/v1/members",
            Some(json!({ "name": "Raju", "email": "raju@example.org" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let member_id = id_of(&member);

    let issue = json!({ "book_id": book_id, "member_id": member_id, "loan_days": 7 });
    let (status, loan) = app
        .admin("POST", "/api/v1/circulation", Some(issue.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(loan["status"], "issued");

    let (status, _) = app.admin("POST", "/api/v1/circulation", Some(issue)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, listed) = app.admin("GET", "/api/v1/circulation?view=issued", None).await;
    let listed = listed.as_array().expect("array");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["book_title"], "The Guide");
    assert_eq!(listed[0]["member_name"], "Raju");

    let return_uri = format!("/api/v1/books/{}/return", book_id);
    let (status, returned) = app.admin("POST", &return_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(returned["status"], "returned");

    let (status, _) = app.admin("POST", &return_uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, book) = app
        .admin("GET", &format!("/api/v1/books/{}", book_id), None)
        .await;
    assert_eq!(book["available_copies"], 1);
    assert_eq!(book["category_name"], "fiction");

    let (status, reports) = app.admin("GET", "/api/v1/reports", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reports["most_borrowed"][0]["title"], "The Guide");
    assert_eq!(reports["most_borrowed"][0]["count"], 1);
}

#[tokio::test]
async fn test_issue_with_unknown_ids_is_not_found() {
    let app = TestApp::new();
    let (status, _) = app
        .admin(
            "POST",
            "/api/v1/circulation",
            Some(json!({
                "book_id": uuid::Uuid::new_v4(),
                "member_id": uuid::Uuid::new_v4()
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Catalog and categories
// =============================================================================

#[tokio::test]
async fn test_public_catalog_search() {
    let app = TestApp::new();
    for (title, author) in [("Godan", "Premchand"), ("Nirmala", "Premchand"), ("Chemmeen", "Thakazhi")] {
        let (status, _) = app
            .admin(
                "POST",
                "/api/v1/books",
                Some(json!({ "title": title, "author": author, "total_copies": 2 })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app
        .call("GET", "/api/v1/catalog?q=premchand", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    let first = &body["items"][0];
    assert_eq!(first["title"], "Godan");
    assert_eq!(first["is_available"], true);

    let (_, body) = app.call("GET", "/api/v1/catalog", None, None).await;
    assert_eq!(body["total"], 3);
}

#[tokio::test]
async fn test_category_in_use_cannot_be_deleted() {
    let app = TestApp::new();
    let (_, category) = app
        .admin("POST", "/api/v1/categories", Some(json!({ "name": "Poetry" })))
        .await;
    let category_id = id_of(&category);

    let (status, _) = app
        .admin("POST", "/api/v1/categories", Some(json!({ "name": "poetry" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, book) = app
        .admin(
            "POST",
            "/api/v1/books",
            Some(json!({
                "title": "Gitanjali",
                "author": "Tagore",
                "category_id": category_id,
                "total_copies": 1
            })),
        )
        .await;

    let uri = format!("/api/v1/categories/{}", category_id);
    let (status, _) = app.admin("DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .admin("DELETE", &format!("/api/v1/books/{}", id_of(&book)), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.admin("DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, categories) = app.call("GET", "/api/v1/categories", None, None).await;
    assert_eq!(categories.as_array().map(|c| c.len()), Some(0));
}

// =============================================================================
// Feedback
// =============================================================================

#[tokio::test]
async fn test_review_rating_is_validated() {
    let app = TestApp::new();
    let (_, book) = app
        .admin(
            "POST",
            "/api/v1/books",
            Some(json!({ "title": "Kanthapura", "author": "Raja Rao", "total_copies": 1 })),
        )
        .await;
    let (_, member) = app
        .admin(
            "POST",
            "/api/v1/members",
            Some(json!({ "name": "Meera", "email": "meera@example.org" })),
        )
        .await;

    let review = |rating: i64| {
        json!({
            "member_id": member["id"],
            "book_id": book["id"],
            "rating": rating,
            "review": "Loved it"
        })
    };

    let (status, _) = app
        .call("POST", "/api/v1/feedback/reviews", None, Some(review(6)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, created) = app
        .call("POST", "/api/v1/feedback/reviews", None, Some(review(5)))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "pending");

    let uri = format!("/api/v1/feedback/{}/status", id_of(&created));
    let (status, moderated) = app
        .admin("PUT", &uri, Some(json!({ "status": "approved" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moderated["status"], "approved");

    let (status, _) = app
        .admin("PUT", &uri, Some(json!({ "status": "pending" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = TestApp::new();
    let (status, body) = app.call("GET", "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/circulation"].is_object());
}
