//! Reader feedback: book reviews, service feedback and purchase suggestions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::enums::{FeedbackStatus, FeedbackType};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Feedback {
    pub id: Uuid,
    pub member_id: Uuid,
    pub book_id: Option<Uuid>,
    pub rating: Option<i16>,
    pub review: Option<String>,
    pub feedback_type: FeedbackType,
    pub status: FeedbackStatus,
    pub suggestion_title: Option<String>,
    pub suggestion_author: Option<String>,
    pub suggestion_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Feedback as handed to the store, already checked by the service
#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub member_id: Uuid,
    pub book_id: Option<Uuid>,
    pub rating: Option<i16>,
    pub review: Option<String>,
    pub feedback_type: FeedbackType,
    pub suggestion_title: Option<String>,
    pub suggestion_author: Option<String>,
    pub suggestion_reason: Option<String>,
}

/// Submit a book review
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SubmitReview {
    pub member_id: Uuid,
    pub book_id: Uuid,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,
    #[validate(length(max = 5000, message = "Review is too long"))]
    pub review: Option<String>,
}

/// Suggest a title for acquisition
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SubmitSuggestion {
    pub member_id: Uuid,
    #[validate(length(min = 1, message = "Suggested title is required"))]
    pub title: String,
    pub author: Option<String>,
    #[validate(length(max = 2000, message = "Reason is too long"))]
    pub reason: Option<String>,
}

/// Free-form feedback about the library service
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SubmitServiceFeedback {
    pub member_id: Uuid,
    #[validate(length(min = 1, max = 5000, message = "Feedback text is required"))]
    pub review: String,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i16>,
}

/// Moderation request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ModerateFeedback {
    pub status: FeedbackStatus,
}

/// Feedback query parameters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct FeedbackQuery {
    pub feedback_type: Option<FeedbackType>,
    pub status: Option<FeedbackStatus>,
    pub book_id: Option<Uuid>,
}

impl FeedbackQuery {
    pub fn matches(&self, feedback: &Feedback) -> bool {
        self.feedback_type.map(|t| t == feedback.feedback_type).unwrap_or(true)
            && self.status.map(|s| s == feedback.status).unwrap_or(true)
            && self.book_id.map(|id| Some(id) == feedback.book_id).unwrap_or(true)
    }
}
