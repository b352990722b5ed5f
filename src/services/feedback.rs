//! Reader feedback: reviews, suggestions and moderation

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use super::changes::{ChangeAction, ChangeEvent, ChangeNotifier, ChangeTable};
use crate::{
    error::{AppError, AppResult},
    models::{
        enums::{FeedbackStatus, FeedbackType},
        feedback::{
            Feedback, FeedbackQuery, NewFeedback, SubmitReview, SubmitServiceFeedback,
            SubmitSuggestion,
        },
    },
    repository::CatalogStore,
};

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct FeedbackService {
    store: Arc<dyn CatalogStore>,
    notifier: Arc<dyn ChangeNotifier>,
}

impl FeedbackService {
    pub fn new(store: Arc<dyn CatalogStore>, notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self { store, notifier }
    }

    async fn insert(&self, data: NewFeedback) -> AppResult<Feedback> {
        let feedback = self.store.insert_feedback(&data).await?;
        self.notifier
            .publish(ChangeEvent::new(ChangeTable::Feedback, ChangeAction::Insert, feedback.id));
        Ok(feedback)
    }

    /// Review a book. Both the member and the book must exist.
    pub async fn submit_review(&self, data: SubmitReview) -> AppResult<Feedback> {
        data.validate()?;
        self.store.get_member(data.member_id).await?;
        self.store.get_book(data.book_id).await?;

        self.insert(NewFeedback {
            member_id: data.member_id,
            book_id: Some(data.book_id),
            rating: Some(data.rating),
            review: non_blank(data.review),
            feedback_type: FeedbackType::BookReview,
            suggestion_title: None,
            suggestion_author: None,
            suggestion_reason: None,
        })
        .await
    }

    /// Suggest a title for the library to acquire
    pub async fn submit_suggestion(&self, data: SubmitSuggestion) -> AppResult<Feedback> {
        data.validate()?;
        let title = data.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::Validation("Suggested title is required".to_string()));
        }
        self.store.get_member(data.member_id).await?;

        self.insert(NewFeedback {
            member_id: data.member_id,
            book_id: None,
            rating: None,
            review: None,
            feedback_type: FeedbackType::Suggestion,
            suggestion_title: Some(title),
            suggestion_author: non_blank(data.author),
            suggestion_reason: non_blank(data.reason),
        })
        .await
    }

    pub async fn submit_service_feedback(&self, data: SubmitServiceFeedback) -> AppResult<Feedback> {
        data.validate()?;
        self.store.get_member(data.member_id).await?;

        self.insert(NewFeedback {
            member_id: data.member_id,
            book_id: None,
            rating: data.rating,
            review: non_blank(Some(data.review)),
            feedback_type: FeedbackType::ServiceFeedback,
            suggestion_title: None,
            suggestion_author: None,
            suggestion_reason: None,
        })
        .await
    }

    /// Approve or reject a submission
    pub async fn moderate(&self, id: Uuid, status: FeedbackStatus) -> AppResult<Feedback> {
        if status == FeedbackStatus::Pending {
            return Err(AppError::Validation(
                "Feedback can only be approved or rejected".to_string(),
            ));
        }
        let feedback = self.store.set_feedback_status(id, status).await?;
        tracing::info!("Feedback {} marked {:?}", id, status);
        self.notifier
            .publish(ChangeEvent::new(ChangeTable::Feedback, ChangeAction::Update, id));
        Ok(feedback)
    }

    pub async fn list(&self, query: &FeedbackQuery) -> AppResult<Vec<Feedback>> {
        self.store.list_feedback(query).await
    }
}
