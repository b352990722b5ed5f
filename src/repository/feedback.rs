//! Feedback repository

use sqlx::{Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::FeedbackStatus,
        feedback::{Feedback, FeedbackQuery, NewFeedback},
    },
};

#[derive(Clone)]
pub struct FeedbackRepository {
    pool: Pool<Postgres>,
}

impl FeedbackRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Newest first
    pub async fn list(&self, query: &FeedbackQuery) -> AppResult<Vec<Feedback>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM feedback WHERE TRUE");
        if let Some(feedback_type) = query.feedback_type {
            builder.push(" AND feedback_type = ").push_bind(feedback_type);
        }
        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(book_id) = query.book_id {
            builder.push(" AND book_id = ").push_bind(book_id);
        }
        builder.push(" ORDER BY created_at DESC");

        let rows = builder.build_query_as::<Feedback>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    pub async fn insert(&self, data: &NewFeedback) -> AppResult<Feedback> {
        let row = sqlx::query_as::<_, Feedback>(
            r#"
            INSERT INTO feedback (
                member_id, book_id, rating, review, feedback_type,
                suggestion_title, suggestion_author, suggestion_reason
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(data.member_id)
        .bind(data.book_id)
        .bind(data.rating)
        .bind(&data.review)
        .bind(data.feedback_type)
        .bind(&data.suggestion_title)
        .bind(&data.suggestion_author)
        .bind(&data.suggestion_reason)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn set_status(&self, id: Uuid, status: FeedbackStatus) -> AppResult<Feedback> {
        sqlx::query_as::<_, Feedback>("UPDATE feedback SET status = $2 WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(status)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Feedback {} not found", id)))
    }
}
