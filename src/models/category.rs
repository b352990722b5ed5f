//! Category model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Add category request
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddCategory {
    pub name: String,
}

/// Trim a proposed category name, rejecting blank ones
pub fn normalize_category_name(name: &str) -> AppResult<String> {
    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        return Err(AppError::Validation("Category name is required".to_string()));
    }
    if name.chars().count() > 100 {
        return Err(AppError::Validation("Category name is too long".to_string()));
    }
    Ok(name)
}
