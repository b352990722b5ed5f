//! Circulation (loan) record model and related types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::enums::CirculationStatus;

/// Circulation record from database. Records are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Circulation {
    pub id: Uuid,
    pub book_id: Uuid,
    pub member_id: Uuid,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: CirculationStatus,
    pub fine_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Circulation {
    /// An open record is issued and not yet returned
    pub fn is_open(&self) -> bool {
        self.status == CirculationStatus::Issued && self.return_date.is_none()
    }

    /// Overdue-ness is derived from the clock, never from the stored status
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == CirculationStatus::Issued && self.due_date < now
    }
}

/// Data for a new loan, prepared by the circulation service
#[derive(Debug, Clone)]
pub struct NewCirculation {
    pub book_id: Uuid,
    pub member_id: Uuid,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

/// Dashboard tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CirculationView {
    #[default]
    All,
    Issued,
    Overdue,
    Returned,
}

/// Store-level filter for circulation listings
#[derive(Debug, Clone, Default)]
pub struct CirculationFilter {
    pub book_id: Option<Uuid>,
    pub member_id: Option<Uuid>,
    pub status: Option<CirculationStatus>,
    /// Only issued records due strictly before this instant
    pub due_before: Option<DateTime<Utc>>,
    /// Most recent first when set, else oldest first
    pub newest_first: bool,
    pub limit: Option<i64>,
}

impl CirculationFilter {
    pub fn open_for_book(book_id: Uuid) -> Self {
        Self {
            book_id: Some(book_id),
            status: Some(CirculationStatus::Issued),
            newest_first: true,
            ..Default::default()
        }
    }

    pub fn matches(&self, record: &Circulation) -> bool {
        self.book_id.map(|id| id == record.book_id).unwrap_or(true)
            && self.member_id.map(|id| id == record.member_id).unwrap_or(true)
            && self.status.map(|s| s == record.status).unwrap_or(true)
            && self
                .due_before
                .map(|t| record.status == CirculationStatus::Issued && record.due_date < t)
                .unwrap_or(true)
    }
}

/// Circulation dashboard query parameters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct CirculationQuery {
    #[serde(default)]
    pub view: CirculationView,
    /// Matches book title, author or member name
    pub search: Option<String>,
    pub member_id: Option<Uuid>,
    pub book_id: Option<Uuid>,
}

/// Circulation record resolved against its book and member
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CirculationDetails {
    #[serde(flatten)]
    pub record: Circulation,
    pub book_title: String,
    pub book_author: String,
    pub member_name: String,
    pub is_overdue: bool,
}

#[cfg(test)]
pub(crate) fn sample_record(
    book_id: Uuid,
    member_id: Uuid,
    due_date: DateTime<Utc>,
    status: CirculationStatus,
) -> Circulation {
    let issue_date = due_date - chrono::Duration::days(14);
    Circulation {
        id: Uuid::new_v4(),
        book_id,
        member_id,
        issue_date,
        due_date,
        return_date: (status == CirculationStatus::Returned).then_some(due_date),
        status,
        fine_amount: Decimal::ZERO,
        created_at: issue_date,
        updated_at: issue_date,
    }
}
