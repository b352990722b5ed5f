//! Shared domain enums, stored as PostgreSQL enum types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// Language
// ---------------------------------------------------------------------------

/// Languages the collection is catalogued in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "book_language")]
pub enum Language {
    English,
    Kannada,
    Malayalam,
    Urdu,
    Arabic,
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Language::English => "English",
            Language::Kannada => "Kannada",
            Language::Malayalam => "Malayalam",
            Language::Urdu => "Urdu",
            Language::Arabic => "Arabic",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// Book status
// ---------------------------------------------------------------------------

/// Shelf status of a book title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "book_status", rename_all = "lowercase")]
pub enum BookStatus {
    Available,
    /// Every copy is out on loan
    Issued,
    Maintenance,
    Lost,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Available => "available",
            BookStatus::Issued => "issued",
            BookStatus::Maintenance => "maintenance",
            BookStatus::Lost => "lost",
        }
    }
}

impl std::fmt::Display for BookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Members
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type, Default)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "membership_type", rename_all = "lowercase")]
pub enum MembershipType {
    #[default]
    Regular,
    Premium,
    Student,
}

/// Member account status. Only active members may borrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type, Default)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "member_status", rename_all = "lowercase")]
pub enum MemberStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
}

impl MemberStatus {
    /// Only active members may take books out
    pub fn can_borrow(self) -> bool {
        self == MemberStatus::Active
    }
}

impl std::fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            MemberStatus::Active => "active",
            MemberStatus::Inactive => "inactive",
            MemberStatus::Suspended => "suspended",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// Circulation
// ---------------------------------------------------------------------------

/// Lifecycle of a circulation record: `issued` then `returned` or `lost`.
///
/// `overdue` exists for administrative marking only; live views derive
/// overdue-ness from the due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "circulation_status", rename_all = "lowercase")]
pub enum CirculationStatus {
    Issued,
    Returned,
    Overdue,
    Lost,
}

impl CirculationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CirculationStatus::Returned | CirculationStatus::Lost)
    }
}

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "feedback_type", rename_all = "snake_case")]
pub enum FeedbackType {
    BookReview,
    ServiceFeedback,
    Suggestion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type, Default)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "feedback_status", rename_all = "lowercase")]
pub enum FeedbackStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}
