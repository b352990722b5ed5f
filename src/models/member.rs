//! Member (borrower) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::enums::{MemberStatus, MembershipType};
use super::matches_term;

/// Member model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub place: Option<String>,
    /// School class, for student members
    #[serde(rename = "class")]
    #[sqlx(rename = "class")]
    pub class_name: Option<String>,
    pub register_number: Option<String>,
    pub membership_type: MembershipType,
    pub status: MemberStatus,
    pub membership_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    pub fn can_borrow(&self) -> bool {
        self.status.can_borrow()
    }
}

/// Create member request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateMember {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub place: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub register_number: Option<String>,
    #[serde(default)]
    pub membership_type: MembershipType,
    #[serde(default)]
    pub status: MemberStatus,
}

/// Update member request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateMember {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub place: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub register_number: Option<String>,
    pub membership_type: Option<MembershipType>,
    pub status: Option<MemberStatus>,
}

/// Member query parameters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct MemberQuery {
    /// Matches name, email, phone, class or register number
    pub search: Option<String>,
    pub status: Option<MemberStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl MemberQuery {
    pub fn matches(&self, member: &Member) -> bool {
        if let Some(ref term) = self.search {
            let optional = [
                member.phone.as_deref(),
                member.class_name.as_deref(),
                member.register_number.as_deref(),
            ];
            let hit = matches_term(&member.name, term)
                || matches_term(&member.email, term)
                || optional.iter().flatten().any(|v| matches_term(v, term));
            if !hit {
                return false;
            }
        }
        self.status.map(|s| s == member.status).unwrap_or(true)
    }
}

#[cfg(test)]
pub(crate) fn sample_member(name: &str) -> Member {
    let now = Utc::now();
    Member {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: format!("{}@example.org", name.to_lowercase().replace(' ', ".")),
        phone: None,
        address: None,
        place: None,
        class_name: Some("8B".to_string()),
        register_number: Some("R-1042".to_string()),
        membership_type: MembershipType::Student,
        status: MemberStatus::Active,
        membership_date: now,
        created_at: now,
        updated_at: now,
    }
}
