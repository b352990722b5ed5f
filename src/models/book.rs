//! Book (catalog title) model and related types

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::enums::{BookStatus, Language};
use super::matches_term;
use crate::error::{AppError, AppResult};

/// ISBN-10 or ISBN-13, digits optionally separated by hyphens or spaces
pub static ISBN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[0-9][- ]?){9}[0-9Xx]$|^(?:[0-9][- ]?){12}[0-9]$").unwrap());

/// Book model from database, with the category name resolved
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    /// Dewey Decimal Classification number
    pub ddc_number: Option<String>,
    pub publication_year: Option<i32>,
    pub price: Option<Decimal>,
    pub language: Option<Language>,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub status: BookStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Copies currently out on loan
    pub fn on_loan(&self) -> i32 {
        self.total_copies - self.available_copies
    }

    /// Take one copy off the shelf for a new loan.
    ///
    /// Fails with `Conflict` when no copy is left; the book is unchanged in that case.
    pub fn checkout(&mut self) -> AppResult<()> {
        if self.available_copies <= 0 {
            return Err(AppError::Conflict(format!(
                "No copy of \"{}\" is available",
                self.title
            )));
        }
        self.available_copies -= 1;
        self.status = derive_status(self.status, self.available_copies);
        Ok(())
    }

    /// Put one copy back on the shelf, never exceeding `total_copies`
    pub fn checkin(&mut self) {
        self.available_copies = (self.available_copies + 1).min(self.total_copies);
        if self.status == BookStatus::Issued && self.available_copies > 0 {
            self.status = BookStatus::Available;
        }
    }

    /// Change the number of owned copies, keeping loaned copies accounted for
    pub fn resize(&mut self, total_copies: i32) -> AppResult<()> {
        if total_copies < 1 {
            return Err(AppError::Validation("total_copies must be at least 1".to_string()));
        }
        let on_loan = self.on_loan();
        if total_copies < on_loan {
            return Err(AppError::Conflict(format!(
                "Cannot reduce copies to {}: {} are on loan",
                total_copies, on_loan
            )));
        }
        self.total_copies = total_copies;
        self.available_copies = total_copies - on_loan;
        self.status = derive_status(self.status, self.available_copies);
        Ok(())
    }

    /// Apply an administrative status change
    pub fn set_status(&mut self, status: BookStatus) -> AppResult<()> {
        self.status = match status {
            BookStatus::Issued => {
                return Err(AppError::Validation(
                    "Status 'issued' is managed by circulation".to_string(),
                ))
            }
            BookStatus::Available => derive_status(BookStatus::Issued, self.available_copies),
            other => other,
        };
        Ok(())
    }
}

/// Status of a circulating title after its available count changed.
/// Maintenance and lost are sticky.
pub fn derive_status(current: BookStatus, available_copies: i32) -> BookStatus {
    match current {
        BookStatus::Available | BookStatus::Issued if available_copies > 0 => BookStatus::Available,
        BookStatus::Available | BookStatus::Issued => BookStatus::Issued,
        other => other,
    }
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    #[validate(regex(path = *ISBN_REGEX, message = "Invalid ISBN"))]
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub ddc_number: Option<String>,
    #[validate(range(min = 1000, max = 2100, message = "Invalid publication year"))]
    pub publication_year: Option<i32>,
    pub price: Option<Decimal>,
    pub language: Option<Language>,
    pub category_id: Option<Uuid>,
    #[validate(range(min = 1, message = "A book needs at least one copy"))]
    pub total_copies: i32,
}

impl CreateBook {
    /// Field validation plus the checks `validator` cannot express
    pub fn check(&self) -> AppResult<()> {
        self.validate()?;
        check_price(self.price)
    }
}

/// Update book request. The available counter is never written directly:
/// changing `total_copies` shifts it by the same amount.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Author cannot be empty"))]
    pub author: Option<String>,
    #[validate(regex(path = *ISBN_REGEX, message = "Invalid ISBN"))]
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub ddc_number: Option<String>,
    #[validate(range(min = 1000, max = 2100, message = "Invalid publication year"))]
    pub publication_year: Option<i32>,
    pub price: Option<Decimal>,
    pub language: Option<Language>,
    /// Absent leaves the category unchanged, `null` clears it
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub category_id: Option<Option<Uuid>>,
    #[validate(range(min = 1, message = "A book needs at least one copy"))]
    pub total_copies: Option<i32>,
    pub status: Option<BookStatus>,
}

impl UpdateBook {
    pub fn check(&self) -> AppResult<()> {
        self.validate()?;
        if self.status == Some(BookStatus::Issued) {
            return Err(AppError::Validation(
                "Status 'issued' is managed by circulation".to_string(),
            ));
        }
        check_price(self.price)
    }

    /// Apply the patch to a loaded book. Copy counts go through `resize`.
    pub fn apply_to(&self, book: &mut Book) -> AppResult<()> {
        if let Some(total) = self.total_copies {
            book.resize(total)?;
        }
        if let Some(status) = self.status {
            book.set_status(status)?;
        }
        if let Some(ref title) = self.title {
            book.title = title.clone();
        }
        if let Some(ref author) = self.author {
            book.author = author.clone();
        }
        if self.isbn.is_some() {
            book.isbn = self.isbn.clone();
        }
        if self.publisher.is_some() {
            book.publisher = self.publisher.clone();
        }
        if self.ddc_number.is_some() {
            book.ddc_number = self.ddc_number.clone();
        }
        if self.publication_year.is_some() {
            book.publication_year = self.publication_year;
        }
        if self.price.is_some() {
            book.price = self.price;
        }
        if self.language.is_some() {
            book.language = self.language;
        }
        if let Some(category_id) = self.category_id {
            book.category_id = category_id;
        }
        Ok(())
    }
}

fn check_price(price: Option<Decimal>) -> AppResult<()> {
    match price {
        Some(p) if p.is_sign_negative() => {
            Err(AppError::Validation("Price cannot be negative".to_string()))
        }
        _ => Ok(()),
    }
}

/// Admin book query parameters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Matches title, author or ISBN
    pub search: Option<String>,
    pub status: Option<BookStatus>,
    pub category_id: Option<Uuid>,
    pub language: Option<Language>,
    /// Only titles with at least one copy on the shelf
    pub available_only: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl BookQuery {
    pub fn matches(&self, book: &Book) -> bool {
        if let Some(ref term) = self.search {
            let hit = matches_term(&book.title, term)
                || matches_term(&book.author, term)
                || book.isbn.as_deref().map(|i| matches_term(i, term)).unwrap_or(false);
            if !hit {
                return false;
            }
        }
        if self.status.map(|s| s != book.status).unwrap_or(false) {
            return false;
        }
        if self.category_id.is_some() && self.category_id != book.category_id {
            return false;
        }
        if self.language.is_some() && self.language != book.language {
            return false;
        }
        if self.available_only.unwrap_or(false) && book.available_copies <= 0 {
            return false;
        }
        true
    }
}

/// Public catalog search parameters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct CatalogQuery {
    /// Matches title, author or ISBN
    pub q: Option<String>,
    pub category_id: Option<Uuid>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl From<&CatalogQuery> for BookQuery {
    fn from(query: &CatalogQuery) -> Self {
        BookQuery {
            search: query.q.clone().filter(|q| !q.trim().is_empty()),
            category_id: query.category_id,
            page: query.page,
            per_page: query.per_page,
            ..Default::default()
        }
    }
}

/// Public catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CatalogEntry {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub language: Option<Language>,
    /// Category name, "Uncategorized" when none
    pub category: String,
    pub available_copies: i32,
    pub is_available: bool,
}

impl From<Book> for CatalogEntry {
    fn from(book: Book) -> Self {
        CatalogEntry {
            id: book.id,
            is_available: book.available_copies > 0,
            available_copies: book.available_copies,
            category: book.category_name.unwrap_or_else(|| "Uncategorized".to_string()),
            title: book.title,
            author: book.author,
            isbn: book.isbn,
            language: book.language,
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_book(total: i32, available: i32) -> Book {
    let now = Utc::now();
    Book {
        id: Uuid::new_v4(),
        title: "Malgudi Days".to_string(),
        author: "R. K. Narayan".to_string(),
        isbn: None,
        publisher: None,
        ddc_number: None,
        publication_year: None,
        price: None,
        language: Some(Language::English),
        category_id: None,
        category_name: None,
        total_copies: total,
        available_copies: available,
        status: derive_status(BookStatus::Available, available),
        created_at: now,
        updated_at: now,
    }
}
