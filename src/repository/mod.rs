//! Repository layer: the catalog store contract and its implementations

pub mod books;
pub mod categories;
pub mod circulation;
pub mod feedback;
pub mod members;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookQuery, CreateBook, UpdateBook},
        category::Category,
        circulation::{Circulation, CirculationFilter, NewCirculation},
        enums::FeedbackStatus,
        feedback::{Feedback, FeedbackQuery, NewFeedback},
        member::{CreateMember, Member, MemberQuery, UpdateMember},
    },
};

pub use memory::MemoryStore;

/// Everything the services need from persistence.
///
/// Implementations must make `checkout` and `checkin` atomic: the circulation
/// record and the book's available counter change together or not at all, and
/// the capacity check in `checkout` happens at commit time.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Check the store is reachable
    async fn ping(&self) -> AppResult<()>;

    // Books
    async fn list_books(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)>;
    async fn get_book(&self, id: Uuid) -> AppResult<Book>;
    /// Fetch the books that still exist among `ids`
    async fn get_books(&self, ids: &[Uuid]) -> AppResult<Vec<Book>>;
    async fn create_book(&self, data: &CreateBook) -> AppResult<Book>;
    async fn update_book(&self, id: Uuid, data: &UpdateBook) -> AppResult<Book>;
    /// Refused with `Conflict` while a copy is on loan
    async fn delete_book(&self, id: Uuid) -> AppResult<()>;

    // Members
    async fn list_members(&self, query: &MemberQuery) -> AppResult<(Vec<Member>, i64)>;
    async fn get_member(&self, id: Uuid) -> AppResult<Member>;
    async fn get_members(&self, ids: &[Uuid]) -> AppResult<Vec<Member>>;
    async fn create_member(&self, data: &CreateMember) -> AppResult<Member>;
    async fn update_member(&self, id: Uuid, data: &UpdateMember) -> AppResult<Member>;
    /// Refused with `Conflict` while the member holds a loan
    async fn delete_member(&self, id: Uuid) -> AppResult<()>;

    // Categories
    async fn list_categories(&self) -> AppResult<Vec<Category>>;
    async fn get_category(&self, id: Uuid) -> AppResult<Category>;
    /// `Conflict` when the name is already taken (case-insensitive)
    async fn add_category(&self, name: &str) -> AppResult<Category>;
    /// `Conflict` while any book references the category
    async fn delete_category(&self, id: Uuid) -> AppResult<()>;

    // Circulation
    async fn list_circulation(&self, filter: &CirculationFilter) -> AppResult<Vec<Circulation>>;
    /// Insert an issued record and take one copy off the shelf
    async fn checkout(&self, loan: &NewCirculation) -> AppResult<(Circulation, Book)>;
    /// Close the most recent open record of the book and put the copy back
    async fn checkin(
        &self,
        book_id: Uuid,
        returned_at: DateTime<Utc>,
    ) -> AppResult<(Circulation, Book)>;
    async fn update_circulation_fine(&self, id: Uuid, amount: Decimal) -> AppResult<Circulation>;

    // Feedback
    async fn list_feedback(&self, query: &FeedbackQuery) -> AppResult<Vec<Feedback>>;
    async fn insert_feedback(&self, data: &NewFeedback) -> AppResult<Feedback>;
    async fn set_feedback_status(&self, id: Uuid, status: FeedbackStatus) -> AppResult<Feedback>;
}

/// PostgreSQL-backed store holding the connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: books::BooksRepository,
    pub members: members::MembersRepository,
    pub categories: categories::CategoriesRepository,
    pub circulation: circulation::CirculationRepository,
    pub feedback: feedback::FeedbackRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            members: members::MembersRepository::new(pool.clone()),
            categories: categories::CategoriesRepository::new(pool.clone()),
            circulation: circulation::CirculationRepository::new(pool.clone()),
            feedback: feedback::FeedbackRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl CatalogStore for Repository {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_books(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        self.books.list(query).await
    }

    async fn get_book(&self, id: Uuid) -> AppResult<Book> {
        self.books.get_by_id(id).await
    }

    async fn get_books(&self, ids: &[Uuid]) -> AppResult<Vec<Book>> {
        self.books.get_many(ids).await
    }

    async fn create_book(&self, data: &CreateBook) -> AppResult<Book> {
        self.books.create(data).await
    }

    async fn update_book(&self, id: Uuid, data: &UpdateBook) -> AppResult<Book> {
        self.books.update(id, data).await
    }

    async fn delete_book(&self, id: Uuid) -> AppResult<()> {
        self.books.delete(id).await
    }

    async fn list_members(&self, query: &MemberQuery) -> AppResult<(Vec<Member>, i64)> {
        self.members.list(query).await
    }

    async fn get_member(&self, id: Uuid) -> AppResult<Member> {
        self.members.get_by_id(id).await
    }

    async fn get_members(&self, ids: &[Uuid]) -> AppResult<Vec<Member>> {
        self.members.get_many(ids).await
    }

    async fn create_member(&self, data: &CreateMember) -> AppResult<Member> {
        self.members.create(data).await
    }

    async fn update_member(&self, id: Uuid, data: &UpdateMember) -> AppResult<Member> {
        self.members.update(id, data).await
    }

    async fn delete_member(&self, id: Uuid) -> AppResult<()> {
        self.members.delete(id).await
    }

    async fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.categories.list().await
    }

    async fn get_category(&self, id: Uuid) -> AppResult<Category> {
        self.categories.get_by_id(id).await
    }

    async fn add_category(&self, name: &str) -> AppResult<Category> {
        self.categories.add(name).await
    }

    async fn delete_category(&self, id: Uuid) -> AppResult<()> {
        self.categories.delete(id).await
    }

    async fn list_circulation(&self, filter: &CirculationFilter) -> AppResult<Vec<Circulation>> {
        self.circulation.list(filter).await
    }

    async fn checkout(&self, loan: &NewCirculation) -> AppResult<(Circulation, Book)> {
        self.circulation.checkout(loan).await
    }

    async fn checkin(
        &self,
        book_id: Uuid,
        returned_at: DateTime<Utc>,
    ) -> AppResult<(Circulation, Book)> {
        self.circulation.checkin(book_id, returned_at).await
    }

    async fn update_circulation_fine(&self, id: Uuid, amount: Decimal) -> AppResult<Circulation> {
        self.circulation.update_fine(id, amount).await
    }

    async fn list_feedback(&self, query: &FeedbackQuery) -> AppResult<Vec<Feedback>> {
        self.feedback.list(query).await
    }

    async fn insert_feedback(&self, data: &NewFeedback) -> AppResult<Feedback> {
        self.feedback.insert(data).await
    }

    async fn set_feedback_status(&self, id: Uuid, status: FeedbackStatus) -> AppResult<Feedback> {
        self.feedback.set_status(id, status).await
    }
}
