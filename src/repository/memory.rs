//! In-process catalog store.
//!
//! Every operation runs under one lock, which makes `checkout` and `checkin`
//! trivially atomic. Used by the test suites and by the `memory` storage backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::CatalogStore;
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, CreateBook, UpdateBook},
        category::Category,
        circulation::{Circulation, CirculationFilter, NewCirculation},
        enums::{BookStatus, CirculationStatus, FeedbackStatus},
        feedback::{Feedback, FeedbackQuery, NewFeedback},
        member::{CreateMember, Member, MemberQuery, UpdateMember},
        page_bounds,
    },
};

#[derive(Default)]
struct State {
    books: HashMap<Uuid, Book>,
    members: HashMap<Uuid, Member>,
    categories: HashMap<Uuid, Category>,
    circulation: Vec<Circulation>,
    feedback: Vec<Feedback>,
}

impl State {
    fn book(&self, id: Uuid) -> AppResult<Book> {
        let mut book = self
            .books
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))?;
        book.category_name = book
            .category_id
            .and_then(|c| self.categories.get(&c))
            .map(|c| c.name.clone());
        Ok(book)
    }

    fn check_category(&self, id: Option<Uuid>) -> AppResult<()> {
        match id {
            Some(id) if !self.categories.contains_key(&id) => Err(AppError::Conflict(format!(
                "Category {} does not exist",
                id
            ))),
            _ => Ok(()),
        }
    }

    fn has_open_loan(&self, pred: impl Fn(&Circulation) -> bool) -> bool {
        self.circulation.iter().any(|c| c.is_open() && pred(c))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an unreachable store: every call fails with `Transient` until reset
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> AppResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::Transient("Catalog store is unreachable".to_string()));
        }
        Ok(())
    }

    /// Insert a circulation record as-is, bypassing the copy counters.
    /// Meant for loading history, not for lending.
    pub async fn import_circulation(&self, record: Circulation) {
        self.state.lock().await.circulation.push(record);
    }
}

fn paginate<T>(mut items: Vec<T>, page: Option<i64>, per_page: Option<i64>) -> (Vec<T>, i64) {
    let total = items.len() as i64;
    let (limit, offset) = page_bounds(page, per_page);
    let items = items
        .drain(..)
        .skip(offset as usize)
        .take(limit as usize)
        .collect();
    (items, total)
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        self.ensure_online()
    }

    async fn list_books(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        self.ensure_online()?;
        let state = self.state.lock().await;
        let mut books = state
            .books
            .keys()
            .map(|id| state.book(*id))
            .collect::<AppResult<Vec<_>>>()?;
        books.retain(|b| query.matches(b));
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(paginate(books, query.page, query.per_page))
    }

    async fn get_book(&self, id: Uuid) -> AppResult<Book> {
        self.ensure_online()?;
        self.state.lock().await.book(id)
    }

    async fn get_books(&self, ids: &[Uuid]) -> AppResult<Vec<Book>> {
        self.ensure_online()?;
        let state = self.state.lock().await;
        Ok(ids.iter().filter_map(|id| state.book(*id).ok()).collect())
    }

    async fn create_book(&self, data: &CreateBook) -> AppResult<Book> {
        self.ensure_online()?;
        let mut state = self.state.lock().await;
        state.check_category(data.category_id)?;
        let now = Utc::now();
        let book = Book {
            id: Uuid::new_v4(),
            title: data.title.clone(),
            author: data.author.clone(),
            isbn: data.isbn.clone(),
            publisher: data.publisher.clone(),
            ddc_number: data.ddc_number.clone(),
            publication_year: data.publication_year,
            price: data.price,
            language: data.language,
            category_id: data.category_id,
            category_name: None,
            total_copies: data.total_copies,
            available_copies: data.total_copies,
            status: BookStatus::Available,
            created_at: now,
            updated_at: now,
        };
        let id = book.id;
        state.books.insert(id, book);
        state.book(id)
    }

    async fn update_book(&self, id: Uuid, data: &UpdateBook) -> AppResult<Book> {
        self.ensure_online()?;
        let mut state = self.state.lock().await;
        if let Some(category_id) = data.category_id {
            state.check_category(category_id)?;
        }
        let mut book = state.book(id)?;

        data.apply_to(&mut book)?;
        book.updated_at = Utc::now();

        state.books.insert(id, book);
        state.book(id)
    }

    async fn delete_book(&self, id: Uuid) -> AppResult<()> {
        self.ensure_online()?;
        let mut state = self.state.lock().await;
        if !state.books.contains_key(&id) {
            return Err(AppError::NotFound(format!("Book {} not found", id)));
        }
        if state.has_open_loan(|c| c.book_id == id) {
            return Err(AppError::Conflict(format!("Book {} has copies on loan", id)));
        }
        state.books.remove(&id);
        for feedback in state.feedback.iter_mut().filter(|f| f.book_id == Some(id)) {
            feedback.book_id = None;
        }
        Ok(())
    }

    async fn list_members(&self, query: &MemberQuery) -> AppResult<(Vec<Member>, i64)> {
        self.ensure_online()?;
        let state = self.state.lock().await;
        let mut members: Vec<Member> = state
            .members
            .values()
            .filter(|m| query.matches(m))
            .cloned()
            .collect();
        members.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(paginate(members, query.page, query.per_page))
    }

    async fn get_member(&self, id: Uuid) -> AppResult<Member> {
        self.ensure_online()?;
        self.state
            .lock()
            .await
            .members
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))
    }

    async fn get_members(&self, ids: &[Uuid]) -> AppResult<Vec<Member>> {
        self.ensure_online()?;
        let state = self.state.lock().await;
        Ok(ids.iter().filter_map(|id| state.members.get(id).cloned()).collect())
    }

    async fn create_member(&self, data: &CreateMember) -> AppResult<Member> {
        self.ensure_online()?;
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let member = Member {
            id: Uuid::new_v4(),
            name: data.name.clone(),
            email: data.email.clone(),
            phone: data.phone.clone(),
            address: data.address.clone(),
            place: data.place.clone(),
            class_name: data.class_name.clone(),
            register_number: data.register_number.clone(),
            membership_type: data.membership_type,
            status: data.status,
            membership_date: now,
            created_at: now,
            updated_at: now,
        };
        state.members.insert(member.id, member.clone());
        Ok(member)
    }

    async fn update_member(&self, id: Uuid, data: &UpdateMember) -> AppResult<Member> {
        self.ensure_online()?;
        let mut state = self.state.lock().await;
        let member = state
            .members
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))?;

        if let Some(ref name) = data.name {
            member.name = name.clone();
        }
        if let Some(ref email) = data.email {
            member.email = email.clone();
        }
        if data.phone.is_some() {
            member.phone = data.phone.clone();
        }
        if data.address.is_some() {
            member.address = data.address.clone();
        }
        if data.place.is_some() {
            member.place = data.place.clone();
        }
        if data.class_name.is_some() {
            member.class_name = data.class_name.clone();
        }
        if data.register_number.is_some() {
            member.register_number = data.register_number.clone();
        }
        if let Some(membership_type) = data.membership_type {
            member.membership_type = membership_type;
        }
        if let Some(status) = data.status {
            member.status = status;
        }
        member.updated_at = Utc::now();
        Ok(member.clone())
    }

    async fn delete_member(&self, id: Uuid) -> AppResult<()> {
        self.ensure_online()?;
        let mut state = self.state.lock().await;
        if !state.members.contains_key(&id) {
            return Err(AppError::NotFound(format!("Member {} not found", id)));
        }
        if state.has_open_loan(|c| c.member_id == id) {
            return Err(AppError::Conflict(format!(
                "Member {} still holds borrowed books",
                id
            )));
        }
        state.members.remove(&id);
        state.feedback.retain(|f| f.member_id != id);
        Ok(())
    }

    async fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.ensure_online()?;
        let state = self.state.lock().await;
        let mut categories: Vec<Category> = state.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get_category(&self, id: Uuid) -> AppResult<Category> {
        self.ensure_online()?;
        self.state
            .lock()
            .await
            .categories
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))
    }

    async fn add_category(&self, name: &str) -> AppResult<Category> {
        self.ensure_online()?;
        let mut state = self.state.lock().await;
        let lowered = name.to_lowercase();
        if state.categories.values().any(|c| c.name.to_lowercase() == lowered) {
            return Err(AppError::Conflict(format!("Category \"{}\" already exists", name)));
        }
        let category = Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn delete_category(&self, id: Uuid) -> AppResult<()> {
        self.ensure_online()?;
        let mut state = self.state.lock().await;
        if !state.categories.contains_key(&id) {
            return Err(AppError::NotFound(format!("Category {} not found", id)));
        }
        if state.books.values().any(|b| b.category_id == Some(id)) {
            return Err(AppError::Conflict(format!(
                "Category {} is still assigned to books",
                id
            )));
        }
        state.categories.remove(&id);
        Ok(())
    }

    async fn list_circulation(&self, filter: &CirculationFilter) -> AppResult<Vec<Circulation>> {
        self.ensure_online()?;
        let state = self.state.lock().await;
        let mut records: Vec<Circulation> = state
            .circulation
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.issue_date.cmp(&b.issue_date).then(a.id.cmp(&b.id)));
        if filter.newest_first {
            records.reverse();
        }
        if let Some(limit) = filter.limit {
            records.truncate(limit.max(0) as usize);
        }
        Ok(records)
    }

    async fn checkout(&self, loan: &NewCirculation) -> AppResult<(Circulation, Book)> {
        self.ensure_online()?;
        let mut state = self.state.lock().await;
        let member = state
            .members
            .get(&loan.member_id)
            .ok_or_else(|| AppError::NotFound(format!("Member {} not found", loan.member_id)))?;
        if !member.can_borrow() {
            return Err(AppError::Validation(format!(
                "Member {} is {} and cannot borrow",
                loan.member_id, member.status
            )));
        }
        let book = state
            .books
            .get_mut(&loan.book_id)
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", loan.book_id)))?;
        book.checkout()?;
        book.updated_at = Utc::now();

        let record = Circulation {
            id: Uuid::new_v4(),
            book_id: loan.book_id,
            member_id: loan.member_id,
            issue_date: loan.issue_date,
            due_date: loan.due_date,
            return_date: None,
            status: CirculationStatus::Issued,
            fine_amount: Decimal::ZERO,
            created_at: loan.issue_date,
            updated_at: loan.issue_date,
        };
        state.circulation.push(record.clone());
        let book = state.book(loan.book_id)?;
        Ok((record, book))
    }

    async fn checkin(
        &self,
        book_id: Uuid,
        returned_at: DateTime<Utc>,
    ) -> AppResult<(Circulation, Book)> {
        self.ensure_online()?;
        let mut state = self.state.lock().await;
        if !state.books.contains_key(&book_id) {
            return Err(AppError::NotFound(format!("Book {} not found", book_id)));
        }

        let record = state
            .circulation
            .iter_mut()
            .filter(|c| c.book_id == book_id && c.is_open())
            .max_by_key(|c| (c.issue_date, c.id))
            .ok_or_else(|| AppError::Conflict(format!("No copy is on loan for book {}", book_id)))?;
        record.status = CirculationStatus::Returned;
        record.return_date = Some(returned_at);
        record.updated_at = returned_at;
        let record = record.clone();

        if let Some(book) = state.books.get_mut(&book_id) {
            book.checkin();
            book.updated_at = returned_at;
        }
        let book = state.book(book_id)?;
        Ok((record, book))
    }

    async fn update_circulation_fine(&self, id: Uuid, amount: Decimal) -> AppResult<Circulation> {
        self.ensure_online()?;
        let mut state = self.state.lock().await;
        let record = state
            .circulation
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Circulation record {} not found", id)))?;
        record.fine_amount = amount;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn list_feedback(&self, query: &FeedbackQuery) -> AppResult<Vec<Feedback>> {
        self.ensure_online()?;
        let state = self.state.lock().await;
        let mut rows: Vec<Feedback> = state
            .feedback
            .iter()
            .filter(|f| query.matches(f))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn insert_feedback(&self, data: &NewFeedback) -> AppResult<Feedback> {
        self.ensure_online()?;
        let mut state = self.state.lock().await;
        let feedback = Feedback {
            id: Uuid::new_v4(),
            member_id: data.member_id,
            book_id: data.book_id,
            rating: data.rating,
            review: data.review.clone(),
            feedback_type: data.feedback_type,
            status: FeedbackStatus::default(),
            suggestion_title: data.suggestion_title.clone(),
            suggestion_author: data.suggestion_author.clone(),
            suggestion_reason: data.suggestion_reason.clone(),
            created_at: Utc::now(),
        };
        state.feedback.push(feedback.clone());
        Ok(feedback)
    }

    async fn set_feedback_status(&self, id: Uuid, status: FeedbackStatus) -> AppResult<Feedback> {
        self.ensure_online()?;
        let mut state = self.state.lock().await;
        let feedback = state
            .feedback
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Feedback {} not found", id)))?;
        feedback.status = status;
        Ok(feedback.clone())
    }
}
