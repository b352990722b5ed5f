//! Catalog management: books, members, categories and the public catalog

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use super::changes::{ChangeAction, ChangeEvent, ChangeNotifier, ChangeTable};
use crate::{
    error::AppResult,
    models::{
        book::{Book, BookQuery, CatalogEntry, CatalogQuery, CreateBook, UpdateBook},
        category::{normalize_category_name, Category},
        member::{CreateMember, Member, MemberQuery, UpdateMember},
    },
    repository::CatalogStore,
};

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    notifier: Arc<dyn ChangeNotifier>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>, notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self { store, notifier }
    }

    fn changed(&self, table: ChangeTable, action: ChangeAction, id: Uuid) {
        self.notifier.publish(ChangeEvent::new(table, action, id));
    }

    /// Check the backing store answers
    pub async fn ping(&self) -> AppResult<()> {
        self.store.ping().await
    }

    // =========================================================================
    // Public catalog
    // =========================================================================

    /// Public search by title, author or ISBN, ordered by title
    pub async fn search(&self, query: &CatalogQuery) -> AppResult<(Vec<CatalogEntry>, i64)> {
        let (books, total) = self.store.list_books(&BookQuery::from(query)).await?;
        Ok((books.into_iter().map(CatalogEntry::from).collect(), total))
    }

    // =========================================================================
    // Books
    // =========================================================================

    pub async fn list_books(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        self.store.list_books(query).await
    }

    pub async fn get_book(&self, id: Uuid) -> AppResult<Book> {
        self.store.get_book(id).await
    }

    pub async fn create_book(&self, data: CreateBook) -> AppResult<Book> {
        data.check()?;
        let book = self.store.create_book(&data).await?;
        tracing::info!("Added \"{}\" with {} copies", book.title, book.total_copies);
        self.changed(ChangeTable::Books, ChangeAction::Insert, book.id);
        Ok(book)
    }

    pub async fn update_book(&self, id: Uuid, data: UpdateBook) -> AppResult<Book> {
        data.check()?;
        let book = self.store.update_book(id, &data).await?;
        tracing::info!("Updated book {} ({})", book.id, book.status.as_str());
        self.changed(ChangeTable::Books, ChangeAction::Update, book.id);
        Ok(book)
    }

    pub async fn delete_book(&self, id: Uuid) -> AppResult<()> {
        self.store.delete_book(id).await?;
        tracing::info!("Deleted book {}", id);
        self.changed(ChangeTable::Books, ChangeAction::Delete, id);
        Ok(())
    }

    // =========================================================================
    // Members
    // =========================================================================

    pub async fn list_members(&self, query: &MemberQuery) -> AppResult<(Vec<Member>, i64)> {
        self.store.list_members(query).await
    }

    pub async fn get_member(&self, id: Uuid) -> AppResult<Member> {
        self.store.get_member(id).await
    }

    pub async fn create_member(&self, data: CreateMember) -> AppResult<Member> {
        data.validate()?;
        let member = self.store.create_member(&data).await?;
        tracing::info!("Registered member {} ({:?})", member.name, member.membership_type);
        self.changed(ChangeTable::Members, ChangeAction::Insert, member.id);
        Ok(member)
    }

    pub async fn update_member(&self, id: Uuid, data: UpdateMember) -> AppResult<Member> {
        data.validate()?;
        let member = self.store.update_member(id, &data).await?;
        self.changed(ChangeTable::Members, ChangeAction::Update, member.id);
        Ok(member)
    }

    pub async fn delete_member(&self, id: Uuid) -> AppResult<()> {
        self.store.delete_member(id).await?;
        tracing::info!("Deleted member {}", id);
        self.changed(ChangeTable::Members, ChangeAction::Delete, id);
        Ok(())
    }

    // =========================================================================
    // Categories
    // =========================================================================

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.store.list_categories().await
    }

    /// Add a category. Names are unique regardless of case.
    pub async fn add_category(&self, name: &str) -> AppResult<Category> {
        let name = normalize_category_name(name)?;
        let category = self.store.add_category(&name).await?;
        tracing::info!("Added category \"{}\"", category.name);
        self.changed(ChangeTable::Categories, ChangeAction::Insert, category.id);
        Ok(category)
    }

    /// Delete a category no book refers to
    pub async fn delete_category(&self, id: Uuid) -> AppResult<()> {
        if let Err(e) = self.store.delete_category(id).await {
            tracing::warn!("Category {} not deleted: {}", id, e);
            return Err(e);
        }
        tracing::info!("Deleted category {}", id);
        self.changed(ChangeTable::Categories, ChangeAction::Delete, id);
        Ok(())
    }
}
