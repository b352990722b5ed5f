//! Books repository for database operations

use sqlx::{Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, CreateBook, UpdateBook},
        page_bounds,
    },
};

/// Book columns with the category name resolved
pub(crate) const BOOK_SELECT: &str = r#"
    SELECT b.id, b.title, b.author, b.isbn, b.publisher, b.ddc_number,
           b.publication_year, b.price, b.language, b.category_id,
           c.name AS category_name,
           b.total_copies, b.available_copies, b.status,
           b.created_at, b.updated_at
    FROM books b
    LEFT JOIN categories c ON c.id = b.category_id
"#;

/// Escape LIKE wildcards in user input
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &BookQuery) {
    builder.push(" WHERE TRUE");
    if let Some(ref term) = query.search {
        let pattern = like_pattern(term);
        builder
            .push(" AND (b.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR b.author ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR b.isbn ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(status) = query.status {
        builder.push(" AND b.status = ").push_bind(status);
    }
    if let Some(category_id) = query.category_id {
        builder.push(" AND b.category_id = ").push_bind(category_id);
    }
    if let Some(language) = query.language {
        builder.push(" AND b.language = ").push_bind(language);
    }
    if query.available_only.unwrap_or(false) {
        builder.push(" AND b.available_copies > 0");
    }
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Search books with filters and pagination, ordered by title
    pub async fn list(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let (limit, offset) = page_bounds(query.page, query.per_page);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM books b");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(BOOK_SELECT);
        push_filters(&mut select, query);
        select
            .push(" ORDER BY b.title, b.id LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let books = select.build_query_as::<Book>().fetch_all(&self.pool).await?;

        Ok((books, total))
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!("{} WHERE b.id = $1", BOOK_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    pub async fn get_many(&self, ids: &[Uuid]) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(&format!("{} WHERE b.id = ANY($1)", BOOK_SELECT))
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    /// Create a book with every copy on the shelf
    pub async fn create(&self, data: &CreateBook) -> AppResult<Book> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO books (
                title, author, isbn, publisher, ddc_number, publication_year,
                price, language, category_id, total_copies, available_copies, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10, 'available')
            RETURNING id
            "#,
        )
        .bind(&data.title)
        .bind(&data.author)
        .bind(&data.isbn)
        .bind(&data.publisher)
        .bind(&data.ddc_number)
        .bind(data.publication_year)
        .bind(data.price)
        .bind(data.language)
        .bind(data.category_id)
        .bind(data.total_copies)
        .fetch_one(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    /// Update a book. The row is locked while the copy counts are recomputed
    /// so a concurrent issue or return cannot interleave.
    pub async fn update(&self, id: Uuid, data: &UpdateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let mut book = sqlx::query_as::<_, Book>(&format!(
            "{} WHERE b.id = $1 FOR UPDATE OF b",
            BOOK_SELECT
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))?;

        data.apply_to(&mut book)?;

        sqlx::query(
            r#"
            UPDATE books SET
                title = $2, author = $3, isbn = $4, publisher = $5, ddc_number = $6,
                publication_year = $7, price = $8, language = $9, category_id = $10,
                total_copies = $11, available_copies = $12, status = $13,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.publisher)
        .bind(&book.ddc_number)
        .bind(book.publication_year)
        .bind(book.price)
        .bind(book.language)
        .bind(book.category_id)
        .bind(book.total_copies)
        .bind(book.available_copies)
        .bind(book.status)
        .execute(&mut *tx)
        .await?;

        let updated = sqlx::query_as::<_, Book>(&format!("{} WHERE b.id = $1", BOOK_SELECT))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Delete a book that has no copy on loan. Closed circulation history is kept.
    /// Delete a book with no copy on loan. The row lock makes a concurrent
    /// checkout either finish first (and be seen) or wait and find no book.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_scalar::<_, Uuid>("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(AppError::NotFound(format!("Book {} not found", id)));
        }

        let on_loan: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM circulation WHERE book_id = $1 AND status = 'issued')",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if on_loan {
            return Err(AppError::Conflict(format!("Book {} has copies on loan", id)));
        }

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
