//! Circulation repository: loan records and the copy counters they move

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::books::BOOK_SELECT;
use crate::{
    error::{AppError, AppResult},
    models::{
        book::Book,
        circulation::{Circulation, CirculationFilter, NewCirculation},
        enums::MemberStatus,
    },
};

#[derive(Clone)]
pub struct CirculationRepository {
    pool: Pool<Postgres>,
}

impl CirculationRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(&self, filter: &CirculationFilter) -> AppResult<Vec<Circulation>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM circulation WHERE TRUE");
        if let Some(book_id) = filter.book_id {
            builder.push(" AND book_id = ").push_bind(book_id);
        }
        if let Some(member_id) = filter.member_id {
            builder.push(" AND member_id = ").push_bind(member_id);
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(due_before) = filter.due_before {
            builder
                .push(" AND status = 'issued' AND due_date < ")
                .push_bind(due_before);
        }
        builder.push(if filter.newest_first {
            " ORDER BY issue_date DESC, id DESC"
        } else {
            " ORDER BY issue_date ASC, id"
        });
        if let Some(limit) = filter.limit {
            builder.push(" LIMIT ").push_bind(limit);
        }

        let records = builder
            .build_query_as::<Circulation>()
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    /// Issue a copy. The decrement is guarded by `available_copies > 0` so two
    /// concurrent checkouts of the last copy cannot both succeed. The member row
    /// is share-locked and re-checked so a delete or suspension cannot slip in.
    pub async fn checkout(&self, loan: &NewCirculation) -> AppResult<(Circulation, Book)> {
        let mut tx = self.pool.begin().await?;

        let member_status = sqlx::query_scalar::<_, MemberStatus>(
            "SELECT status FROM members WHERE id = $1 FOR SHARE",
        )
        .bind(loan.member_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Member {} not found", loan.member_id)))?;
        if !member_status.can_borrow() {
            return Err(AppError::Validation(format!(
                "Member {} is {} and cannot borrow",
                loan.member_id, member_status
            )));
        }

        let taken = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE books SET
                available_copies = available_copies - 1,
                status = CASE
                    WHEN available_copies - 1 = 0 AND status = 'available' THEN 'issued'::book_status
                    ELSE status
                END,
                updated_at = NOW()
            WHERE id = $1 AND available_copies > 0
            RETURNING id
            "#,
        )
        .bind(loan.book_id)
        .fetch_optional(&mut *tx)
        .await?;

        if taken.is_none() {
            return Err(self.missing_or_conflict(&mut tx, loan.book_id, "No copy is available").await);
        }

        let record = sqlx::query_as::<_, Circulation>(
            r#"
            INSERT INTO circulation (book_id, member_id, issue_date, due_date, status)
            VALUES ($1, $2, $3, $4, 'issued')
            RETURNING *
            "#,
        )
        .bind(loan.book_id)
        .bind(loan.member_id)
        .bind(loan.issue_date)
        .bind(loan.due_date)
        .fetch_one(&mut *tx)
        .await?;

        let book = Self::fetch_book(&mut tx, loan.book_id).await?;
        tx.commit().await?;
        Ok((record, book))
    }

    /// Return a copy: close the newest open record and put the copy back on the
    /// shelf, capped at the owned count.
    pub async fn checkin(
        &self,
        book_id: Uuid,
        returned_at: DateTime<Utc>,
    ) -> AppResult<(Circulation, Book)> {
        let mut tx = self.pool.begin().await?;

        let open_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM circulation
            WHERE book_id = $1 AND status = 'issued' AND return_date IS NULL
            ORDER BY issue_date DESC, id DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(book_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(open_id) = open_id else {
            return Err(self.missing_or_conflict(&mut tx, book_id, "No copy is on loan").await);
        };

        let record = sqlx::query_as::<_, Circulation>(
            r#"
            UPDATE circulation SET
                status = 'returned', return_date = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(open_id)
        .bind(returned_at)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE books SET
                available_copies = LEAST(available_copies + 1, total_copies),
                status = CASE WHEN status = 'issued' THEN 'available'::book_status ELSE status END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(book_id)
        .execute(&mut *tx)
        .await?;

        let book = Self::fetch_book(&mut tx, book_id).await?;
        tx.commit().await?;
        Ok((record, book))
    }

    pub async fn update_fine(&self, id: Uuid, amount: Decimal) -> AppResult<Circulation> {
        sqlx::query_as::<_, Circulation>(
            "UPDATE circulation SET fine_amount = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Circulation record {} not found", id)))
    }

    async fn fetch_book(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> AppResult<Book> {
        let book = sqlx::query_as::<_, Book>(&format!("{} WHERE b.id = $1", BOOK_SELECT))
            .bind(id)
            .fetch_one(&mut **tx)
            .await?;
        Ok(book)
    }

    /// Tell a missing book apart from a book in the wrong state
    async fn missing_or_conflict(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        book_id: Uuid,
        reason: &str,
    ) -> AppError {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(book_id)
            .fetch_one(&mut **tx)
            .await;
        match exists {
            Ok(true) => AppError::Conflict(format!("{} for book {}", reason, book_id)),
            Ok(false) => AppError::NotFound(format!("Book {} not found", book_id)),
            Err(e) => e.into(),
        }
    }
}
