//! Members repository for database operations

use sqlx::{Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::books::like_pattern;
use crate::{
    error::{AppError, AppResult},
    models::{
        member::{CreateMember, Member, MemberQuery, UpdateMember},
        page_bounds,
    },
};

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &MemberQuery) {
    builder.push(" WHERE TRUE");
    if let Some(ref term) = query.search {
        let pattern = like_pattern(term);
        builder.push(" AND (");
        let mut columns = builder.separated(" OR ");
        for column in ["name", "email", "phone", "class", "register_number"] {
            columns
                .push(format!("{} ILIKE ", column))
                .push_bind_unseparated(pattern.clone());
        }
        builder.push(")");
    }
    if let Some(status) = query.status {
        builder.push(" AND status = ").push_bind(status);
    }
}

#[derive(Clone)]
pub struct MembersRepository {
    pool: Pool<Postgres>,
}

impl MembersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Search members with pagination, ordered by name
    pub async fn list(&self, query: &MemberQuery) -> AppResult<(Vec<Member>, i64)> {
        let (limit, offset) = page_bounds(query.page, query.per_page);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM members");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM members");
        push_filters(&mut select, query);
        select
            .push(" ORDER BY name, id LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let members = select.build_query_as::<Member>().fetch_all(&self.pool).await?;

        Ok((members, total))
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Member> {
        sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))
    }

    pub async fn get_many(&self, ids: &[Uuid]) -> AppResult<Vec<Member>> {
        let members = sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = ANY($1)")
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;
        Ok(members)
    }

    pub async fn create(&self, data: &CreateMember) -> AppResult<Member> {
        let member = sqlx::query_as::<_, Member>(
            r#"
            INSERT INTO members (
                name, email, phone, address, place, class, register_number,
                membership_type, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.address)
        .bind(&data.place)
        .bind(&data.class_name)
        .bind(&data.register_number)
        .bind(data.membership_type)
        .bind(data.status)
        .fetch_one(&self.pool)
        .await?;
        Ok(member)
    }

    /// Partial update; absent fields keep their current value
    pub async fn update(&self, id: Uuid, data: &UpdateMember) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(
            r#"
            UPDATE members SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                address = COALESCE($5, address),
                place = COALESCE($6, place),
                class = COALESCE($7, class),
                register_number = COALESCE($8, register_number),
                membership_type = COALESCE($9, membership_type),
                status = COALESCE($10, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.address)
        .bind(&data.place)
        .bind(&data.class_name)
        .bind(&data.register_number)
        .bind(data.membership_type)
        .bind(data.status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))
    }

    /// Delete a member holding no loan
    /// Delete a member holding no loan. Checkout takes a share lock on the
    /// member row, so the two serialise.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let locked =
            sqlx::query_scalar::<_, Uuid>("SELECT id FROM members WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(AppError::NotFound(format!("Member {} not found", id)));
        }

        let holds_loans: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM circulation WHERE member_id = $1 AND status = 'issued')",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if holds_loans {
            return Err(AppError::Conflict(format!(
                "Member {} still holds borrowed books",
                id
            )));
        }

        sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
