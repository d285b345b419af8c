/*
 * Responsibility
 * - card_info CRUD
 * - user_id is a non-null FK to users (ON DELETE CASCADE): a card never outlives its owner
 */
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::repos::error::RepoResult;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct CardRow {
    pub id: i64,
    pub user_id: i64,
    pub number: String,
    pub holder: String,
    pub expiration_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct CardFields {
    pub number: String,
    pub holder: String,
    pub expiration_date: NaiveDate,
}

#[async_trait]
pub trait CardRepo: Send + Sync + 'static {
    async fn find_all(&self) -> RepoResult<Vec<CardRow>>;
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<CardRow>>;
    async fn find_by_ids(&self, ids: &[i64]) -> RepoResult<Vec<CardRow>>;
    async fn find_by_user_id(&self, user_id: i64) -> RepoResult<Vec<CardRow>>;
    async fn insert(&self, user_id: i64, fields: &CardFields) -> RepoResult<CardRow>;
    async fn update(
        &self,
        id: i64,
        user_id: i64,
        fields: &CardFields,
    ) -> RepoResult<Option<CardRow>>;
    async fn delete_by_id(&self, id: i64) -> RepoResult<bool>;
}

pub(crate) async fn select_cards_by_user_ids(
    pool: &PgPool,
    user_ids: &[i64],
) -> RepoResult<Vec<CardRow>> {
    if user_ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, CardRow>(
        r#"
        SELECT id, user_id, number, holder, expiration_date
        FROM card_info
        WHERE user_id = ANY($1)
        ORDER BY id
        "#,
    )
    .bind(user_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[derive(Clone, Debug)]
pub struct PgCardRepo {
    pool: PgPool,
}

impl PgCardRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CardRepo for PgCardRepo {
    async fn find_all(&self) -> RepoResult<Vec<CardRow>> {
        let rows = sqlx::query_as::<_, CardRow>(
            r#"
            SELECT id, user_id, number, holder, expiration_date
            FROM card_info
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<CardRow>> {
        let row = sqlx::query_as::<_, CardRow>(
            r#"
            SELECT id, user_id, number, holder, expiration_date
            FROM card_info
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_by_ids(&self, ids: &[i64]) -> RepoResult<Vec<CardRow>> {
        let rows = sqlx::query_as::<_, CardRow>(
            r#"
            SELECT id, user_id, number, holder, expiration_date
            FROM card_info
            WHERE id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn find_by_user_id(&self, user_id: i64) -> RepoResult<Vec<CardRow>> {
        select_cards_by_user_ids(&self.pool, &[user_id]).await
    }

    async fn insert(&self, user_id: i64, fields: &CardFields) -> RepoResult<CardRow> {
        let row = sqlx::query_as::<_, CardRow>(
            r#"
            INSERT INTO card_info (user_id, number, holder, expiration_date)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, number, holder, expiration_date
            "#,
        )
        .bind(user_id)
        .bind(&fields.number)
        .bind(&fields.holder)
        .bind(fields.expiration_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update(
        &self,
        id: i64,
        user_id: i64,
        fields: &CardFields,
    ) -> RepoResult<Option<CardRow>> {
        let row = sqlx::query_as::<_, CardRow>(
            r#"
            UPDATE card_info
            SET
                user_id = $2,
                number = $3,
                holder = $4,
                expiration_date = $5
            WHERE id = $1
            RETURNING id, user_id, number, holder, expiration_date
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&fields.number)
        .bind(&fields.holder)
        .bind(fields.expiration_date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete_by_id(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM card_info
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
