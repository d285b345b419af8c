/*
 * Responsibility
 * - SQLx access to the users table (cards are loaded alongside each user)
 * - UserRepo is the seam the identity cache and the services depend on
 * - Unique-email violations surface as RepoError::Conflict
 */
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::repos::card_repo::{CardRow, select_cards_by_user_ids};
use crate::repos::error::RepoResult;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub birth_date: NaiveDate,
    pub email: String,
    #[sqlx(skip)]
    pub cards: Vec<CardRow>,
}

/// Writable columns of a user.
#[derive(Debug, Clone)]
pub struct UserFields {
    pub name: String,
    pub surname: String,
    pub birth_date: NaiveDate,
    pub email: String,
}

#[async_trait]
pub trait UserRepo: Send + Sync + 'static {
    async fn find_all(&self) -> RepoResult<Vec<UserRow>>;
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<UserRow>>;
    async fn find_by_ids(&self, ids: &[i64]) -> RepoResult<Vec<UserRow>>;
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<UserRow>>;
    async fn insert(&self, fields: &UserFields) -> RepoResult<UserRow>;
    // None when no row has this id.
    async fn update(&self, id: i64, fields: &UserFields) -> RepoResult<Option<UserRow>>;
    // Cards go with the user (ON DELETE CASCADE). false when nothing was deleted.
    async fn delete_by_id(&self, id: i64) -> RepoResult<bool>;
}

#[derive(Clone, Debug)]
pub struct PgUserRepo {
    pool: PgPool,
}

impl PgUserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn with_cards(&self, mut users: Vec<UserRow>) -> RepoResult<Vec<UserRow>> {
        let ids: Vec<i64> = users.iter().map(|u| u.id).collect();
        let cards = select_cards_by_user_ids(&self.pool, &ids).await?;

        let mut by_user: HashMap<i64, Vec<CardRow>> = HashMap::new();
        for card in cards {
            by_user.entry(card.user_id).or_default().push(card);
        }
        for user in &mut users {
            user.cards = by_user.remove(&user.id).unwrap_or_default();
        }

        Ok(users)
    }

    async fn with_cards_one(&self, user: Option<UserRow>) -> RepoResult<Option<UserRow>> {
        match user {
            Some(user) => Ok(self.with_cards(vec![user]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_all(&self) -> RepoResult<Vec<UserRow>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, surname, birth_date, email
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        self.with_cards(rows).await
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, surname, birth_date, email
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        self.with_cards_one(row).await
    }

    async fn find_by_ids(&self, ids: &[i64]) -> RepoResult<Vec<UserRow>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, surname, birth_date, email
            FROM users
            WHERE id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        self.with_cards(rows).await
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, surname, birth_date, email
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        self.with_cards_one(row).await
    }

    async fn insert(&self, fields: &UserFields) -> RepoResult<UserRow> {
        // A fresh user has no cards yet.
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (name, surname, birth_date, email)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, surname, birth_date, email
            "#,
        )
        .bind(&fields.name)
        .bind(&fields.surname)
        .bind(fields.birth_date)
        .bind(&fields.email)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update(&self, id: i64, fields: &UserFields) -> RepoResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
            SET
                name = $2,
                surname = $3,
                birth_date = $4,
                email = $5
            WHERE id = $1
            RETURNING id, name, surname, birth_date, email
            "#,
        )
        .bind(id)
        .bind(&fields.name)
        .bind(&fields.surname)
        .bind(fields.birth_date)
        .bind(&fields.email)
        .fetch_optional(&self.pool)
        .await?;

        self.with_cards_one(row).await
    }

    async fn delete_by_id(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
