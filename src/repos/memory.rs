//! In-memory repositories for tests.
//!
//! One `MemoryStore` backs both traits so cascade deletes and card embedding behave
//! like the Postgres schema. Lookups are counted so tests can assert how often the
//! identity cache fell through to persistence.
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::repos::card_repo::{CardFields, CardRepo, CardRow};
use crate::repos::error::{RepoError, RepoResult};
use crate::repos::user_repo::{UserFields, UserRepo, UserRow};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, UserRow>,
    cards: BTreeMap<i64, CardRow>,
    next_user_id: i64,
    next_card_id: i64,
}

impl Tables {
    fn hydrate(&self, user: &UserRow) -> UserRow {
        let mut user = user.clone();
        user.cards = self
            .cards
            .values()
            .filter(|c| c.user_id == user.id)
            .cloned()
            .collect();
        user
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    user_find_by_id_calls: AtomicUsize,
    user_find_by_email_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_find_by_id_calls(&self) -> usize {
        self.user_find_by_id_calls.load(Ordering::SeqCst)
    }

    pub fn user_find_by_email_calls(&self) -> usize {
        self.user_find_by_email_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_all(&self) -> RepoResult<Vec<UserRow>> {
        let t = self.tables.lock().unwrap();
        Ok(t.users.values().map(|u| t.hydrate(u)).collect())
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<UserRow>> {
        self.user_find_by_id_calls.fetch_add(1, Ordering::SeqCst);
        let t = self.tables.lock().unwrap();
        Ok(t.users.get(&id).map(|u| t.hydrate(u)))
    }

    async fn find_by_ids(&self, ids: &[i64]) -> RepoResult<Vec<UserRow>> {
        let t = self.tables.lock().unwrap();
        Ok(t.users
            .values()
            .filter(|u| ids.contains(&u.id))
            .map(|u| t.hydrate(u))
            .collect())
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<UserRow>> {
        self.user_find_by_email_calls.fetch_add(1, Ordering::SeqCst);
        let t = self.tables.lock().unwrap();
        Ok(t.users
            .values()
            .find(|u| u.email == email)
            .map(|u| t.hydrate(u)))
    }

    async fn insert(&self, fields: &UserFields) -> RepoResult<UserRow> {
        let mut t = self.tables.lock().unwrap();
        if t.users.values().any(|u| u.email == fields.email) {
            return Err(RepoError::Conflict);
        }
        t.next_user_id += 1;
        let row = UserRow {
            id: t.next_user_id,
            name: fields.name.clone(),
            surname: fields.surname.clone(),
            birth_date: fields.birth_date,
            email: fields.email.clone(),
            cards: Vec::new(),
        };
        t.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update(&self, id: i64, fields: &UserFields) -> RepoResult<Option<UserRow>> {
        let mut t = self.tables.lock().unwrap();
        if t
            .users
            .values()
            .any(|u| u.id != id && u.email == fields.email)
        {
            return Err(RepoError::Conflict);
        }
        let Some(row) = t.users.get_mut(&id) else {
            return Ok(None);
        };
        row.name = fields.name.clone();
        row.surname = fields.surname.clone();
        row.birth_date = fields.birth_date;
        row.email = fields.email.clone();
        let row = row.clone();
        Ok(Some(t.hydrate(&row)))
    }

    async fn delete_by_id(&self, id: i64) -> RepoResult<bool> {
        let mut t = self.tables.lock().unwrap();
        let deleted = t.users.remove(&id).is_some();
        t.cards.retain(|_, c| c.user_id != id);
        Ok(deleted)
    }
}

#[async_trait]
impl CardRepo for MemoryStore {
    async fn find_all(&self) -> RepoResult<Vec<CardRow>> {
        Ok(self.tables.lock().unwrap().cards.values().cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<CardRow>> {
        Ok(self.tables.lock().unwrap().cards.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[i64]) -> RepoResult<Vec<CardRow>> {
        let t = self.tables.lock().unwrap();
        Ok(t.cards
            .values()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn find_by_user_id(&self, user_id: i64) -> RepoResult<Vec<CardRow>> {
        let t = self.tables.lock().unwrap();
        Ok(t.cards
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert(&self, user_id: i64, fields: &CardFields) -> RepoResult<CardRow> {
        let mut t = self.tables.lock().unwrap();
        t.next_card_id += 1;
        let row = CardRow {
            id: t.next_card_id,
            user_id,
            number: fields.number.clone(),
            holder: fields.holder.clone(),
            expiration_date: fields.expiration_date,
        };
        t.cards.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        id: i64,
        user_id: i64,
        fields: &CardFields,
    ) -> RepoResult<Option<CardRow>> {
        let mut t = self.tables.lock().unwrap();
        let Some(row) = t.cards.get_mut(&id) else {
            return Ok(None);
        };
        row.user_id = user_id;
        row.number = fields.number.clone();
        row.holder = fields.holder.clone();
        row.expiration_date = fields.expiration_date;
        Ok(Some(row.clone()))
    }

    async fn delete_by_id(&self, id: i64) -> RepoResult<bool> {
        Ok(self.tables.lock().unwrap().cards.remove(&id).is_some())
    }
}
