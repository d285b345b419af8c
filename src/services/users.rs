/*
 * Responsibility
 * - User use-cases on top of UserRepo
 * - Reads by id go through the identity cache
 * - Update/delete run inside IdentityCache::around_write (read-after-write)
 */
use std::sync::Arc;

use crate::error::AppError;
use crate::repos::user_repo::{UserFields, UserRepo, UserRow};
use crate::services::identity_cache::IdentityCache;

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepo>,
    identities: IdentityCache,
}

fn not_found_by_id(id: i64) -> AppError {
    AppError::not_found(format!("User not found with id: {id}"))
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepo>, identities: IdentityCache) -> Self {
        Self { users, identities }
    }

    pub async fn list(&self) -> Result<Vec<UserRow>, AppError> {
        Ok(self.users.find_all().await?)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<UserRow, AppError> {
        self.identities
            .get(id)
            .await?
            .ok_or_else(|| not_found_by_id(id))
    }

    pub async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<UserRow>, AppError> {
        Ok(self.users.find_by_ids(ids).await?)
    }

    pub async fn get_by_email(&self, email: &str) -> Result<UserRow, AppError> {
        self.identities
            .get_by_email(email)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User not found with email: {email}")))
    }

    // No invalidation: nothing can be cached under an id that did not exist.
    pub async fn create(&self, fields: &UserFields) -> Result<UserRow, AppError> {
        let row = self.users.insert(fields).await?;
        tracing::info!(user_id = row.id, "user created");
        Ok(row)
    }

    pub async fn update(&self, id: i64, fields: &UserFields) -> Result<UserRow, AppError> {
        let row = self
            .identities
            .around_write(&[id], async {
                self.users.update(id, fields).await.map_err(AppError::from)
            })
            .await?;

        let row = row.ok_or_else(|| not_found_by_id(id))?;
        tracing::info!(user_id = id, "user updated");
        Ok(row)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let deleted = self
            .identities
            .around_write(&[id], async {
                self.users.delete_by_id(id).await.map_err(AppError::from)
            })
            .await?;

        if !deleted {
            return Err(not_found_by_id(id));
        }
        tracing::info!(user_id = id, "user deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::memory::MemoryStore;
    use crate::services::cache::{CacheClient, MemoryCacheClient};
    use crate::test_support::{FlakyCache, user_fields};
    use std::sync::atomic::Ordering;

    fn service_with(cache: Arc<dyn CacheClient>) -> (Arc<MemoryStore>, UserService) {
        let store = Arc::new(MemoryStore::new());
        let identities = IdentityCache::new(cache, store.clone(), 600);
        (store.clone(), UserService::new(store, identities))
    }

    fn service() -> (Arc<MemoryStore>, UserService) {
        service_with(Arc::new(MemoryCacheClient::new()))
    }

    #[tokio::test]
    async fn update_is_visible_to_the_next_read() {
        let (store, users) = service();
        let created = users.create(&user_fields("michael.jordan@gmail.com")).await.unwrap();

        users.get_by_id(created.id).await.unwrap();
        users.update(created.id, &user_fields("john.doe@gmail.com")).await.unwrap();
        let after = users.get_by_id(created.id).await.unwrap();

        assert_eq!(after.email, "john.doe@gmail.com");
        assert_eq!(store.user_find_by_id_calls(), 2);
    }

    #[tokio::test]
    async fn delete_is_visible_to_the_next_read() {
        let (_, users) = service();
        let created = users.create(&user_fields("michael.jordan@gmail.com")).await.unwrap();

        users.get_by_id(created.id).await.unwrap();
        users.delete(created.id).await.unwrap();

        assert!(matches!(
            users.get_by_id(created.id).await,
            Err(AppError::NotFound(msg)) if msg == format!("User not found with id: {}", created.id)
        ));
    }

    #[tokio::test]
    async fn missing_ids_are_not_found() {
        let (_, users) = service();
        assert!(matches!(users.update(7, &user_fields("x@x.com")).await, Err(AppError::NotFound(_))));
        assert!(matches!(users.delete(7).await, Err(AppError::NotFound(_))));
        assert!(matches!(users.get_by_email("x@x.com").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_validation_failure() {
        let (_, users) = service();
        users.create(&user_fields("dup@x.com")).await.unwrap();
        assert!(matches!(
            users.create(&user_fields("dup@x.com")).await,
            Err(AppError::Validation(errors)) if errors.contains_key("email")
        ));
    }

    #[tokio::test]
    async fn failed_eviction_leaves_the_row_and_the_cache_in_agreement() {
        let cache = Arc::new(FlakyCache::new());
        let (store, users) = service_with(cache.clone());
        let created = users.create(&user_fields("old@x.com")).await.unwrap();
        users.get_by_id(created.id).await.unwrap();

        cache.fail_deletes.store(true, Ordering::SeqCst);
        assert!(matches!(
            users.update(created.id, &user_fields("new@x.com")).await,
            Err(AppError::Unclassified(_))
        ));
        assert!(matches!(users.delete(created.id).await, Err(AppError::Unclassified(_))));

        let stored = UserRepo::find_by_id(store.as_ref(), created.id).await.unwrap().unwrap();
        assert_eq!(stored.email, "old@x.com");

        cache.fail_deletes.store(false, Ordering::SeqCst);
        assert_eq!(users.get_by_id(created.id).await.unwrap().email, "old@x.com");
    }
}
