/*
 * Responsibility
 * - Card use-cases on top of CardRepo
 * - The owning user must exist before a card is attached to it
 * - User snapshots embed their cards, so every card write runs inside
 *   IdentityCache::around_write for the owner(s)
 */
use std::sync::Arc;

use crate::error::AppError;
use crate::repos::card_repo::{CardFields, CardRepo, CardRow};
use crate::services::identity_cache::IdentityCache;

#[derive(Clone)]
pub struct CardService {
    cards: Arc<dyn CardRepo>,
    identities: IdentityCache,
}

fn card_not_found(id: i64) -> AppError {
    AppError::not_found(format!("Card Info with id {id} not found!"))
}

fn user_not_found(id: i64) -> AppError {
    AppError::not_found(format!("User with id {id} not found!"))
}

impl CardService {
    pub fn new(cards: Arc<dyn CardRepo>, identities: IdentityCache) -> Self {
        Self { cards, identities }
    }

    pub async fn list(&self) -> Result<Vec<CardRow>, AppError> {
        Ok(self.cards.find_all().await?)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<CardRow, AppError> {
        self.cards
            .find_by_id(id)
            .await?
            .ok_or_else(|| card_not_found(id))
    }

    pub async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<CardRow>, AppError> {
        Ok(self.cards.find_by_ids(ids).await?)
    }

    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<CardRow>, AppError> {
        self.require_user(user_id).await?;
        Ok(self.cards.find_by_user_id(user_id).await?)
    }

    /// Attach a new card to `user_id`.
    pub async fn add_to_user(&self, user_id: i64, fields: &CardFields) -> Result<CardRow, AppError> {
        self.require_user(user_id).await?;

        let row = self
            .identities
            .around_write(&[user_id], async {
                self.cards.insert(user_id, fields).await.map_err(AppError::from)
            })
            .await?;

        tracing::info!(card_id = row.id, user_id, "card created");
        Ok(row)
    }

    /// Update a card, possibly moving it to another user.
    pub async fn update(
        &self,
        id: i64,
        user_id: i64,
        fields: &CardFields,
    ) -> Result<CardRow, AppError> {
        let current = self.get_by_id(id).await?;
        self.require_user(user_id).await?;

        let both = [current.user_id, user_id];
        let owners = if current.user_id == user_id {
            &both[..1]
        } else {
            &both[..]
        };
        let row = self
            .identities
            .around_write(owners, async {
                self.cards.update(id, user_id, fields).await.map_err(AppError::from)
            })
            .await?;

        let row = row.ok_or_else(|| card_not_found(id))?;
        tracing::info!(card_id = id, user_id, "card updated");
        Ok(row)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let current = self.get_by_id(id).await?;

        let deleted = self
            .identities
            .around_write(&[current.user_id], async {
                self.cards.delete_by_id(id).await.map_err(AppError::from)
            })
            .await?;

        if !deleted {
            return Err(card_not_found(id));
        }
        tracing::info!(card_id = id, "card deleted");
        Ok(())
    }

    async fn require_user(&self, user_id: i64) -> Result<(), AppError> {
        match self.identities.get(user_id).await? {
            Some(_) => Ok(()),
            None => Err(user_not_found(user_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::memory::MemoryStore;
    use crate::repos::user_repo::UserRepo;
    use crate::services::cache::MemoryCacheClient;
    use crate::test_support::{FlakyCache, card_fields, user_fields};
    use std::sync::atomic::Ordering;

    struct Fixture {
        store: Arc<MemoryStore>,
        identities: IdentityCache,
        cards: CardService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let identities =
            IdentityCache::new(Arc::new(MemoryCacheClient::new()), store.clone(), 600);
        let cards = CardService::new(store.clone(), identities.clone());
        Fixture {
            store,
            identities,
            cards,
        }
    }

    #[tokio::test]
    async fn adding_a_card_refreshes_the_owner_snapshot() {
        let f = fixture();
        let user = UserRepo::insert(f.store.as_ref(), &user_fields("a@x.com")).await.unwrap();
        assert!(f.identities.get(user.id).await.unwrap().unwrap().cards.is_empty());

        let card = f.cards.add_to_user(user.id, &card_fields()).await.unwrap();

        let snapshot = f.identities.get(user.id).await.unwrap().unwrap();
        assert_eq!(snapshot.cards, vec![card]);
    }

    #[tokio::test]
    async fn moving_a_card_refreshes_both_owners() {
        let f = fixture();
        let a = UserRepo::insert(f.store.as_ref(), &user_fields("a@x.com")).await.unwrap();
        let b = UserRepo::insert(f.store.as_ref(), &user_fields("b@x.com")).await.unwrap();
        let card = f.cards.add_to_user(a.id, &card_fields()).await.unwrap();

        f.identities.get(a.id).await.unwrap();
        f.identities.get(b.id).await.unwrap();
        f.cards.update(card.id, b.id, &card_fields()).await.unwrap();

        assert!(f.identities.get(a.id).await.unwrap().unwrap().cards.is_empty());
        assert_eq!(f.identities.get(b.id).await.unwrap().unwrap().cards.len(), 1);
    }

    #[tokio::test]
    async fn unknown_user_or_card_is_not_found() {
        let f = fixture();
        assert!(matches!(
            f.cards.add_to_user(42, &card_fields()).await,
            Err(AppError::NotFound(msg)) if msg == "User with id 42 not found!"
        ));
        assert!(matches!(
            f.cards.delete(42).await,
            Err(AppError::NotFound(msg)) if msg == "Card Info with id 42 not found!"
        ));
        assert!(matches!(f.cards.list_by_user(42).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn deleting_a_user_takes_its_cards() {
        let f = fixture();
        let user = UserRepo::insert(f.store.as_ref(), &user_fields("a@x.com")).await.unwrap();
        let card = f.cards.add_to_user(user.id, &card_fields()).await.unwrap();

        UserRepo::delete_by_id(f.store.as_ref(), user.id).await.unwrap();

        assert!(matches!(f.cards.get_by_id(card.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn failed_eviction_adds_no_card() {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(FlakyCache::new());
        let identities = IdentityCache::new(cache.clone(), store.clone(), 600);
        let cards = CardService::new(store.clone(), identities);
        let user = UserRepo::insert(store.as_ref(), &user_fields("a@x.com")).await.unwrap();

        cache.fail_deletes.store(true, Ordering::SeqCst);
        assert!(matches!(
            cards.add_to_user(user.id, &card_fields()).await,
            Err(AppError::Unclassified(_))
        ));
        assert!(CardRepo::find_by_user_id(store.as_ref(), user.id).await.unwrap().is_empty());
    }
}
