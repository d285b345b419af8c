/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 * - Wires repos + cache backend into the identity cache, evaluator and services
 */
use std::sync::Arc;

use crate::repos::card_repo::CardRepo;
use crate::repos::user_repo::UserRepo;
use crate::services::access::AccessEvaluator;
use crate::services::auth::Authenticator;
use crate::services::cache::CacheClient;
use crate::services::cards::CardService;
use crate::services::identity_cache::IdentityCache;
use crate::services::users::UserService;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<Authenticator>,
    pub access: AccessEvaluator,
    pub users: UserService,
    pub cards: CardService,
}

impl AppState {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        card_repo: Arc<dyn CardRepo>,
        cache: Arc<dyn CacheClient>,
        auth: Authenticator,
        identity_ttl_seconds: u64,
    ) -> Self {
        // One identity cache shared by the evaluator and both services, so a
        // write in either service evicts what the evaluator reads.
        let identities = IdentityCache::new(cache, user_repo.clone(), identity_ttl_seconds);

        Self {
            auth: Arc::new(auth),
            access: AccessEvaluator::new(identities.clone(), card_repo.clone()),
            users: UserService::new(user_repo, identities.clone()),
            cards: CardService::new(card_repo, identities),
        }
    }
}
