//! Cache-aside store of user snapshots, keyed by user id, with an email → id index.
//!
//! Every ownership check reads through here, so this is the hot path of nearly
//! every authorized request. Persistence stays authoritative:
//!
//! - reads populate on miss and never cache "not found"
//! - writes to a user (or to one of its cards, which the snapshot embeds) run
//!   through `around_write`: evict, write, evict again. An eviction that fails
//!   before the write aborts it, so nothing is committed behind a stale entry
//! - the email index only stores an id; a hit is re-checked against the snapshot's
//!   email, so `invalidate(id)` alone is enough to make both lookups fresh
//! - a fill that overlaps an invalidation issued by this process is not left in
//!   the cache. The counter is process-local: across replicas sharing Valkey a
//!   racing fill is bounded by the TTL and by the second eviction of `around_write`
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::AppError;
use crate::repos::user_repo::{UserRepo, UserRow};
use crate::services::cache::{CacheClient, CacheError, client::ttl_seconds};

const DEFAULT_PREFIX: &str = "identity:user";

#[derive(Clone)]
pub struct IdentityCache {
    cache: Arc<dyn CacheClient>,
    users: Arc<dyn UserRepo>,
    ttl: Duration,
    prefix: String,
    // Bumped on every invalidation; a fetch that saw it move does not populate.
    invalidations: Arc<AtomicU64>,
}

impl std::fmt::Debug for IdentityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityCache")
            .field("backend", &self.cache.backend_name())
            .field("ttl", &self.ttl)
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl IdentityCache {
    pub fn new(cache: Arc<dyn CacheClient>, users: Arc<dyn UserRepo>, ttl_secs: u64) -> Self {
        Self {
            cache,
            users,
            ttl: ttl_seconds(ttl_secs),
            prefix: DEFAULT_PREFIX.to_string(),
            invalidations: Arc::new(AtomicU64::new(0)),
        }
    }

    fn id_key(&self, id: i64) -> String {
        format!("{}:id:{}", self.prefix, id)
    }

    fn email_key(&self, email: &str) -> String {
        format!("{}:email:{}", self.prefix, email)
    }

    /// Snapshot of user `id`; `None` when persistence has no such user.
    pub async fn get(&self, id: i64) -> Result<Option<UserRow>, AppError> {
        if let Some(user) = self.read_snapshot(id).await {
            return Ok(Some(user));
        }

        let seen = self.invalidations.load(Ordering::SeqCst);
        let user = self.users.find_by_id(id).await?;

        if let Some(user) = &user {
            self.populate(user, seen).await;
        }

        Ok(user)
    }

    /// Snapshot of the user owning `email`; used to map a principal to its id.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<UserRow>, AppError> {
        let email_key = self.email_key(email);

        if let Some(id) = self.read_index(&email_key).await {
            match self.get(id).await? {
                Some(user) if user.email == email => return Ok(Some(user)),
                _ => {
                    // The user moved to another email or is gone.
                    tracing::debug!(user_id = id, "stale email index entry");
                    if let Err(err) = self.cache.del(&email_key).await {
                        tracing::warn!(error = %err, "identity cache index eviction failed");
                    }
                }
            }
        }

        let seen = self.invalidations.load(Ordering::SeqCst);
        let user = self.users.find_by_email(email).await?;

        if let Some(user) = &user {
            self.populate(user, seen).await;
        }

        Ok(user)
    }

    /// Store a snapshot unconditionally (id entry and email index).
    pub async fn put(&self, user: &UserRow) -> Result<(), AppError> {
        self.write_snapshot(user).await.map_err(AppError::from)
    }

    /// Evict user `id`. A backend failure is returned, never swallowed.
    pub async fn invalidate(&self, id: i64) -> Result<(), AppError> {
        self.invalidations.fetch_add(1, Ordering::SeqCst);

        self.cache.del(&self.id_key(id)).await.map_err(|err| {
            tracing::error!(user_id = id, error = %err, "identity cache invalidation failed");
            AppError::from(err)
        })?;

        tracing::debug!(user_id = id, "identity cache entry invalidated");
        Ok(())
    }

    /// Run `write` against the users in `ids`, evicting them before and after.
    pub async fn around_write<T, F>(&self, ids: &[i64], write: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        for id in ids {
            self.invalidate(*id).await?;
        }

        let out = write.await?;

        // Drops snapshots refilled from pre-write rows while the write ran.
        for id in ids {
            self.invalidate(*id).await?;
        }
        Ok(out)
    }

    async fn populate(&self, user: &UserRow, seen: u64) {
        if self.invalidations.load(Ordering::SeqCst) != seen {
            tracing::debug!(user_id = user.id, "skipping cache fill after concurrent write");
            return;
        }
        if let Err(err) = self.write_snapshot(user).await {
            tracing::warn!(user_id = user.id, error = %err, "identity cache fill failed");
            return;
        }

        // An invalidation may have landed while the set was in flight.
        if self.invalidations.load(Ordering::SeqCst) != seen {
            tracing::debug!(user_id = user.id, "evicting fill overtaken by a concurrent write");
            if let Err(err) = self.cache.del(&self.id_key(user.id)).await {
                tracing::warn!(user_id = user.id, error = %err, "identity cache eviction failed");
            }
        }
    }

    async fn write_snapshot(&self, user: &UserRow) -> Result<(), CacheError> {
        let json =
            serde_json::to_string(user).map_err(|e| CacheError::InvalidValue(e.to_string()))?;

        self.cache
            .set_with_ttl(&self.id_key(user.id), &json, self.ttl)
            .await?;
        self.cache
            .set_with_ttl(&self.email_key(&user.email), &user.id.to_string(), self.ttl)
            .await
    }

    // Backend failures and undecodable entries count as misses.
    async fn read_snapshot(&self, id: i64) -> Option<UserRow> {
        let key = self.id_key(id);
        let raw = match self.cache.get_string(&key).await {
            Ok(raw) => raw?,
            Err(err) => {
                tracing::warn!(error = %err, "identity cache read failed, using persistence");
                return None;
            }
        };

        match serde_json::from_str::<UserRow>(&raw) {
            Ok(user) => Some(user),
            Err(err) => {
                tracing::warn!(user_id = id, error = %err, "dropping undecodable cache entry");
                let _ = self.cache.del(&key).await;
                None
            }
        }
    }

    async fn read_index(&self, email_key: &str) -> Option<i64> {
        match self.cache.get_string(email_key).await {
            Ok(raw) => raw?.parse().ok(),
            Err(err) => {
                tracing::warn!(error = %err, "identity cache read failed, using persistence");
                None
            }
        }
    }
}
