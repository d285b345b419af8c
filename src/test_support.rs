//! Shared fixtures for unit and router-level tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use chrono::{Days, NaiveDate, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Value, json};

use crate::repos::card_repo::CardFields;
use crate::repos::memory::MemoryStore;
use crate::repos::user_repo::UserFields;
use crate::services::auth::{Authenticator, InternalKey, TokenVerifier};
use crate::services::cache::client::CacheResult;
use crate::services::cache::{CacheClient, CacheError, MemoryCacheClient};
use crate::state::AppState;

pub const SECRET: &[u8] = b"test-signing-secret-test-signing-secret";
pub const INTERNAL_KEY: &str = "internal-test-key";

// 2100-01-01T00:00:00Z
const FAR_FUTURE: u64 = 4_102_444_800;

pub fn sign(claims: &Value) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(SECRET),
    )
    .unwrap()
}

pub fn token_for(email: &str, roles: &[&str]) -> String {
    sign(&json!({
        "sub": email,
        "iat": Utc::now().timestamp(),
        "exp": FAR_FUTURE,
        "roles": roles,
    }))
}

pub fn expired_token(email: &str) -> String {
    let an_hour_ago = Utc::now().timestamp() - 3_600;
    sign(&json!({ "sub": email, "iat": an_hour_ago - 60, "exp": an_hour_ago }))
}

pub fn authenticator() -> Authenticator {
    Authenticator::new(TokenVerifier::new(SECRET, 0), InternalKey::new(INTERNAL_KEY))
}

pub fn user_fields(email: &str) -> UserFields {
    UserFields {
        name: "John".into(),
        surname: "Doe".into(),
        birth_date: NaiveDate::from_ymd_opt(1990, 1, 15).unwrap(),
        email: email.into(),
    }
}

pub fn card_fields() -> CardFields {
    CardFields {
        number: "4916989612345678".into(),
        holder: "John Doe".into(),
        expiration_date: Utc::now().date_naive() + Days::new(3 * 365),
    }
}

/// In-memory cache whose operations can be switched to fail.
#[derive(Default)]
pub struct FlakyCache {
    inner: MemoryCacheClient,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub fail_deletes: AtomicBool,
}

impl FlakyCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn check(flag: &AtomicBool, op: &str) -> CacheResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(CacheError::BackendCommand(format!("{op} refused")));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheClient for FlakyCache {
    fn backend_name(&self) -> &'static str {
        "flaky"
    }

    async fn get_string(&self, key: &str) -> CacheResult<Option<String>> {
        Self::check(&self.fail_reads, "GET")?;
        self.inner.get_string(key).await
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        Self::check(&self.fail_writes, "SET")?;
        self.inner.set_with_ttl(key, value, ttl).await
    }

    async fn del(&self, key: &str) -> CacheResult<u64> {
        Self::check(&self.fail_deletes, "DEL")?;
        self.inner.del(key).await
    }
}

/// The full HTTP stack over in-memory persistence and cache.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub router: Router,
}

pub fn test_app() -> TestApp {
    test_app_with_cache(Arc::new(MemoryCacheClient::new()))
}

pub fn test_app_with_cache(cache: Arc<dyn CacheClient>) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(store.clone(), store.clone(), cache, authenticator(), 600);

    TestApp {
        store,
        router: crate::app::router(state),
    }
}
