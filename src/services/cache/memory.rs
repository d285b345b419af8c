use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::services::cache::client::{CacheClient, CacheResult};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process cache backend used when no Valkey URL is configured.
///
/// Entries expire lazily on read. Scope is a single process: run one instance or
/// switch to `ValkeyClient` when scaling out.
#[derive(Clone, Default)]
pub struct MemoryCacheClient {
    entries: Arc<DashMap<String, Entry>>,
}

impl MemoryCacheClient {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

#[async_trait]
impl CacheClient for MemoryCacheClient {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get_string(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();

        // The shard guard must be released before `remove` touches the same shard.
        let hit = match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };

        if hit {
            self.entries.remove_if(key, |_, e| e.expires_at <= now);
        }

        Ok(None)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> CacheResult<u64> {
        Ok(self.entries.remove(key).map_or(0, |_| 1))
    }
}
