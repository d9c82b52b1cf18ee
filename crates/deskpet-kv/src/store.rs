use async_trait::async_trait;
use deskpet_core::error::Result;
use std::collections::HashMap;

/// Descriptor returned by `info()`, surfaced at `/health`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct KvInfo {
    pub backend: &'static str,
    pub reachable: bool,
}

/// Typed wrapper over the handful of hash/list/set/string primitives the
/// rest of this service builds on. All values are byte strings at this
/// boundary; nested structures are JSON-encoded by callers before `set*`
/// and decoded after `get*`.
///
/// Implemented by [`crate::redis_kv::RedisKv`] (production) and
/// [`crate::memory_kv::MemoryKv`] (degraded in-process fallback, used when
/// Redis is unreachable at startup — see module docs on `memory_kv`).
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get_string(&self, key: &str) -> Result<Option<String>>;
    async fn set_string(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<()>;
    async fn del(&self, key: &str) -> Result<()>;
    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64>;

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>>;
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>>;
    async fn hash_set(&self, key: &str, mapping: &HashMap<String, String>) -> Result<()>;
    async fn hash_incr_by(&self, key: &str, field: &str, delta: i64) -> Result<i64>;

    async fn list_push_right(&self, key: &str, value: &str) -> Result<()>;
    /// Tail `limit` items (most recently pushed last), or the whole list when
    /// `limit` is `None`.
    async fn list_range(&self, key: &str, limit: Option<usize>) -> Result<Vec<String>>;
    async fn list_trim_to_last(&self, key: &str, max_len: usize) -> Result<()>;
    async fn list_len(&self, key: &str) -> Result<usize>;

    async fn set_add(&self, key: &str, member: &str) -> Result<()>;
    async fn set_members(&self, key: &str) -> Result<Vec<String>>;
    async fn set_remove(&self, key: &str, member: &str) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<()>;
    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>>;

    fn info(&self) -> KvInfo;
}
