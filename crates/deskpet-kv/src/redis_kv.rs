use async_trait::async_trait;
use deskpet_core::error::{PetError, Result};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use tracing::debug;

use crate::store::{KvInfo, KvStore};

/// Production KV backend: a pooled/managed async Redis connection.
///
/// Connection failures at any call site are mapped to [`PetError::Kv`];
/// the caller (the bootstrap path in `lib.rs`) decides whether that should
/// fall back to [`crate::memory_kv::MemoryKv`].
pub struct RedisKv {
    conn: ConnectionManager,
}

impl RedisKv {
    /// Connect to Redis at `host:port`, selecting `db`, authenticating with
    /// `password` if given. Fails fast — callers use this during startup to
    /// decide whether to fall back to the in-memory store.
    pub async fn connect(
        host: &str,
        port: u16,
        db: i64,
        password: Option<&str>,
    ) -> Result<Self> {
        let mut url = format!("redis://{host}:{port}/{db}");
        if let Some(pw) = password {
            url = format!("redis://:{pw}@{host}:{port}/{db}");
        }
        let client = redis::Client::open(url).map_err(|e| PetError::Kv(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| PetError::Kv(e.to_string()))?;
        debug!(host, port, db, "connected to Redis");
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvStore for RedisKv {
    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        let mut con = self.conn.clone();
        con.get(key).await.map_err(|e| PetError::Kv(e.to_string()))
    }

    async fn set_string(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<()> {
        let mut con = self.conn.clone();
        match ttl_secs {
            Some(ttl) => redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(ttl)
                .query_async::<_, ()>(&mut con)
                .await
                .map_err(|e| PetError::Kv(e.to_string())),
            None => con
                .set(key, value)
                .await
                .map_err(|e| PetError::Kv(e.to_string())),
        }
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut con = self.conn.clone();
        con.del(key).await.map_err(|e| PetError::Kv(e.to_string()))
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64> {
        let mut con = self.conn.clone();
        con.incr(key, delta)
            .await
            .map_err(|e| PetError::Kv(e.to_string()))
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>> {
        let mut con = self.conn.clone();
        con.hgetall(key)
            .await
            .map_err(|e| PetError::Kv(e.to_string()))
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>> {
        let mut con = self.conn.clone();
        con.hget(key, field)
            .await
            .map_err(|e| PetError::Kv(e.to_string()))
    }

    async fn hash_set(&self, key: &str, mapping: &HashMap<String, String>) -> Result<()> {
        if mapping.is_empty() {
            return Ok(());
        }
        let mut con = self.conn.clone();
        let pairs: Vec<(&String, &String)> = mapping.iter().collect();
        con.hset_multiple(key, &pairs)
            .await
            .map_err(|e| PetError::Kv(e.to_string()))
    }

    async fn hash_incr_by(&self, key: &str, field: &str, delta: i64) -> Result<i64> {
        let mut con = self.conn.clone();
        con.hincr(key, field, delta)
            .await
            .map_err(|e| PetError::Kv(e.to_string()))
    }

    async fn list_push_right(&self, key: &str, value: &str) -> Result<()> {
        let mut con = self.conn.clone();
        con.rpush(key, value)
            .await
            .map_err(|e| PetError::Kv(e.to_string()))
    }

    async fn list_range(&self, key: &str, limit: Option<usize>) -> Result<Vec<String>> {
        let mut con = self.conn.clone();
        let (start, stop): (isize, isize) = match limit {
            Some(n) => (-(n as isize), -1),
            None => (0, -1),
        };
        con.lrange(key, start, stop)
            .await
            .map_err(|e| PetError::Kv(e.to_string()))
    }

    async fn list_trim_to_last(&self, key: &str, max_len: usize) -> Result<()> {
        let mut con = self.conn.clone();
        con.ltrim(key, -(max_len as isize), -1)
            .await
            .map_err(|e| PetError::Kv(e.to_string()))
    }

    async fn list_len(&self, key: &str) -> Result<usize> {
        let mut con = self.conn.clone();
        con.llen(key).await.map_err(|e| PetError::Kv(e.to_string()))
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<()> {
        let mut con = self.conn.clone();
        con.sadd(key, member)
            .await
            .map_err(|e| PetError::Kv(e.to_string()))
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        let mut con = self.conn.clone();
        con.smembers(key)
            .await
            .map_err(|e| PetError::Kv(e.to_string()))
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<()> {
        let mut con = self.conn.clone();
        con.srem(key, member)
            .await
            .map_err(|e| PetError::Kv(e.to_string()))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut con = self.conn.clone();
        con.exists(key)
            .await
            .map_err(|e| PetError::Kv(e.to_string()))
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<()> {
        let mut con = self.conn.clone();
        con.expire(key, ttl_secs as i64)
            .await
            .map_err(|e| PetError::Kv(e.to_string()))
    }

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>> {
        let mut con = self.conn.clone();
        con.keys(pattern)
            .await
            .map_err(|e| PetError::Kv(e.to_string()))
    }

    fn info(&self) -> KvInfo {
        KvInfo {
            backend: "redis",
            reachable: true,
        }
    }
}
