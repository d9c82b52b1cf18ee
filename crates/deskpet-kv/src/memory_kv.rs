use async_trait::async_trait;
use dashmap::DashMap;
use deskpet_core::error::Result;
use std::collections::HashMap;

use crate::store::{KvInfo, KvStore};

/// In-process fallback used when Redis is unreachable at startup.
///
/// Grounded in the original's `FallbackRedis`: plain dict-of-dicts for
/// hashes, a dict of vecs for lists, a dict of sets for sets. TTLs are
/// accepted (so callers don't need to branch on backend) but never acted
/// on — data simply lives for the process lifetime and is lost on
/// restart. This is the degraded mode §4.1 requires a `tracing::warn!`
/// for; the warning is emitted by the caller that decides to fall back
/// here, not by this type itself.
#[derive(Default)]
pub struct MemoryKv {
    strings: DashMap<String, String>,
    hashes: DashMap<String, HashMap<String, String>>,
    lists: DashMap<String, Vec<String>>,
    sets: DashMap<String, std::collections::HashSet<String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.strings.get(key).map(|v| v.clone()))
    }

    async fn set_string(&self, key: &str, value: &str, _ttl_secs: Option<u64>) -> Result<()> {
        self.strings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.strings.remove(key);
        self.hashes.remove(key);
        self.lists.remove(key);
        self.sets.remove(key);
        Ok(())
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64> {
        let mut entry = self.strings.entry(key.to_string()).or_insert_with(|| "0".to_string());
        let current: i64 = entry.parse().unwrap_or(0);
        let next = current + delta;
        *entry = next.to_string();
        Ok(next)
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>> {
        Ok(self.hashes.get(key).map(|h| h.clone()).unwrap_or_default())
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>> {
        Ok(self
            .hashes
            .get(key)
            .and_then(|h| h.get(field).cloned()))
    }

    async fn hash_set(&self, key: &str, mapping: &HashMap<String, String>) -> Result<()> {
        let mut entry = self.hashes.entry(key.to_string()).or_default();
        for (k, v) in mapping {
            entry.insert(k.clone(), v.clone());
        }
        Ok(())
    }

    async fn hash_incr_by(&self, key: &str, field: &str, delta: i64) -> Result<i64> {
        let mut entry = self.hashes.entry(key.to_string()).or_default();
        let current: i64 = entry.get(field).and_then(|v| v.parse().ok()).unwrap_or(0);
        let next = current + delta;
        entry.insert(field.to_string(), next.to_string());
        Ok(next)
    }

    async fn list_push_right(&self, key: &str, value: &str) -> Result<()> {
        self.lists.entry(key.to_string()).or_default().push(value.to_string());
        Ok(())
    }

    async fn list_range(&self, key: &str, limit: Option<usize>) -> Result<Vec<String>> {
        let list = self.lists.get(key).map(|l| l.clone()).unwrap_or_default();
        match limit {
            Some(n) if n < list.len() => Ok(list[list.len() - n..].to_vec()),
            _ => Ok(list),
        }
    }

    async fn list_trim_to_last(&self, key: &str, max_len: usize) -> Result<()> {
        if let Some(mut list) = self.lists.get_mut(key) {
            if list.len() > max_len {
                let start = list.len() - max_len;
                *list = list[start..].to_vec();
            }
        }
        Ok(())
    }

    async fn list_len(&self, key: &str) -> Result<usize> {
        Ok(self.lists.get(key).map(|l| l.len()).unwrap_or(0))
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<()> {
        self.sets.entry(key.to_string()).or_default().insert(member.to_string());
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        Ok(self
            .sets
            .get(key)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<()> {
        if let Some(mut set) = self.sets.get_mut(key) {
            set.remove(member);
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.strings.contains_key(key)
            || self.hashes.contains_key(key)
            || self.lists.contains_key(key)
            || self.sets.contains_key(key))
    }

    async fn expire(&self, _key: &str, _ttl_secs: u64) -> Result<()> {
        // Best-effort only: TTL enforcement is lost in degraded mode (§4.1).
        Ok(())
    }

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for entry in self.strings.iter() {
            if glob_match(pattern, entry.key()) {
                out.push(entry.key().clone());
            }
        }
        for entry in self.hashes.iter() {
            if glob_match(pattern, entry.key()) {
                out.push(entry.key().clone());
            }
        }
        out.sort();
        out.dedup();
        Ok(out)
    }

    fn info(&self) -> KvInfo {
        KvInfo {
            backend: "memory",
            reachable: true,
        }
    }
}

/// Minimal glob matcher supporting `*` (any run of characters), sufficient
/// for the `user:*:profile`-style patterns this service uses.
fn glob_match(pattern: &str, candidate: &str) -> bool {
    fn recurse(p: &[u8], c: &[u8]) -> bool {
        match p.first() {
            None => c.is_empty(),
            Some(b'*') => {
                recurse(&p[1..], c) || (!c.is_empty() && recurse(p, &c[1..]))
            }
            Some(&ch) => c.first() == Some(&ch) && recurse(&p[1..], &c[1..]),
        }
    }
    recurse(pattern.as_bytes(), candidate.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_roundtrip() {
        let kv = MemoryKv::new();
        let mut m = HashMap::new();
        m.insert("a".to_string(), "1".to_string());
        kv.hash_set("k", &m).await.unwrap();
        assert_eq!(kv.hash_get("k", "a").await.unwrap(), Some("1".to_string()));
    }

    #[tokio::test]
    async fn list_trim_keeps_tail() {
        let kv = MemoryKv::new();
        for i in 0..10 {
            kv.list_push_right("l", &i.to_string()).await.unwrap();
        }
        kv.list_trim_to_last("l", 3).await.unwrap();
        assert_eq!(kv.list_range("l", None).await.unwrap(), vec!["7", "8", "9"]);
    }

    #[tokio::test]
    async fn set_dedups_members() {
        let kv = MemoryKv::new();
        kv.set_add("s", "x").await.unwrap();
        kv.set_add("s", "x").await.unwrap();
        assert_eq!(kv.set_members("s").await.unwrap().len(), 1);
    }

    #[test]
    fn glob_matches_wildcard_segments() {
        assert!(glob_match("user:*:profile", "user:abcd:profile"));
        assert!(!glob_match("user:*:profile", "user:abcd:chat_history"));
    }
}
