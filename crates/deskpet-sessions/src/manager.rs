use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use deskpet_core::types::{ChatMessage, Role};
use deskpet_kv::KvStore;

use crate::error::{Result, SessionError};
use crate::types::{
    SessionMessage, SessionMeta, SessionStatus, SessionSummary, DEFAULT_CONTEXT_LIMIT,
    IDLE_TIMEOUT_SECS, SESSION_TTL_SECS, SUMMARY_TTL_SECS,
};

const SUMMARY_QUEUE_KEY: &str = "session:summary_queue";

fn session_key(session_id: &str) -> String {
    format!("session:{session_id}")
}
fn context_key(session_id: &str) -> String {
    format!("session:{session_id}:context")
}
fn summary_key(session_id: &str) -> String {
    format!("session:{session_id}:summary")
}
fn active_session_key(user_id: &str) -> String {
    format!("user:{user_id}:active_session")
}

/// Short-term conversational memory, separate from the long-term profile
/// store (§4.3). Four keys per session: metadata hash, context list, summary
/// hash, and membership in the global summary queue set.
pub struct SessionManager {
    kv: Arc<dyn KvStore>,
}

impl SessionManager {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    fn parse_meta(session_id: &str, fields: HashMap<String, String>) -> Option<SessionMeta> {
        if fields.is_empty() {
            return None;
        }
        let user_id = fields.get("user_id")?.clone();
        let start_time = fields
            .get("start_time")
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Utc::now);
        let last_active = fields
            .get("last_active")
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Utc::now);
        let message_count = fields
            .get("message_count")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let status = fields
            .get("status")
            .map(|s| SessionStatus::parse(s))
            .unwrap_or(SessionStatus::Active);
        let end_time = fields.get("end_time").and_then(|s| s.parse().ok());
        Some(SessionMeta {
            session_id: session_id.to_string(),
            user_id,
            start_time,
            last_active,
            message_count,
            status,
            end_time,
        })
    }

    async fn get_meta(&self, session_id: &str) -> Result<Option<SessionMeta>> {
        let fields = self.kv.hash_get_all(&session_key(session_id)).await?;
        Ok(Self::parse_meta(session_id, fields))
    }

    async fn create_session(&self, user_id: &str) -> Result<String> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let mut fields = HashMap::new();
        fields.insert("session_id".to_string(), session_id.clone());
        fields.insert("user_id".to_string(), user_id.to_string());
        fields.insert("start_time".to_string(), now.to_rfc3339());
        fields.insert("last_active".to_string(), now.to_rfc3339());
        fields.insert("message_count".to_string(), "0".to_string());
        fields.insert("status".to_string(), SessionStatus::Active.as_str().to_string());

        let key = session_key(&session_id);
        self.kv.hash_set(&key, &fields).await?;
        self.kv.expire(&key, SESSION_TTL_SECS as u64).await?;
        self.kv
            .set_string(&active_session_key(user_id), &session_id, Some(SESSION_TTL_SECS as u64))
            .await?;

        info!(user_id, session_id, "created session");
        Ok(session_id)
    }

    /// Read-only lookup of the active-session pointer (§3 "Active-session
    /// pointer"). Unlike [`Self::get_or_create`], this never creates a
    /// session or touches the pointer's TTL — used by read endpoints like
    /// GET `/api/session/{user_id}/current` that must not mint a session
    /// as a side effect of a status query.
    pub async fn get_active_session(&self, user_id: &str) -> Result<Option<String>> {
        Ok(self.kv.get_string(&active_session_key(user_id)).await?)
    }

    /// §4.3 `get_or_create`: reuse the active session if it's recent,
    /// otherwise end it (if idle) and start a fresh one.
    pub async fn get_or_create(&self, user_id: &str) -> Result<String> {
        let Some(active) = self.kv.get_string(&active_session_key(user_id)).await? else {
            return self.create_session(user_id).await;
        };

        match self.get_meta(&active).await? {
            Some(meta) => {
                let idle_secs = (Utc::now() - meta.last_active).num_seconds();
                if idle_secs > IDLE_TIMEOUT_SECS {
                    self.end(&active).await?;
                    self.create_session(user_id).await
                } else {
                    Ok(active)
                }
            }
            None => self.create_session(user_id).await,
        }
    }

    /// §4.3 `append_message`.
    pub async fn append_message(&self, session_id: &str, role: Role, content: &str) -> Result<()> {
        let message = ChatMessage::new(role, content);
        let payload = serde_json::to_string(&message).map_err(|e| SessionError::Kv(e.into()))?;

        let ctx_key = context_key(session_id);
        self.kv.list_push_right(&ctx_key, &payload).await?;
        self.kv.expire(&ctx_key, SESSION_TTL_SECS as u64).await?;

        let meta_key = session_key(session_id);
        self.kv
            .hash_set(
                &meta_key,
                &HashMap::from([("last_active".to_string(), Utc::now().to_rfc3339())]),
            )
            .await?;
        self.kv.hash_incr_by(&meta_key, "message_count", 1).await?;
        self.kv.expire(&meta_key, SESSION_TTL_SECS as u64).await?;
        Ok(())
    }

    fn decode_messages(raw: Vec<String>) -> Vec<SessionMessage> {
        raw.into_iter()
            .filter_map(|s| serde_json::from_str(&s).ok())
            .collect()
    }

    /// §4.3 `get_context`: tail `limit` items (default 20).
    pub async fn get_context(&self, session_id: &str, limit: Option<usize>) -> Result<Vec<SessionMessage>> {
        let limit = limit.unwrap_or(DEFAULT_CONTEXT_LIMIT as usize);
        let raw = self.kv.list_range(&context_key(session_id), Some(limit)).await?;
        Ok(Self::decode_messages(raw))
    }

    /// §4.3 `get_full_context`: entire list.
    pub async fn get_full_context(&self, session_id: &str) -> Result<Vec<SessionMessage>> {
        let raw = self.kv.list_range(&context_key(session_id), None).await?;
        Ok(Self::decode_messages(raw))
    }

    /// §4.3 `get_new_context`: items added since the last successful
    /// summary, via the persisted `last_summarized_index`.
    pub async fn get_new_context(&self, session_id: &str) -> Result<Vec<SessionMessage>> {
        let full = self.get_full_context(session_id).await?;
        let since = match self.get_summary(session_id).await? {
            Some(summary) => summary.last_summarized_index.max(0) as usize,
            None => 0,
        };
        Ok(full.into_iter().skip(since).collect())
    }

    /// §4.3 `end`.
    pub async fn end(&self, session_id: &str) -> Result<()> {
        let meta_key = session_key(session_id);
        let mut fields = HashMap::new();
        fields.insert("status".to_string(), SessionStatus::Ended.as_str().to_string());
        fields.insert("end_time".to_string(), Utc::now().to_rfc3339());
        self.kv.hash_set(&meta_key, &fields).await?;

        if let Some(meta) = self.get_meta(session_id).await? {
            self.kv.del(&active_session_key(&meta.user_id)).await?;
        }
        Ok(())
    }

    /// §4.3 `should_trigger_summary`: message_count > 0 and a multiple of 10.
    pub async fn should_trigger_summary(&self, session_id: &str) -> Result<bool> {
        let Some(meta) = self.get_meta(session_id).await? else {
            return Ok(false);
        };
        Ok(meta.message_count > 0 && meta.message_count % 10 == 0)
    }

    pub async fn mark_for_summary(&self, session_id: &str) -> Result<()> {
        self.kv.set_add(SUMMARY_QUEUE_KEY, session_id).await?;
        Ok(())
    }

    pub async fn get_sessions_to_summarize(&self) -> Result<Vec<String>> {
        Ok(self.kv.set_members(SUMMARY_QUEUE_KEY).await?)
    }

    pub async fn remove_from_summary_queue(&self, session_id: &str) -> Result<()> {
        self.kv.set_remove(SUMMARY_QUEUE_KEY, session_id).await?;
        Ok(())
    }

    /// §4.3 `save_summary`: persist, mark summarized, 30-day TTL, and record
    /// `last_summarized_index` for the next incremental pass.
    pub async fn save_summary(&self, session_id: &str, summary: &SessionSummary) -> Result<()> {
        let key = summary_key(session_id);
        let payload = serde_json::to_string(summary).map_err(|e| SessionError::Kv(e.into()))?;
        self.kv
            .hash_set(&key, &HashMap::from([("data".to_string(), payload)]))
            .await?;
        self.kv.expire(&key, SUMMARY_TTL_SECS as u64).await?;
        self.kv
            .hash_set(
                &session_key(session_id),
                &HashMap::from([("status".to_string(), SessionStatus::Summarized.as_str().to_string())]),
            )
            .await?;
        Ok(())
    }

    pub async fn get_summary(&self, session_id: &str) -> Result<Option<SessionSummary>> {
        let fields = self.kv.hash_get_all(&summary_key(session_id)).await?;
        match fields.get("data") {
            Some(raw) => Ok(serde_json::from_str(raw).ok()),
            None => Ok(None),
        }
    }

    pub async fn get_meta_for(&self, session_id: &str) -> Result<SessionMeta> {
        self.get_meta(session_id)
            .await?
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskpet_kv::MemoryKv;

    fn manager() -> SessionManager {
        SessionManager::new(Arc::new(MemoryKv::new()))
    }

    #[tokio::test]
    async fn get_active_session_is_none_when_no_session_exists() {
        let mgr = manager();
        assert_eq!(mgr.get_active_session("alice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn get_active_session_does_not_create_a_session() {
        let mgr = manager();
        mgr.get_active_session("alice").await.unwrap();
        // A read-only lookup must leave no pointer and no session behind.
        assert_eq!(mgr.get_active_session("alice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn get_active_session_returns_the_session_created_by_get_or_create() {
        let mgr = manager();
        let session_id = mgr.get_or_create("alice").await.unwrap();
        assert_eq!(mgr.get_active_session("alice").await.unwrap(), Some(session_id));
    }
}
